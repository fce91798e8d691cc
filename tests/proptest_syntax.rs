//! Property-based tests with proptest.
//!
//! Two kinds of input: arbitrary text, which must never break the
//! parser's guarantees, and soups of PHP fragments (valid and broken),
//! which exercise recovery far more often than random bytes do.

use std::collections::HashSet;

use php_syntax_rs::tree::Child;
use php_syntax_rs::{NodeKind, ParseResult, SyntaxTree, format, parse_str};
use proptest::prelude::*;

// -- Strategies --

const FRAGMENTS: &[&str] = &[
    "<?php\n",
    "?>",
    "<div>",
    "$a = 1;",
    "$b =+ 2;",
    "echo $a, 'x';",
    "function f($x, $y) { return $x + $y; }",
    "function g($x $y {",
    "class A { public ?int $p = null; const C = 1; }",
    "class B extends A implements I {",
    "enum E: string { case X = 'x'; Y Z }",
    "match ($v) { 1 => 'a' 2 => 'b', default => 'c' };",
    "$f = fn (int|float $n) => $n * 2;",
    "$o?->m(named: 1)[0];",
    "if ($a) { } elseif ($b) { } else {",
    "foreach ($xs as $k => $v) {",
    "for ($i = 0; $i < 3; $i++)",
    "while (true) break;",
    "new Foo(",
    "(",
    ")",
    "[",
    "]",
    "{",
    "}",
    ";",
    ",",
    "'unterminated",
    "\"open $x",
    "<<<EOT\nbody\nEOT;",
    "<<<EOT\nnever closed",
    "/* open comment",
    "// line\n",
    "# hash\n",
    "0x 1__0 12abc",
    "\\Foo\\bar();",
    "static::$x;",
    "@$a->b?->c;",
    "\u{1}",
    "é",
    "\n",
    " ",
];

const BINARY_OPERATORS: &[&str] = &["+", "-", "*", ".", "??", "&&", "<", "==="];

fn fragment_soup() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(FRAGMENTS), 0..24)
        .prop_map(|parts| parts.join(" "))
}

fn variable() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,6}".prop_map(|name| format!("${name}"))
}

/// Valid expressions built from a small grammar.
fn expression() -> impl Strategy<Value = String> {
    let leaf = prop_oneof![
        variable(),
        (0u32..1000).prop_map(|n| n.to_string()),
        "[a-z ]{0,8}".prop_map(|s| format!("'{s}'")),
        Just("null".to_string()),
        Just("true".to_string()),
    ];
    leaf.prop_recursive(4, 24, 3, |inner| {
        prop_oneof![
            (inner.clone(), prop::sample::select(BINARY_OPERATORS), inner.clone())
                .prop_map(|(l, op, r)| format!("{l} {op} {r}")),
            inner.clone().prop_map(|e| format!("({e})")),
            inner.clone().prop_map(|e| format!("!{e}")),
            (inner.clone(), inner.clone(), inner.clone())
                .prop_map(|(c, a, b)| format!("{c} ? {a} : {b}")),
            prop::collection::vec(inner.clone(), 0..3)
                .prop_map(|args| format!("call({})", args.join(", "))),
            prop::collection::vec(inner, 0..3).prop_map(|items| format!("[{}]", items.join(", "))),
        ]
    })
}

fn statement() -> impl Strategy<Value = String> {
    prop_oneof![
        (variable(), expression()).prop_map(|(v, e)| format!("{v} = {e};")),
        expression().prop_map(|e| format!("echo {e};")),
        (expression(), variable(), expression())
            .prop_map(|(c, v, e)| format!("if ({c}) {{ {v} = {e}; }}")),
        (variable(), expression()).prop_map(|(v, e)| format!("function f({v}) {{ return {e}; }}")),
    ]
}

fn program() -> impl Strategy<Value = String> {
    prop::collection::vec(statement(), 0..6)
        .prop_map(|statements| format!("<?php\n{}\n", statements.join("\n")))
}

// -- Checks --

fn check_structure(tree: &SyntaxTree) -> Result<(), TestCaseError> {
    let mut seen_tokens = 0;
    for id in tree.descendants(tree.root()) {
        let span = tree.span(id);
        let mut last_start = span.start;
        for child in tree.children(id) {
            let child_span = match *child {
                Child::Node(node) => {
                    prop_assert_eq!(tree.parent(node), Some(id));
                    tree.span(node)
                }
                Child::Token(token) => {
                    seen_tokens += 1;
                    prop_assert_eq!(tree.token_parent(token), id);
                    tree.token(token).span
                }
                Child::Missing { offset, .. } => php_syntax_rs::Span::empty(offset),
            };
            prop_assert!(
                span.contains(child_span),
                "{:?} {:?} does not contain child {:?}",
                tree.kind(id),
                span,
                child_span
            );
            prop_assert!(child_span.start >= last_start, "children out of order in {:?}", tree.kind(id));
            last_start = child_span.start;
        }
    }
    prop_assert_eq!(seen_tokens, tree.tokens().len());
    Ok(())
}

fn check_diagnostics(result: &ParseResult, len: usize) -> Result<(), TestCaseError> {
    let keys: Vec<_> = result
        .diagnostics
        .iter()
        .map(|d| (d.span.start, d.severity, d.id))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    prop_assert_eq!(&keys, &sorted);

    let ids: HashSet<_> = result.diagnostics.iter().map(|d| d.id).collect();
    prop_assert_eq!(ids.len(), result.diagnostics.len());
    for d in &result.diagnostics {
        prop_assert!(d.span.start <= d.span.end && d.span.end <= len);
    }
    let tree = &result.tree;
    for id in tree.errors() {
        let NodeKind::Error { diagnostic, .. } = tree.kind(id) else {
            unreachable!("errors() yields error nodes");
        };
        prop_assert!(ids.contains(diagnostic), "error node without diagnostic");
    }
    prop_assert_eq!(result.recovered, tree.errors().next().is_some());
    Ok(())
}

proptest! {
    /// Any text parses, and the tree gives it back unchanged.
    #[test]
    fn arbitrary_text_is_lossless(input in "\\PC{0,200}") {
        let result = parse_str(&input);
        prop_assert_eq!(result.text(), input.clone());
        let eof = result.tree.tokens().last().expect("eof token");
        prop_assert!(eof.is_eof());
        check_diagnostics(&result, input.len())?;
    }

    /// Fragment soups are lossless and structurally sound.
    #[test]
    fn fragment_soup_is_lossless(input in fragment_soup()) {
        let result = parse_str(&input);
        prop_assert_eq!(result.text(), input.clone());
        check_structure(&result.tree)?;
        check_diagnostics(&result, input.len())?;
    }

    /// Parsing the same input twice gives the same tree and diagnostics.
    #[test]
    fn parsing_is_deterministic(input in fragment_soup()) {
        let first = parse_str(&input);
        let second = parse_str(&input);
        prop_assert_eq!(first.tree, second.tree);
        prop_assert_eq!(first.diagnostics, second.diagnostics);
    }

    /// Generated programs are valid, and formatting them is stable.
    #[test]
    fn generated_programs_format_idempotently(input in program()) {
        let parsed = parse_str(&input);
        prop_assert!(parsed.diagnostics.is_empty(), "{:#?}\n{}", parsed.records(), input);
        let formatted = format(&parsed.tree);
        let reparsed = parse_str(&formatted);
        prop_assert!(reparsed.diagnostics.is_empty(), "{:#?}\n{}", reparsed.records(), formatted);
        prop_assert_eq!(format(&reparsed.tree), formatted);
    }
}
