//! Recovery behavior on broken input: diagnostics, error nodes and the
//! parts of the tree that must survive.

mod common;

use common::{BROKEN_FIXTURE, codes, count_kind, find_nodes, kind_names, parse_lossless, parse_valid};
use php_syntax_rs::ast::{Declaration, Parameter};
use php_syntax_rs::{DiagnosticCode, NodeKind, Severity, Span};

#[test]
fn unterminated_string_is_one_error_to_end_of_input() {
    let input = "'unterminated";
    let result = parse_lossless(input);
    assert_eq!(codes(&result), vec![DiagnosticCode::UnterminatedString]);
    let errors: Vec<_> = result.tree.errors().collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(result.tree.span(errors[0]), Span::new(0, input.len()));
    assert!(result.recovered);
}

#[test]
fn missing_paren_before_function_body() {
    let input = "function f($a, $b { return $a + $b; }";
    let result = parse_lossless(input);
    assert_eq!(
        codes(&result),
        vec![
            DiagnosticCode::UnbalancedDelimiter,
            DiagnosticCode::MalformedParameterList
        ]
    );
    // The pair points at the opener and at the place the ')' belongs.
    assert_eq!(result.diagnostics[0].span.start, 10);
    assert!(result.diagnostics[1].span.start > 10);
    assert!(result.diagnostics[1].span.start <= 18);

    let tree = &result.tree;
    assert_eq!(count_kind(tree, "FunctionDeclaration"), 1);
    let params = find_nodes(tree, |k| matches!(k, NodeKind::Parameter(_)));
    assert_eq!(params.len(), 2);
    let blocks = find_nodes(tree, |k| k == &NodeKind::Block);
    assert_eq!(blocks.len(), 1);
    assert!(!tree.descendants(blocks[0]).any(|id| tree.kind(id).is_error()));
    assert_eq!(count_kind(tree, "Return"), 1);
    assert_eq!(count_kind(tree, "Binary"), 1);
}

#[test]
fn enum_case_missing_comma() {
    let input = "enum Fruit { Apple Banana, Orange }";
    let result = parse_lossless(input);
    assert_eq!(codes(&result), vec![DiagnosticCode::MalformedEnumCase]);
    let at = result.diagnostics[0].span.start;
    assert!((18..=19).contains(&at), "diagnostic at {at}");

    let tree = &result.tree;
    let cases: Vec<String> = tree
        .descendants(tree.root())
        .filter_map(|id| match tree.kind(id) {
            NodeKind::Declaration(Declaration::EnumCase { name }) => Some(name.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(cases, vec!["Apple", "Banana", "Orange"]);
}

#[test]
fn match_arm_missing_comma() {
    let input = "match ($x) { 1 => 'a' 2 => 'b', default => 'c' };";
    let result = parse_lossless(input);
    assert_eq!(codes(&result), vec![DiagnosticCode::MalformedMatchArm]);
    let tree = &result.tree;
    let arms: Vec<bool> = tree
        .descendants(tree.root())
        .filter_map(|id| match tree.kind(id) {
            NodeKind::MatchArm { is_default } => Some(*is_default),
            _ => None,
        })
        .collect();
    assert_eq!(arms, vec![false, false, true]);
}

#[test]
fn modern_syntax_parses_cleanly() {
    let input = "<?php
class Point {
    public function __construct(public readonly int|float $x, private ?int $y = null) {}

    public function scaled(int|float $by): static {
        return new static(x: $this->x * $by, y: $this?->y);
    }
}

$double = fn (int|float $n): int|float => $n * 2;
$name = $user?->profile?->name ?? 'anonymous';
$point = Point::origin(y: 2, x: 1);
";
    let result = parse_valid(input);
    let tree = &result.tree;

    let top: Vec<_> = tree
        .child_nodes(tree.root())
        .map(|id| tree.kind(id).name())
        .collect();
    assert_eq!(
        top,
        vec![
            "InlineHtml",
            "ClassDeclaration",
            "ExpressionStatement",
            "ExpressionStatement",
            "ExpressionStatement"
        ]
    );

    let params: Vec<Parameter> = tree
        .descendants(tree.root())
        .filter_map(|id| match tree.kind(id) {
            NodeKind::Parameter(p) => Some(p.clone()),
            _ => None,
        })
        .collect();
    let promoted: Vec<bool> = params.iter().map(Parameter::is_promoted).collect();
    assert_eq!(promoted, vec![true, true, false, false]);

    assert_eq!(count_kind(tree, "ArrowFunction"), 1);
    let nullsafe = find_nodes(tree, |k| {
        matches!(k, NodeKind::MemberAccess { nullsafe: true, .. })
    });
    assert_eq!(nullsafe.len(), 3);
    let named = find_nodes(tree, |k| matches!(k, NodeKind::Argument { name: Some(_) }));
    assert_eq!(named.len(), 4);
    assert_eq!(
        find_nodes(tree, |k| matches!(k, NodeKind::Type(php_syntax_rs::ast::TypeShape::Union))).len(),
        4
    );
}

#[test]
fn broken_fixture_keeps_every_declaration() {
    let result = parse_lossless(BROKEN_FIXTURE);
    let found = codes(&result);
    for expected in [
        DiagnosticCode::ExpectedToken,
        DiagnosticCode::UnbalancedDelimiter,
        DiagnosticCode::UnterminatedString,
        DiagnosticCode::MalformedEnumCase,
        DiagnosticCode::MalformedParameterList,
        DiagnosticCode::UnexpectedOperator,
        DiagnosticCode::MalformedMatchArm,
    ] {
        assert!(found.contains(&expected), "no {expected} in {found:?}");
    }
    assert!(
        result
            .diagnostics
            .iter()
            .all(|d| d.severity == Severity::Error && d.span.end <= BROKEN_FIXTURE.len())
    );

    let tree = &result.tree;
    let names: Vec<String> = tree
        .descendants(tree.root())
        .filter_map(|id| match tree.kind(id) {
            NodeKind::Declaration(
                Declaration::Function { name, .. }
                | Declaration::Class { name, .. }
                | Declaration::Enum { name, .. },
            ) => name.clone(),
            _ => None,
        })
        .collect();
    for expected in [
        "sum",
        "Color",
        "unclosedBrace",
        "Fruit",
        "add",
        "WithError",
        "subtract",
        "Animal",
    ] {
        assert!(names.iter().any(|n| n == expected), "{expected} missing from {names:?}");
    }
    // The valid prefix is untouched by the errors that follow it.
    let first_error = result.diagnostics[0].span.start;
    assert!(BROKEN_FIXTURE[..first_error].contains("$double = fn($number)"));
}

#[test]
fn broken_fixture_records_are_one_based() {
    let result = parse_lossless(BROKEN_FIXTURE);
    let records = result.records();
    assert_eq!(records.len(), result.diagnostics.len());
    let missing_semicolon = records
        .iter()
        .find(|r| r.code == "ExpectedToken")
        .expect("missing semicolon report");
    let line = BROKEN_FIXTURE
        .lines()
        .position(|l| l.starts_with("$missingSemicolon"))
        .expect("fixture line")
        + 1;
    assert_eq!(missing_semicolon.start_line, line);
    assert!(missing_semicolon.message.starts_with("expected ';'"));
}

#[test]
fn diagnostics_are_sorted() {
    let result = parse_lossless(BROKEN_FIXTURE);
    let keys: Vec<_> = result
        .diagnostics
        .iter()
        .map(|d| (d.span.start, d.severity, d.id))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
}

#[test]
fn stray_tokens_between_statements() {
    let result = parse_lossless("<?php\n$a = 1;\n) ] }\n$b = 2;\n");
    assert_eq!(
        codes(&result),
        vec![DiagnosticCode::UnbalancedDelimiter; 3]
    );
    let kinds = kind_names(&result.tree);
    assert_eq!(kinds.iter().filter(|k| **k == "ExpressionStatement").count(), 2);
}

#[test]
fn deep_nesting_reports_instead_of_overflowing() {
    let input = format!("<?php\n$x = {}1{};\n", "[".repeat(5000), "]".repeat(5000));
    let result = parse_lossless(&input);
    assert_eq!(codes(&result), vec![DiagnosticCode::NestingTooDeep]);
}

#[test]
fn declaration_keyword_at_end_of_input() {
    for (input, expected) in [
        ("<?php\nclass", "class name"),
        ("<?php\n$a = 1;\nenum", "enum name"),
        ("<?php\ninterface", "interface name"),
    ] {
        let result = parse_lossless(input);
        assert_eq!(
            codes(&result),
            vec![DiagnosticCode::UnexpectedEndOfInput],
            "{input:?}"
        );
        assert_eq!(
            result.diagnostics[0].message,
            format!("unexpected end of input, expected {expected}")
        );
        assert_eq!(result.tree.errors().count(), 1);
    }
}

#[test]
fn keyword_that_cannot_start_a_statement_is_reported_once() {
    let result = parse_lossless("<?php\n$a = 1;\ncase 2;\n$b = 3;\n");
    assert_eq!(codes(&result), vec![DiagnosticCode::ExpectedToken]);
    let d = &result.diagnostics[0];
    assert!(d.message.starts_with("expected statement"), "{}", d.message);
    assert_eq!(&"<?php\n$a = 1;\ncase 2;\n$b = 3;\n"[d.span.start..d.span.end], "case");
    let kinds = kind_names(&result.tree);
    assert_eq!(kinds.iter().filter(|k| **k == "ExpressionStatement").count(), 3);
}

#[test]
fn stray_arrow_is_reported_once() {
    let result = parse_lossless("<?php\n=> 1;\n");
    assert_eq!(codes(&result), vec![DiagnosticCode::ExpectedToken]);
    assert_eq!(result.tree.errors().count(), 1);
}
