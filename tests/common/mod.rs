#![allow(dead_code)]

use php_syntax_rs::{
    DiagnosticCode, NodeId, NodeKind, ParseResult, SyntaxTree, format, parse_str,
};

pub const VALID_FIXTURE: &str = include_str!("../fixtures/valid.php");
pub const BROKEN_FIXTURE: &str = include_str!("../fixtures/broken.php");

/// Parse and assert the tree reproduces the input byte for byte.
pub fn parse_lossless(input: &str) -> ParseResult {
    let result = parse_str(input);
    let text = result.text();
    assert_eq!(
        text, input,
        "lossless mismatch:\n--- expected ---\n{input}\n--- got ---\n{text}"
    );
    result
}

/// Parse input that must produce no diagnostics.
pub fn parse_valid(input: &str) -> ParseResult {
    let result = parse_lossless(input);
    assert!(
        result.diagnostics.is_empty(),
        "unexpected diagnostics for:\n{input}\n{:#?}",
        result.records()
    );
    result
}

pub fn codes(result: &ParseResult) -> Vec<DiagnosticCode> {
    result.diagnostics.iter().map(|d| d.code).collect()
}

/// Node kind names in document order.
pub fn kind_names(tree: &SyntaxTree) -> Vec<&'static str> {
    tree.descendants(tree.root())
        .map(|id| tree.kind(id).name())
        .collect()
}

pub fn count_kind(tree: &SyntaxTree, name: &str) -> usize {
    kind_names(tree).iter().filter(|n| **n == name).count()
}

pub fn find_nodes(tree: &SyntaxTree, pred: impl Fn(&NodeKind) -> bool) -> Vec<NodeId> {
    tree.descendants(tree.root())
        .filter(|&id| pred(tree.kind(id)))
        .collect()
}

/// Format, re-parse and assert the second format changes nothing.
pub fn assert_format_idempotent(input: &str) {
    let first = parse_valid(input);
    let formatted = format(&first.tree);
    let second = parse_str(&formatted);
    assert!(
        second.diagnostics.is_empty(),
        "formatted output does not parse:\n{formatted}\n{:#?}",
        second.records()
    );
    let again = format(&second.tree);
    assert_eq!(
        again, formatted,
        "format is not idempotent:\n--- first ---\n{formatted}\n--- second ---\n{again}"
    );
    assert_eq!(
        kind_names(&first.tree),
        kind_names(&second.tree),
        "formatting changed the tree shape:\n{formatted}"
    );
}
