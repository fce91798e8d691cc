//! Error-tolerant recursive-descent parser.
//!
//! The parser never fails. Every construct it cannot recognise is kept
//! in the tree as an error node (or a zero-width missing placeholder) and
//! explained by a diagnostic, so the returned tree is always lossless.
//!
//! Recovery relies on three pieces of state:
//!
//! - a stack of open delimiters, so a closer belonging to an enclosing
//!   construct implicitly closes the inner ones;
//! - a consumed-token counter, checked by every loop so each iteration
//!   makes progress or stops;
//! - a nesting depth guard that turns pathological nesting into a
//!   `NestingTooDeep` error instead of a stack overflow.

mod declarations;
mod expressions;
mod statements;

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::ast::NodeKind;
use crate::diagnostic::{
    Diagnostic, DiagnosticCode, DiagnosticId, DiagnosticRecord, DiagnosticSink, Severity,
};
use crate::lexer::{LexMode, Lexer};
use crate::source::SourceBuffer;
use crate::token::{Keyword, Operator, Punct, Span, Token, TokenKind};
use crate::tree::{Checkpoint, SyntaxTree, TreeBuilder};

pub const DEFAULT_MAX_NESTING_DEPTH: usize = 128;

/// Parser settings, also the `parser` section of the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParserConfig {
    /// Maximum nesting of statements, declarations and expressions.
    pub max_nesting_depth: usize,
    pub lex_mode: LexMode,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: DEFAULT_MAX_NESTING_DEPTH,
            lex_mode: LexMode::Auto,
        }
    }
}

/// Classifies a recoverable parse error. The display form is the
/// diagnostic message.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    #[error("expected {expected}, found {found}")]
    ExpectedToken {
        expected: &'static str,
        found: String,
    },
    #[error("unclosed '{delimiter}'")]
    UnclosedDelimiter { delimiter: char },
    #[error("unexpected closing '{delimiter}'")]
    UnexpectedClosingDelimiter { delimiter: char },
    #[error("malformed parameter list: {detail}")]
    MalformedParameterList { detail: &'static str },
    #[error("missing ',' between enum cases")]
    MalformedEnumCase,
    #[error("malformed match arm: {detail}")]
    MalformedMatchArm { detail: &'static str },
    #[error("unexpected '{found}' after '{after}'")]
    UnexpectedOperator {
        after: &'static str,
        found: &'static str,
    },
    #[error("unexpected end of input, expected {expected}")]
    UnexpectedEndOfInput { expected: &'static str },
    #[error("nesting exceeds the maximum depth of {max}")]
    NestingTooDeep { max: usize },
}

impl ParseErrorKind {
    #[must_use]
    pub const fn code(&self) -> DiagnosticCode {
        match self {
            Self::ExpectedToken { .. } => DiagnosticCode::ExpectedToken,
            Self::UnclosedDelimiter { .. } | Self::UnexpectedClosingDelimiter { .. } => {
                DiagnosticCode::UnbalancedDelimiter
            }
            Self::MalformedParameterList { .. } => DiagnosticCode::MalformedParameterList,
            Self::MalformedEnumCase => DiagnosticCode::MalformedEnumCase,
            Self::MalformedMatchArm { .. } => DiagnosticCode::MalformedMatchArm,
            Self::UnexpectedOperator { .. } => DiagnosticCode::UnexpectedOperator,
            Self::UnexpectedEndOfInput { .. } => DiagnosticCode::UnexpectedEndOfInput,
            Self::NestingTooDeep { .. } => DiagnosticCode::NestingTooDeep,
        }
    }
}

/// Output of one parse: the tree, its diagnostics sorted for reporting,
/// and whether any error node was needed.
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub source: SourceBuffer,
    pub tree: SyntaxTree,
    pub diagnostics: Vec<Diagnostic>,
    pub recovered: bool,
}

impl ParseResult {
    /// Diagnostics as flat, serializable records.
    #[must_use]
    pub fn records(&self) -> Vec<DiagnosticRecord> {
        self.diagnostics
            .iter()
            .map(|d| d.to_record(&self.source))
            .collect()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Exact reconstruction of the input from the tree.
    #[must_use]
    pub fn text(&self) -> String {
        self.tree.text()
    }
}

/// Parse a source buffer. Always returns a tree.
#[must_use]
pub fn parse(source: SourceBuffer, config: &ParserConfig) -> ParseResult {
    let (tree, sink) = Parser::new(&source, config).parse_program();
    let diagnostics = sink.into_sorted();
    let recovered = tree.has_errors();
    tracing::debug!(
        name = source.name().unwrap_or("<input>"),
        bytes = source.len(),
        tokens = tree.tokens().len(),
        diagnostics = diagnostics.len(),
        recovered,
        "parsed"
    );
    ParseResult {
        source,
        tree,
        diagnostics,
        recovered,
    }
}

/// Lazy lookahead over the lexer that folds trivia into the next
/// significant token.
struct TokenStream<'a> {
    lexer: Lexer<'a>,
    lookahead: VecDeque<Token>,
    eof: Token,
}

impl<'a> TokenStream<'a> {
    fn new(lexer: Lexer<'a>, source: &SourceBuffer) -> Self {
        let end = source.len();
        let position = source.position(end).unwrap_or_default();
        Self {
            lexer,
            lookahead: VecDeque::new(),
            eof: Token {
                kind: TokenKind::Eof,
                text: String::new(),
                span: Span::empty(end),
                start: position,
                end: position,
                leading_trivia: Vec::new(),
            },
        }
    }

    fn next_significant(&mut self) -> Option<Token> {
        let mut trivia = Vec::new();
        loop {
            let mut token = self.lexer.next()?;
            if token.kind.is_trivia() {
                trivia.push(token);
                continue;
            }
            token.leading_trivia = trivia;
            return Some(token);
        }
    }

    fn nth(&mut self, n: usize) -> &Token {
        while self.lookahead.len() <= n {
            match self.next_significant() {
                Some(token) => self.lookahead.push_back(token),
                None => break,
            }
        }
        let last = self.lookahead.len().saturating_sub(1);
        self.lookahead.get(n.min(last)).unwrap_or(&self.eof)
    }

    /// Next token, except `Eof`, which stays in place until
    /// [`Self::take_eof`].
    fn pop(&mut self) -> Option<Token> {
        if self.nth(0).is_eof() {
            return None;
        }
        self.lookahead.pop_front()
    }

    fn take_eof(&mut self) -> Token {
        self.nth(0);
        self.lookahead
            .pop_front()
            .unwrap_or_else(|| self.eof.clone())
    }
}

pub(crate) struct Parser<'a> {
    source: &'a SourceBuffer,
    tokens: TokenStream<'a>,
    builder: TreeBuilder,
    sink: DiagnosticSink,
    max_depth: usize,
    depth: usize,
    consumed: usize,
    /// Previous token was `Invalid` and already reported.
    last_invalid: bool,
    /// Offset of the last missing-token report, to avoid stacking a
    /// second report on the same spot.
    last_error_offset: Option<usize>,
    /// Input started directly in PHP mode, without an open tag.
    snippet: bool,
    delimiters: Vec<Punct>,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(source: &'a SourceBuffer, config: &ParserConfig) -> Self {
        let lexer = Lexer::with_mode(source, config.lex_mode);
        Self {
            source,
            snippet: lexer.in_php(),
            tokens: TokenStream::new(lexer, source),
            builder: TreeBuilder::new(),
            sink: DiagnosticSink::new(),
            max_depth: config.max_nesting_depth,
            depth: 0,
            consumed: 0,
            last_invalid: false,
            last_error_offset: None,
            delimiters: Vec::new(),
        }
    }

    pub(crate) fn parse_program(mut self) -> (SyntaxTree, DiagnosticSink) {
        self.builder.start_node();
        while !self.at_eof() {
            self.parse_statement();
        }
        let eof = self.tokens.take_eof();
        self.builder.token(eof);
        (self.builder.finish(self.source.len()), self.sink)
    }

    // ----- Token access. -----

    fn nth(&mut self, n: usize) -> &Token {
        self.tokens.nth(n)
    }

    fn current(&mut self) -> &Token {
        self.tokens.nth(0)
    }

    fn current_span(&mut self) -> Span {
        self.current().span
    }

    fn current_kind(&mut self) -> TokenKind {
        self.current().kind.clone()
    }

    fn current_punct(&mut self) -> Option<Punct> {
        match self.current().kind {
            TokenKind::Punct(punct) => Some(punct),
            _ => None,
        }
    }

    fn at_eof(&mut self) -> bool {
        self.current().is_eof()
    }

    fn at_punct(&mut self, punct: Punct) -> bool {
        self.current().is_punct(punct)
    }

    fn at_op(&mut self, op: Operator) -> bool {
        self.current().is_operator(op)
    }

    fn at_kw(&mut self, kw: Keyword) -> bool {
        self.current().is_keyword(kw)
    }

    fn at_name(&mut self) -> bool {
        self.current().is_name_like()
    }

    fn at_variable(&mut self) -> bool {
        self.current().kind == TokenKind::Variable
    }

    /// Human description of the current token for messages.
    fn found(&mut self) -> String {
        let token = self.current();
        match token.kind {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Identifier
            | TokenKind::Keyword(_)
            | TokenKind::Variable
            | TokenKind::Integer
            | TokenKind::Float
            | TokenKind::Operator(_)
            | TokenKind::Punct(_) => format!("'{}'", token.text),
            _ => token.kind.describe(),
        }
    }

    /// Move the current token into the open node. `Invalid` tokens are
    /// wrapped in an error node carrying their lexical diagnostic.
    fn bump(&mut self) {
        let Some(token) = self.tokens.pop() else {
            return;
        };
        self.consumed += 1;
        if let TokenKind::Invalid(error) = &token.kind {
            let code = DiagnosticCode::from(error);
            let message = error.to_string();
            let span = token.span;
            self.builder.start_node();
            self.builder.token(token);
            let diagnostic = self.sink.error(code, span, message);
            self.builder
                .finish_node(NodeKind::Error { code, diagnostic });
            self.last_invalid = true;
        } else {
            self.builder.token(token);
            self.last_invalid = false;
        }
    }

    fn eat_punct(&mut self, punct: Punct) -> bool {
        let found = self.at_punct(punct);
        if found {
            self.bump();
        }
        found
    }

    fn eat_op(&mut self, op: Operator) -> bool {
        let found = self.at_op(op);
        if found {
            self.bump();
        }
        found
    }

    fn eat_kw(&mut self, kw: Keyword) -> bool {
        let found = self.at_kw(kw);
        if found {
            self.bump();
        }
        found
    }

    /// Bump a name-like token and return its text.
    fn bump_name(&mut self) -> Option<String> {
        if !self.at_name() {
            return None;
        }
        let text = self.current().text.clone();
        self.bump();
        Some(text)
    }

    /// Bump `\A\B` style names, returning the joined text.
    fn bump_qualified_name(&mut self) -> String {
        let mut name = String::new();
        if self.at_op(Operator::Backslash) {
            name.push('\\');
            self.bump();
        }
        while self.at_name() {
            name.push_str(&self.current().text);
            self.bump();
            if self.at_op(Operator::Backslash) && self.nth(1).is_name_like() {
                name.push('\\');
                self.bump();
            } else {
                break;
            }
        }
        name
    }

    // ----- Delimiters. -----

    /// Current token closes a delimiter opened by an enclosing construct.
    fn at_enclosing_closer(&mut self) -> bool {
        self.current_punct()
            .is_some_and(|punct| punct.is_closing() && self.is_enclosing_closer(punct))
    }

    fn is_enclosing_closer(&self, punct: Punct) -> bool {
        self.delimiters
            .iter()
            .any(|open| open.closer() == Some(punct))
    }

    /// Consume the closer of a delimited node, or record it as missing and
    /// wrap the node in an `UnbalancedDelimiter` error reported at the
    /// opener.
    fn finish_delimited(
        &mut self,
        open: Punct,
        open_span: Span,
        checkpoint: Checkpoint,
        kind: NodeKind,
    ) -> bool {
        let closer = open.closer().unwrap_or(open);
        let closed = self.eat_punct(closer);
        if !closed {
            self.builder.missing(punct_text(closer));
        }
        self.builder.finish_node(kind);
        if !closed {
            self.wrap_error(
                checkpoint,
                ParseErrorKind::UnclosedDelimiter {
                    delimiter: open.as_char(),
                },
                open_span,
            );
        }
        closed
    }

    /// Consume `closer` or insert an error node holding its placeholder.
    fn expect_closer(&mut self, open: Punct, open_span: Span) -> bool {
        let closer = open.closer().unwrap_or(open);
        if self.eat_punct(closer) {
            return true;
        }
        self.builder.start_node();
        self.builder.missing(punct_text(closer));
        let kind = ParseErrorKind::UnclosedDelimiter {
            delimiter: open.as_char(),
        };
        let (code, diagnostic) = self.report(&kind, open_span);
        self.builder.finish_node(NodeKind::Error { code, diagnostic });
        false
    }

    // ----- Diagnostics and error nodes. -----

    fn report(&mut self, kind: &ParseErrorKind, span: Span) -> (DiagnosticCode, DiagnosticId) {
        let code = kind.code();
        let message = kind.to_string();
        tracing::debug!(
            code = %code,
            start = span.start,
            end = span.end,
            "recovering: {message}"
        );
        (code, self.sink.error(code, span, message))
    }

    /// `ExpectedToken`, or `UnexpectedEndOfInput` at the end of input.
    fn expected(&mut self, expected: &'static str) -> ParseErrorKind {
        if self.at_eof() {
            ParseErrorKind::UnexpectedEndOfInput { expected }
        } else {
            ParseErrorKind::ExpectedToken {
                expected,
                found: self.found(),
            }
        }
    }

    /// Error node holding a single zero-width placeholder at the end of
    /// the last token.
    fn error_missing(&mut self, kind: &ParseErrorKind, placeholder: &'static str) {
        let offset = self.builder.offset();
        self.builder.start_node();
        self.builder.missing(placeholder);
        let (code, diagnostic) = self.report(kind, Span::empty(offset));
        self.builder.finish_node(NodeKind::Error { code, diagnostic });
        self.last_error_offset = Some(offset);
    }

    /// Wrap everything added since `checkpoint` in an error node.
    fn wrap_error(&mut self, checkpoint: Checkpoint, kind: ParseErrorKind, span: Span) {
        self.builder.start_node_at(checkpoint);
        let (code, diagnostic) = self.report(&kind, span);
        self.builder.finish_node(NodeKind::Error { code, diagnostic });
    }

    fn expect_punct(&mut self, punct: Punct) -> bool {
        if self.eat_punct(punct) {
            return true;
        }
        let kind = self.expected(quoted_punct(punct));
        self.error_missing(&kind, punct_text(punct));
        false
    }

    fn expect_op(&mut self, op: Operator, expected: &'static str) -> bool {
        if self.eat_op(op) {
            return true;
        }
        let kind = self.expected(expected);
        self.error_missing(&kind, op.as_str());
        false
    }

    /// Statement terminator. `?>` also terminates, and so does the end of
    /// a bare snippet. A token right after a lexical error, or a spot
    /// already reported, is not reported again.
    fn expect_semicolon(&mut self) {
        if self.eat_punct(Punct::Semicolon) {
            return;
        }
        if matches!(self.current().kind, TokenKind::CloseTag) {
            return;
        }
        if self.snippet && self.at_eof() {
            return;
        }
        if self.last_invalid || self.last_error_offset == Some(self.builder.offset()) {
            return;
        }
        let kind = ParseErrorKind::ExpectedToken {
            expected: "';'",
            found: self.found(),
        };
        self.error_missing(&kind, ";");
    }

    /// Consume one token that cannot start the construct being parsed.
    fn skip_stuck_token(&mut self, expected: &'static str) {
        if self.at_eof() {
            return;
        }
        let span = self.current_span();
        let kind = match self.current_punct() {
            Some(punct) if punct.is_closing() => {
                ParseErrorKind::UnexpectedClosingDelimiter {
                    delimiter: punct.as_char(),
                }
            }
            _ => ParseErrorKind::ExpectedToken {
                expected,
                found: self.found(),
            },
        };
        self.builder.start_node();
        self.bump();
        let (code, diagnostic) = self.report(&kind, span);
        self.builder.finish_node(NodeKind::Error { code, diagnostic });
    }

    /// Resynchronise inside a list: consume tokens into an error node
    /// until `,`, `;`, a closer of an enclosing construct, or (when
    /// `stop_at_brace`) a `{`. Nested delimiters are skipped as a whole.
    fn skip_to_list_anchor(&mut self, kind: ParseErrorKind, stop_at_brace: bool) {
        let start = self.current_span().start;
        self.builder.start_node();
        let mut nested: Vec<Punct> = Vec::new();
        loop {
            let token_kind = self.current_kind();
            match token_kind {
                TokenKind::Eof => break,
                TokenKind::Punct(Punct::Comma | Punct::Semicolon) if nested.is_empty() => break,
                TokenKind::Punct(Punct::OpenBrace) if stop_at_brace && nested.is_empty() => break,
                TokenKind::Punct(punct) if punct.is_closing() => {
                    if nested.last().and_then(|open| open.closer()) == Some(punct) {
                        nested.pop();
                    } else if self.is_enclosing_closer(punct) {
                        break;
                    }
                }
                TokenKind::Punct(punct) if punct.closer().is_some() => nested.push(punct),
                _ => {}
            }
            self.bump();
        }
        let span = Span::new(start, self.builder.offset().max(start));
        let (code, diagnostic) = self.report(&kind, span);
        self.builder.finish_node(NodeKind::Error { code, diagnostic });
    }

    // ----- Nesting guard. -----

    /// Enter one level of nesting. At the limit, the rest of the
    /// construct is consumed into a `NestingTooDeep` error node and
    /// `false` is returned.
    fn enter(&mut self) -> bool {
        if self.depth < self.max_depth {
            self.depth += 1;
            return true;
        }
        self.skip_nested_construct();
        false
    }

    fn leave(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    fn skip_nested_construct(&mut self) {
        let start = self.current_span().start;
        self.builder.start_node();
        let mut nested: Vec<Punct> = Vec::new();
        let mut consumed_any = false;
        loop {
            let token_kind = self.current_kind();
            match token_kind {
                TokenKind::Eof => break,
                TokenKind::Punct(Punct::Semicolon) if nested.is_empty() => {
                    if !consumed_any {
                        self.bump();
                    }
                    break;
                }
                TokenKind::Punct(punct) if punct.is_closing() => {
                    if nested.last().and_then(|open| open.closer()) == Some(punct) {
                        nested.pop();
                    } else if self.is_enclosing_closer(punct) {
                        break;
                    }
                }
                TokenKind::Punct(punct) if punct.closer().is_some() => nested.push(punct),
                _ => {}
            }
            self.bump();
            consumed_any = true;
        }
        let kind = ParseErrorKind::NestingTooDeep {
            max: self.max_depth,
        };
        let span = Span::new(start, self.builder.offset().max(start));
        let (code, diagnostic) = self.report(&kind, span);
        self.builder.finish_node(NodeKind::Error { code, diagnostic });
    }

    // ----- Lookahead predicates shared by the grammar modules. -----

    /// A class-like or namespace declaration starting a line at column 1.
    /// Inside an unclosed body this is taken as the start of the next
    /// top-level declaration. Named functions count only for statement
    /// blocks.
    fn at_column_one_declaration(&mut self, include_functions: bool) -> bool {
        let token = self.current();
        if token.start.column != 1 || !token.has_leading_newline() {
            return false;
        }
        match self.current_kind() {
            TokenKind::Keyword(
                Keyword::Class
                | Keyword::Interface
                | Keyword::Trait
                | Keyword::Enum
                | Keyword::Namespace,
            ) => true,
            TokenKind::Keyword(Keyword::Abstract | Keyword::Final) => include_functions,
            TokenKind::Keyword(Keyword::Function) => {
                include_functions && self.nth(1).is_name_like()
            }
            _ => false,
        }
    }

    fn at_expression_start(&mut self) -> bool {
        match &self.current().kind {
            TokenKind::Variable
            | TokenKind::Identifier
            | TokenKind::Integer
            | TokenKind::Float
            | TokenKind::String { .. }
            | TokenKind::Heredoc { .. }
            | TokenKind::Invalid(_) => true,
            TokenKind::Keyword(kw) => matches!(
                kw,
                Keyword::New
                    | Keyword::Match
                    | Keyword::Fn
                    | Keyword::Function
                    | Keyword::Static
                    | Keyword::Print
                    | Keyword::Clone
                    | Keyword::Throw
                    | Keyword::Include
                    | Keyword::IncludeOnce
                    | Keyword::Require
                    | Keyword::RequireOnce
            ),
            TokenKind::Operator(op) => matches!(
                op,
                Operator::Not
                    | Operator::Minus
                    | Operator::Plus
                    | Operator::Tilde
                    | Operator::Increment
                    | Operator::Decrement
                    | Operator::At
                    | Operator::Amp
                    | Operator::Ellipsis
                    | Operator::Backslash
                    | Operator::Dollar
            ),
            TokenKind::Punct(Punct::OpenParen | Punct::OpenBracket) => true,
            _ => false,
        }
    }

    fn at_statement_start(&mut self) -> bool {
        match self.current_kind() {
            TokenKind::Keyword(
                Keyword::Echo
                | Keyword::Return
                | Keyword::If
                | Keyword::While
                | Keyword::Foreach
                | Keyword::For
                | Keyword::Break
                | Keyword::Continue,
            ) => true,
            TokenKind::Keyword(Keyword::Static | Keyword::Function) | TokenKind::Invalid(_) => {
                false
            }
            _ => self.at_expression_start(),
        }
    }
}

const fn punct_text(punct: Punct) -> &'static str {
    match punct {
        Punct::Semicolon => ";",
        Punct::Comma => ",",
        Punct::OpenParen => "(",
        Punct::CloseParen => ")",
        Punct::OpenBrace => "{",
        Punct::CloseBrace => "}",
        Punct::OpenBracket => "[",
        Punct::CloseBracket => "]",
    }
}

const fn quoted_punct(punct: Punct) -> &'static str {
    match punct {
        Punct::Semicolon => "';'",
        Punct::Comma => "','",
        Punct::OpenParen => "'('",
        Punct::CloseParen => "')'",
        Punct::OpenBrace => "'{'",
        Punct::CloseBrace => "'}'",
        Punct::OpenBracket => "'['",
        Punct::CloseBracket => "']'",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_input(input: &str) -> ParseResult {
        parse(SourceBuffer::new(input), &ParserConfig::default())
    }

    fn codes(result: &ParseResult) -> Vec<DiagnosticCode> {
        result.diagnostics.iter().map(|d| d.code).collect()
    }

    #[test]
    fn empty_input() {
        let result = parse_input("");
        assert!(result.diagnostics.is_empty());
        assert!(!result.recovered);
        let root = result.tree.root();
        assert_eq!(result.tree.kind(root), &NodeKind::Program);
        assert_eq!(result.tree.child_nodes(root).count(), 0);
        assert_eq!(result.tree.tokens().len(), 1);
    }

    #[test]
    fn trailing_trivia_hangs_off_eof() {
        let result = parse_input("$a;\n// done\n");
        let eof = result.tree.tokens().last().expect("eof");
        assert!(eof.is_eof());
        assert_eq!(eof.leading_trivia.len(), 3);
        assert_eq!(result.text(), "$a;\n// done\n");
    }

    #[test]
    fn missing_semicolon_in_php_file() {
        let result = parse_input("<?php\n$a = 1\n$b = 2;\n");
        assert_eq!(codes(&result), vec![DiagnosticCode::ExpectedToken]);
        assert_eq!(result.diagnostics[0].span, Span::empty(12));
        assert!(result.recovered);
    }

    #[test]
    fn snippet_may_end_without_semicolon() {
        let result = parse_input("$a = 1");
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn no_second_report_after_invalid_token() {
        let result = parse_input("<?php\n$s = 'open;\n$t = 1;\n");
        assert_eq!(codes(&result), vec![DiagnosticCode::UnterminatedString]);
    }

    #[test]
    fn stray_closer_at_top_level() {
        let result = parse_input("$a = 1; } $b = 2;");
        assert_eq!(codes(&result), vec![DiagnosticCode::UnbalancedDelimiter]);
        assert_eq!(result.diagnostics[0].message, "unexpected closing '}'");
    }

    #[test]
    fn nesting_guard_reports_once() {
        let config = ParserConfig {
            max_nesting_depth: 16,
            ..ParserConfig::default()
        };
        let input = format!("$x = {}1{};", "(".repeat(40), ")".repeat(40));
        let result = parse(SourceBuffer::new(input.clone()), &config);
        assert_eq!(codes(&result), vec![DiagnosticCode::NestingTooDeep]);
        assert_eq!(result.text(), input);
    }

    #[test]
    fn error_kinds_map_to_codes() {
        assert_eq!(
            ParseErrorKind::UnexpectedClosingDelimiter { delimiter: ')' }.code(),
            DiagnosticCode::UnbalancedDelimiter
        );
        assert_eq!(
            ParseErrorKind::MalformedEnumCase.to_string(),
            "missing ',' between enum cases"
        );
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let config: ParserConfig =
            serde_json::from_str(r#"{"lex_mode": "php"}"#).expect("valid config");
        assert_eq!(config.lex_mode, LexMode::Php);
        assert_eq!(config.max_nesting_depth, DEFAULT_MAX_NESTING_DEPTH);
        assert!(serde_json::from_str::<ParserConfig>(r#"{"depth": 1}"#).is_err());
    }
}
