//! Structured diagnostics and the per-parse sink that collects them.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::lexer::LexErrorKind;
use crate::lint::LintRule;
use crate::source::SourceBuffer;
use crate::token::Span;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    // Declaration order is the tie-break order: errors sort first.
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
        }
    }
}

/// Arrival index of a diagnostic within one sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DiagnosticId(pub usize);

/// Machine-readable diagnostic code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticCode {
    UnterminatedString,
    UnterminatedHeredoc,
    UnterminatedComment,
    MalformedNumber,
    InvalidCharacter,
    ExpectedToken,
    UnbalancedDelimiter,
    MalformedParameterList,
    MalformedEnumCase,
    MalformedMatchArm,
    UnexpectedOperator,
    UnexpectedEndOfInput,
    NestingTooDeep,
    Lint(LintRule),
}

impl DiagnosticCode {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::UnterminatedString => "UnterminatedString",
            Self::UnterminatedHeredoc => "UnterminatedHeredoc",
            Self::UnterminatedComment => "UnterminatedComment",
            Self::MalformedNumber => "MalformedNumber",
            Self::InvalidCharacter => "InvalidCharacter",
            Self::ExpectedToken => "ExpectedToken",
            Self::UnbalancedDelimiter => "UnbalancedDelimiter",
            Self::MalformedParameterList => "MalformedParameterList",
            Self::MalformedEnumCase => "MalformedEnumCase",
            Self::MalformedMatchArm => "MalformedMatchArm",
            Self::UnexpectedOperator => "UnexpectedOperator",
            Self::UnexpectedEndOfInput => "UnexpectedEndOfInput",
            Self::NestingTooDeep => "NestingTooDeep",
            Self::Lint(rule) => rule.as_str(),
        }
    }

    /// Lexical codes come from `Invalid` tokens rather than the parser.
    #[must_use]
    pub const fn is_lexical(self) -> bool {
        matches!(
            self,
            Self::UnterminatedString
                | Self::UnterminatedHeredoc
                | Self::UnterminatedComment
                | Self::MalformedNumber
                | Self::InvalidCharacter
        )
    }
}

impl From<&LexErrorKind> for DiagnosticCode {
    fn from(kind: &LexErrorKind) -> Self {
        match kind {
            LexErrorKind::UnterminatedString => Self::UnterminatedString,
            LexErrorKind::UnterminatedHeredoc { .. } => Self::UnterminatedHeredoc,
            LexErrorKind::UnterminatedComment => Self::UnterminatedComment,
            LexErrorKind::MalformedNumber { .. } => Self::MalformedNumber,
            LexErrorKind::InvalidCharacter { .. } => Self::InvalidCharacter,
        }
    }
}

impl fmt::Display for DiagnosticCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DiagnosticCode {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub id: DiagnosticId,
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub span: Span,
    pub message: String,
}

impl Diagnostic {
    /// Convert to the flat, 1-based record used for transport.
    #[must_use]
    pub fn to_record(&self, source: &SourceBuffer) -> DiagnosticRecord {
        let start = source.position(self.span.start).unwrap_or_default();
        let end = source.position(self.span.end).unwrap_or(start);
        DiagnosticRecord {
            severity: self.severity,
            start_line: start.line,
            start_column: start.column,
            end_line: end.line,
            end_column: end.column,
            code: self.code.as_str().to_string(),
            message: self.message.clone(),
        }
    }
}

/// Serializable diagnostic with 1-based line and column positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiagnosticRecord {
    pub severity: Severity,
    pub start_line: usize,
    pub start_column: usize,
    pub end_line: usize,
    pub end_column: usize,
    pub code: String,
    pub message: String,
}

impl fmt::Display for DiagnosticRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}: {} [{}] {}",
            self.start_line, self.start_column, self.severity, self.code, self.message
        )
    }
}

/// Collects diagnostics for one parse run.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    diagnostics: Vec<Diagnostic>,
    first_id: usize,
}

impl DiagnosticSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sink whose ids start at `first_id`, for diagnostics that will be
    /// merged into an existing list.
    #[must_use]
    pub const fn starting_at(first_id: usize) -> Self {
        Self {
            diagnostics: Vec::new(),
            first_id,
        }
    }

    pub fn push(
        &mut self,
        severity: Severity,
        code: DiagnosticCode,
        span: Span,
        message: impl Into<String>,
    ) -> DiagnosticId {
        let id = DiagnosticId(self.first_id + self.diagnostics.len());
        self.diagnostics.push(Diagnostic {
            id,
            severity,
            code,
            span,
            message: message.into(),
        });
        id
    }

    pub fn error(
        &mut self,
        code: DiagnosticCode,
        span: Span,
        message: impl Into<String>,
    ) -> DiagnosticId {
        self.push(Severity::Error, code, span, message)
    }

    pub fn warning(
        &mut self,
        code: DiagnosticCode,
        span: Span,
        message: impl Into<String>,
    ) -> DiagnosticId {
        self.push(Severity::Warning, code, span, message)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.diagnostics.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }

    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Diagnostics in arrival order.
    #[must_use]
    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Consume the sink, returning diagnostics sorted by start offset,
    /// then severity, then arrival.
    #[must_use]
    pub fn into_sorted(self) -> Vec<Diagnostic> {
        let mut diagnostics = self.diagnostics;
        sort_diagnostics(&mut diagnostics);
        diagnostics
    }
}

/// Sort in reporting order. Stable across runs because the arrival id is
/// the final key.
pub fn sort_diagnostics(diagnostics: &mut [Diagnostic]) {
    diagnostics.sort_by_key(|d| (d.span.start, d.severity, d.id));
}
