//! Error-tolerant PHP lexer and parser.
//!
//! Parsing never fails. Every input, however broken, produces a lossless
//! syntax tree (its text is exactly the input) and a list of structured
//! diagnostics. Broken regions show up as error nodes and zero-width
//! missing placeholders, so tools downstream can keep working on the
//! parts that make sense.
//!
//! # Quick start
//!
//! ## Parse and inspect diagnostics
//!
//! ```
//! use php_syntax_rs::parse_str;
//!
//! let input = "<?php\nfunction greet($name {\n    echo \"hi\";\n}\n";
//! let result = parse_str(input);
//! assert_eq!(result.text(), input);
//! for record in result.records() {
//!     println!("{record}");
//! }
//! assert!(result.has_errors());
//! ```
//!
//! ## Format a valid file
//!
//! ```
//! use php_syntax_rs::{format, parse_str};
//!
//! let result = parse_str("<?php\nif($a){echo $b;}\n");
//! assert!(result.diagnostics.is_empty());
//! assert_eq!(format(&result.tree), "<?php\nif ($a) {\n    echo $b;\n}\n");
//! ```
//!
//! ## Lint with a configuration
//!
//! ```
//! use php_syntax_rs::{Config, lint, parse_str};
//!
//! let config = Config::from_json(r#"{"lint": {"line-length": {"max": 20}}}"#).unwrap();
//! let result = parse_str("<?php\n$message = 'a rather long line';\n");
//! let findings = lint(&result, &config.lint);
//! assert_eq!(findings[0].code.as_str(), "line-length");
//! ```

// Allow noisy pedantic lints that don't add value for
// a library crate.
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions
)]

pub mod ast;
pub mod config;
pub mod diagnostic;
pub mod formatter;
pub mod lexer;
pub mod lint;
pub mod parser;
pub mod source;
pub mod token;
pub mod tree;

pub use ast::{Declaration, NodeKind};
pub use config::{Config, ConfigError};
pub use diagnostic::{Diagnostic, DiagnosticCode, DiagnosticRecord, DiagnosticSink, Severity};
pub use formatter::format;
pub use lexer::{LexErrorKind, LexMode, Lexer, tokenize};
pub use lint::{LintConfig, LintLevel, LintRule, lint};
pub use parser::{ParseErrorKind, ParseResult, ParserConfig, parse};
pub use source::{PositionError, SourceBuffer};
pub use token::{Position, Span, Token, TokenKind};
pub use tree::{NodeId, SyntaxTree, TokenId};

/// Unified error type for the fallible operations around parsing.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configuration could not be read or decoded.
    #[error("{0}")]
    Config(#[from] ConfigError),
    /// An offset or line did not exist in the source.
    #[error("{0}")]
    Position(#[from] PositionError),
    /// A source file could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
}

/// Parse a source string with the default configuration.
#[must_use]
pub fn parse_str(input: &str) -> ParseResult {
    parse(SourceBuffer::new(input), &ParserConfig::default())
}

/// Read and parse a file, naming the source buffer after its path.
pub fn parse_file(path: &std::path::Path, config: &ParserConfig) -> Result<ParseResult, Error> {
    let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let source = SourceBuffer::new(text).with_name(path.display().to_string());
    Ok(parse(source, config))
}
