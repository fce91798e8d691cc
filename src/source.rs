//! Immutable source text with a precomputed line index.

use crate::token::{Position, Span};

/// Offset lookups outside the buffer. Always a caller bug, never a
/// property of the PHP input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    #[error("offset {offset} is out of range for a source of {len} bytes")]
    OffsetOutOfRange { offset: usize, len: usize },
    #[error("line {line} is out of range for a source of {lines} lines")]
    LineOutOfRange { line: usize, lines: usize },
}

/// Source text plus the byte offset of every line start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceBuffer {
    name: Option<String>,
    text: String,
    line_starts: Vec<usize>,
}

impl SourceBuffer {
    #[must_use]
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let line_starts = std::iter::once(0)
            .chain(
                text.bytes()
                    .enumerate()
                    .filter(|&(_, b)| b == b'\n')
                    .map(|(i, _)| i + 1),
            )
            .collect();
        Self {
            name: None,
            text,
            line_starts,
        }
    }

    /// Attach a file path or buffer name, used only when reporting.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        self.text.as_bytes()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    #[must_use]
    pub fn byte(&self, offset: usize) -> Option<u8> {
        self.text.as_bytes().get(offset).copied()
    }

    /// Text covered by `span`, or `None` if it is out of range or splits
    /// a UTF-8 sequence.
    #[must_use]
    pub fn slice(&self, span: Span) -> Option<&str> {
        self.text.get(span.start..span.end)
    }

    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Text of a 1-based line, without its line terminator.
    #[must_use]
    pub fn line_text(&self, line: usize) -> Option<&str> {
        let start = *self.line_starts.get(line.checked_sub(1)?)?;
        let end = self
            .line_starts
            .get(line)
            .map_or(self.text.len(), |next| next - 1);
        let raw = self.text.get(start..end)?;
        Some(raw.strip_suffix('\r').unwrap_or(raw))
    }

    /// Map a byte offset to its 1-based line and column.
    ///
    /// The offset equal to the buffer length is valid (end of input).
    ///
    /// # Errors
    ///
    /// Returns `PositionError::OffsetOutOfRange` past the end of the text.
    pub fn position(&self, offset: usize) -> Result<Position, PositionError> {
        if offset > self.text.len() {
            return Err(PositionError::OffsetOutOfRange {
                offset,
                len: self.text.len(),
            });
        }
        let line_index = match self.line_starts.binary_search(&offset) {
            Ok(index) => index,
            Err(index) => index - 1,
        };
        let line_start = self.line_starts[line_index];
        let column = self
            .text
            .get(line_start..offset)
            .map_or(offset - line_start, |prefix| prefix.chars().count());
        Ok(Position {
            line: line_index + 1,
            column: column + 1,
        })
    }

    /// Map a 1-based line and column back to a byte offset.
    ///
    /// # Errors
    ///
    /// Returns `PositionError::LineOutOfRange` for a line that does not
    /// exist. Columns past the end of the line clamp to the line end.
    pub fn offset(&self, position: Position) -> Result<usize, PositionError> {
        let lines = self.line_starts.len();
        let line_text =
            self.line_text(position.line)
                .ok_or(PositionError::LineOutOfRange {
                    line: position.line,
                    lines,
                })?;
        let start = self.line_starts[position.line - 1];
        let within = line_text
            .char_indices()
            .nth(position.column.saturating_sub(1))
            .map_or(line_text.len(), |(i, _)| i);
        Ok(start + within)
    }
}
