use std::iter::FusedIterator;

use serde::{Deserialize, Serialize};

use crate::source::SourceBuffer;
use crate::token::{CommentStyle, Keyword, OPERATORS, Punct, QuoteStyle, Span, Token, TokenKind};

const BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Classifies a lexical error carried by an `Invalid` token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, thiserror::Error)]
pub enum LexErrorKind {
    /// Quoted string without a closing quote on the same line.
    #[error("unterminated string literal")]
    UnterminatedString,
    /// Heredoc or nowdoc whose closing label never appears.
    #[error("unterminated heredoc, expected closing label '{label}'")]
    UnterminatedHeredoc { label: String },
    /// `/*` without `*/`.
    #[error("unterminated block comment")]
    UnterminatedComment,
    /// Numeric literal with a bad separator or glued identifier characters.
    #[error("malformed number literal '{text}'")]
    MalformedNumber { text: String },
    /// Byte sequence that cannot start any token.
    #[error("invalid character '{ch}'")]
    InvalidCharacter { ch: char },
}

/// Where the lexer starts: inside PHP code or in inline HTML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LexMode {
    /// HTML mode when the input contains an open tag, PHP mode otherwise.
    #[default]
    Auto,
    Html,
    Php,
}

impl LexMode {
    /// Returns true when lexing of `input` starts in PHP mode.
    #[must_use]
    pub fn starts_in_php(self, input: &[u8]) -> bool {
        match self {
            Self::Php => true,
            Self::Html => false,
            Self::Auto => find_open_tag(input).is_none(),
        }
    }
}

/// Tokenize a whole buffer, trivia included, ending with `Eof`.
///
/// Never fails: malformed input becomes `TokenKind::Invalid` tokens.
#[must_use]
pub fn tokenize(source: &SourceBuffer) -> Vec<Token> {
    Lexer::new(source).collect()
}

/// Lazy token iterator over a `SourceBuffer`.
///
/// Every byte of the input lands in exactly one token, and the last
/// token is always a zero-width `Eof`.
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    source: &'a SourceBuffer,
    input: &'a [u8],
    pos: usize,
    in_php: bool,
    finished: bool,
}

impl<'a> Lexer<'a> {
    #[must_use]
    pub fn new(source: &'a SourceBuffer) -> Self {
        Self::with_mode(source, LexMode::Auto)
    }

    #[must_use]
    pub fn with_mode(source: &'a SourceBuffer, mode: LexMode) -> Self {
        let in_php = mode.starts_in_php(source.as_bytes());
        Self::resume_at(source, 0, in_php)
    }

    /// Restart lexing at `offset`. The offset must be a token boundary
    /// previously reported by this lexer, and `in_php` the mode at it.
    #[must_use]
    pub fn resume_at(source: &'a SourceBuffer, offset: usize, in_php: bool) -> Self {
        Self {
            source,
            input: source.as_bytes(),
            pos: offset.min(source.len()),
            in_php,
            finished: false,
        }
    }

    /// Byte offset of the next token.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.pos
    }

    #[must_use]
    pub const fn in_php(&self) -> bool {
        self.in_php
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.input.get(self.pos + offset).copied()
    }

    fn make(&self, kind: TokenKind, start: usize, end: usize) -> Token {
        if let TokenKind::Invalid(error) = &kind {
            tracing::trace!(start, end, %error, "invalid token");
        }
        Token {
            kind,
            text: String::from_utf8_lossy(&self.input[start..end]).into_owned(),
            span: Span::new(start, end),
            start: self.source.position(start).unwrap_or_default(),
            end: self.source.position(end).unwrap_or_default(),
            leading_trivia: Vec::new(),
        }
    }

    /// Consume up to `end` and build a token for `start..end`.
    fn take(&mut self, kind: TokenKind, start: usize, end: usize) -> Token {
        self.pos = end;
        self.make(kind, start, end)
    }

    fn lex_html(&mut self) -> Token {
        let start = self.pos;
        if let Some(len) = open_tag_len(&self.input[start..]) {
            self.in_php = true;
            return self.take(TokenKind::OpenTag, start, start + len);
        }
        let end = find_open_tag(&self.input[start..]).map_or(self.input.len(), |i| start + i);
        self.take(TokenKind::InlineHtml, start, end)
    }

    fn lex_php(&mut self) -> Token {
        let start = self.pos;
        let ch = self.input[start];

        match ch {
            b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c => self.lex_whitespace(),
            0xEF if start == 0 && self.input.starts_with(BOM) => self.lex_whitespace(),
            b'#' => self.lex_line_comment(CommentStyle::Hash),
            b'/' if self.peek_at(1) == Some(b'/') => self.lex_line_comment(CommentStyle::Line),
            b'/' if self.peek_at(1) == Some(b'*') => self.lex_block_comment(),
            b'?' if self.peek_at(1) == Some(b'>') => {
                self.in_php = false;
                self.take(TokenKind::CloseTag, start, start + 2)
            }
            b'$' if self.peek_at(1).is_some_and(is_ident_start) => {
                let end = self.scan_while(start + 1, is_ident_char);
                self.take(TokenKind::Variable, start, end)
            }
            b'\'' => self.lex_quoted(QuoteStyle::Single),
            b'"' => self.lex_quoted(QuoteStyle::Double),
            b'`' => self.lex_quoted(QuoteStyle::Backtick),
            b'0'..=b'9' => self.lex_number(),
            b'.' if self.peek_at(1).is_some_and(|c| c.is_ascii_digit()) => self.lex_number(),
            b'<' if self.input[start..].starts_with(b"<<<") => self
                .lex_heredoc()
                .unwrap_or_else(|| self.lex_operator()),
            c if is_ident_start(c) => {
                let end = self.scan_while(start, is_ident_char);
                let text = String::from_utf8_lossy(&self.input[start..end]);
                let kind = Keyword::from_ident(&text)
                    .map_or(TokenKind::Identifier, TokenKind::Keyword);
                self.take(kind, start, end)
            }
            c => match Punct::from_byte(c) {
                Some(punct) => self.take(TokenKind::Punct(punct), start, start + 1),
                None => self.lex_operator(),
            },
        }
    }

    fn scan_while(&self, mut i: usize, pred: impl Fn(u8) -> bool) -> usize {
        while self.input.get(i).is_some_and(|&c| pred(c)) {
            i += 1;
        }
        i
    }

    fn lex_whitespace(&mut self) -> Token {
        let start = self.pos;
        let mut i = if start == 0 && self.input.starts_with(BOM) {
            BOM.len()
        } else {
            start
        };
        i = self.scan_while(i, |c| matches!(c, b' ' | b'\t' | b'\n' | b'\r' | 0x0b | 0x0c));
        self.take(TokenKind::Whitespace, start, i)
    }

    fn lex_line_comment(&mut self, style: CommentStyle) -> Token {
        let start = self.pos;
        let mut i = start;
        while let Some(&c) = self.input.get(i) {
            if c == b'\n' || c == b'\r' {
                break;
            }
            // `?>` ends a single-line comment as well as the PHP block.
            if c == b'?' && self.input.get(i + 1) == Some(&b'>') {
                break;
            }
            i += 1;
        }
        self.take(TokenKind::Comment(style), start, i)
    }

    fn lex_block_comment(&mut self) -> Token {
        let start = self.pos;
        let body = &self.input[start + 2..];
        match body.windows(2).position(|w| w == b"*/") {
            Some(idx) => {
                let end = start + 2 + idx + 2;
                let style = if self.input[start..end].starts_with(b"/**") && end - start > 4 {
                    CommentStyle::Doc
                } else {
                    CommentStyle::Block
                };
                self.take(TokenKind::Comment(style), start, end)
            }
            None => self.take(
                TokenKind::Invalid(LexErrorKind::UnterminatedComment),
                start,
                self.input.len(),
            ),
        }
    }

    fn lex_quoted(&mut self, quote: QuoteStyle) -> Token {
        let start = self.pos;
        let delimiter = self.input[start];
        let interpolating = quote != QuoteStyle::Single;
        let mut interpolations = Vec::new();
        let mut i = start + 1;

        loop {
            match self.input.get(i) {
                // Strings must close on their own line; resume on the next.
                None | Some(b'\n' | b'\r') => {
                    return self.take(
                        TokenKind::Invalid(LexErrorKind::UnterminatedString),
                        start,
                        i,
                    );
                }
                Some(b'\\') => match self.input.get(i + 1) {
                    None | Some(b'\n' | b'\r') => i += 1,
                    Some(_) => i += 2,
                },
                Some(&c) if c == delimiter => {
                    i += 1;
                    break;
                }
                Some(b'$') if interpolating && self.input.get(i + 1).is_some_and(|&c| is_ident_start(c)) => {
                    interpolations.push(i);
                    i += 1;
                }
                Some(b'{') if interpolating && self.input.get(i + 1) == Some(&b'$') => {
                    interpolations.push(i);
                    i += 2;
                }
                Some(_) => i += 1,
            }
        }

        self.take(
            TokenKind::String {
                quote,
                interpolations,
            },
            start,
            i,
        )
    }

    /// Lex `<<<LABEL`, `<<<"LABEL"` or `<<<'LABEL'`. Returns `None` when
    /// the opener is not well formed, so the caller can fall back to
    /// operators (`<<` followed by `<`).
    fn lex_heredoc(&mut self) -> Option<Token> {
        let start = self.pos;
        let input = self.input;
        let mut i = self.scan_while(start + 3, |c| c == b' ' || c == b'\t');

        let quote = match input.get(i) {
            Some(&q @ (b'\'' | b'"')) => {
                i += 1;
                Some(q)
            }
            _ => None,
        };
        if !input.get(i).is_some_and(|&c| is_ident_start(c)) {
            return None;
        }
        let label_start = i;
        i = self.scan_while(i, is_ident_char);
        let label = String::from_utf8_lossy(&input[label_start..i]).into_owned();
        if let Some(q) = quote {
            if input.get(i) != Some(&q) {
                return None;
            }
            i += 1;
        }
        match input.get(i) {
            Some(b'\n') => i += 1,
            Some(b'\r') => {
                i += 1;
                if input.get(i) == Some(&b'\n') {
                    i += 1;
                }
            }
            _ => return None,
        }

        let nowdoc = quote == Some(b'\'');
        let body_start = i;
        let mut line_start = i;

        while line_start < input.len() {
            let j = self.scan_while(line_start, |c| c == b' ' || c == b'\t');
            let closes = input[j..].starts_with(label.as_bytes())
                && !input.get(j + label.len()).is_some_and(|&c| is_ident_char(c));
            if closes {
                let interpolations = if nowdoc {
                    Vec::new()
                } else {
                    scan_interpolations(input, body_start, line_start)
                };
                let end = j + label.len();
                return Some(self.take(
                    TokenKind::Heredoc {
                        label,
                        nowdoc,
                        interpolations,
                    },
                    start,
                    end,
                ));
            }
            line_start = input[line_start..]
                .iter()
                .position(|&c| c == b'\n')
                .map_or(input.len(), |k| line_start + k + 1);
        }

        Some(self.take(
            TokenKind::Invalid(LexErrorKind::UnterminatedHeredoc { label }),
            start,
            input.len(),
        ))
    }

    fn lex_number(&mut self) -> Token {
        let start = self.pos;
        let input = self.input;
        let mut is_float = false;
        let mut malformed = false;

        let radix = match (input[start], input.get(start + 1)) {
            (b'0', Some(b'x' | b'X')) => Some(is_hex_digit as fn(u8) -> bool),
            (b'0', Some(b'b' | b'B')) => Some(is_binary_digit as fn(u8) -> bool),
            (b'0', Some(b'o' | b'O')) => Some(is_octal_digit as fn(u8) -> bool),
            _ => None,
        };

        let mut i = if let Some(pred) = radix {
            let end = self.scan_digits(start + 2, pred);
            malformed = end == start + 2;
            end
        } else {
            let digit = |c: u8| c.is_ascii_digit();
            let mut i = self.scan_digits(start, digit);
            if input.get(i) == Some(&b'.') && input.get(i + 1).is_some_and(u8::is_ascii_digit) {
                is_float = true;
                i = self.scan_digits(i + 1, digit);
            }
            if matches!(input.get(i), Some(b'e' | b'E')) {
                let mut j = i + 1;
                if matches!(input.get(j), Some(b'+' | b'-')) {
                    j += 1;
                }
                if input.get(j).is_some_and(u8::is_ascii_digit) {
                    is_float = true;
                    i = self.scan_digits(j, digit);
                }
            }
            i
        };

        // Identifier characters glued to the literal (`12abc`, `1__0`,
        // `1_`, `1e`) make the whole run malformed.
        if input.get(i).is_some_and(|&c| is_ident_char(c)) {
            malformed = true;
            i = self.scan_while(i, is_ident_char);
        }

        if malformed {
            let text = String::from_utf8_lossy(&input[start..i]).into_owned();
            return self.take(
                TokenKind::Invalid(LexErrorKind::MalformedNumber { text }),
                start,
                i,
            );
        }

        let kind = if is_float {
            TokenKind::Float
        } else {
            TokenKind::Integer
        };
        self.take(kind, start, i)
    }

    /// Scan digits accepted by `pred`, allowing single `_` separators
    /// between two digits.
    fn scan_digits(&self, mut i: usize, pred: impl Fn(u8) -> bool) -> usize {
        let first = i;
        loop {
            match self.input.get(i) {
                Some(&c) if pred(c) => i += 1,
                Some(b'_')
                    if i > first
                        && pred(self.input[i - 1])
                        && self.input.get(i + 1).is_some_and(|&c| pred(c)) =>
                {
                    i += 1;
                }
                _ => break,
            }
        }
        i
    }

    fn lex_operator(&mut self) -> Token {
        let start = self.pos;
        let rest = &self.input[start..];

        if let Some((text, op)) = OPERATORS
            .iter()
            .find(|(text, _)| rest.starts_with(text.as_bytes()))
        {
            return self.take(TokenKind::Operator(*op), start, start + text.len());
        }

        // Skip to a resynchronisation point: whitespace, a quote or `;`.
        let ch = String::from_utf8_lossy(&rest[..utf8_len(rest[0]).min(rest.len())])
            .chars()
            .next()
            .unwrap_or(char::REPLACEMENT_CHARACTER);
        let mut i = start + ch.len_utf8().max(1);
        while let Some(&c) = self.input.get(i) {
            if c.is_ascii_whitespace() || matches!(c, b'\'' | b'"' | b';') {
                break;
            }
            i += 1;
        }
        self.take(
            TokenKind::Invalid(LexErrorKind::InvalidCharacter { ch }),
            start,
            i,
        )
    }
}

impl Iterator for Lexer<'_> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        if self.finished {
            return None;
        }
        if self.pos >= self.input.len() {
            self.finished = true;
            return Some(self.make(TokenKind::Eof, self.pos, self.pos));
        }
        let token = if self.in_php {
            self.lex_php()
        } else {
            self.lex_html()
        };
        Some(token)
    }
}

impl FusedIterator for Lexer<'_> {}

const fn is_ident_start(c: u8) -> bool {
    c.is_ascii_alphabetic() || c == b'_' || c >= 0x80
}

const fn is_ident_char(c: u8) -> bool {
    is_ident_start(c) || c.is_ascii_digit()
}

const fn is_hex_digit(c: u8) -> bool {
    c.is_ascii_hexdigit()
}

const fn is_binary_digit(c: u8) -> bool {
    matches!(c, b'0' | b'1')
}

const fn is_octal_digit(c: u8) -> bool {
    matches!(c, b'0'..=b'7')
}

const fn utf8_len(first: u8) -> usize {
    match first {
        0xF0..=0xFF => 4,
        0xE0..=0xEF => 3,
        0xC0..=0xDF => 2,
        _ => 1,
    }
}

/// Length of the open tag at the start of `bytes`, if any.
fn open_tag_len(bytes: &[u8]) -> Option<usize> {
    if bytes.len() >= 5 && bytes[..5].eq_ignore_ascii_case(b"<?php") {
        Some(5)
    } else if bytes.starts_with(b"<?=") {
        Some(3)
    } else {
        None
    }
}

fn find_open_tag(bytes: &[u8]) -> Option<usize> {
    (0..bytes.len()).find(|&i| bytes[i] == b'<' && open_tag_len(&bytes[i..]).is_some())
}

/// Offsets of `$name` and `{$` markers in `input[from..to]`, skipping
/// escaped dollars.
fn scan_interpolations(input: &[u8], from: usize, to: usize) -> Vec<usize> {
    let mut markers = Vec::new();
    let mut i = from;
    while i < to {
        match input[i] {
            b'\\' => i += 2,
            b'$' if input.get(i + 1).is_some_and(|&c| is_ident_start(c)) => {
                markers.push(i);
                i += 1;
            }
            b'{' if input.get(i + 1) == Some(&b'$') => {
                markers.push(i);
                i += 2;
            }
            _ => i += 1,
        }
    }
    markers
}
