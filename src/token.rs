use serde::{Deserialize, Serialize};

use crate::lexer::LexErrorKind;

/// Half-open byte range into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    #[must_use]
    pub const fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Zero-width span at `offset`.
    #[must_use]
    pub const fn empty(offset: usize) -> Self {
        Self {
            start: offset,
            end: offset,
        }
    }

    #[must_use]
    pub const fn len(self) -> usize {
        self.end - self.start
    }

    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.start == self.end
    }

    /// Returns true if `other` lies fully inside `self`.
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.start <= other.start && other.end <= self.end
    }

    /// Returns true if `offset` falls inside the span. The end offset
    /// counts as inside so that a cursor after the last byte still hits.
    #[must_use]
    pub const fn contains_offset(self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }

    /// Smallest span covering both `self` and `other`.
    #[must_use]
    pub const fn merge(self, other: Self) -> Self {
        let start = if self.start < other.start {
            self.start
        } else {
            other.start
        };
        let end = if self.end > other.end {
            self.end
        } else {
            other.end
        };
        Self { start, end }
    }
}

/// 1-based line and column. Columns count characters, not bytes.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Default for Position {
    fn default() -> Self {
        Self { line: 1, column: 1 }
    }
}

/// Reserved words recognised by the lexer. Matching is case-insensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Abstract,
    As,
    Break,
    Case,
    Class,
    Clone,
    Const,
    Continue,
    Default,
    Echo,
    Else,
    ElseIf,
    Enum,
    Extends,
    Final,
    Fn,
    For,
    Foreach,
    Function,
    If,
    Implements,
    Include,
    IncludeOnce,
    Instanceof,
    Interface,
    Match,
    Namespace,
    New,
    Print,
    Private,
    Protected,
    Public,
    Readonly,
    Require,
    RequireOnce,
    Return,
    Static,
    Throw,
    Trait,
    Use,
    Var,
    While,
}

const KEYWORDS: &[(&str, Keyword)] = &[
    ("abstract", Keyword::Abstract),
    ("as", Keyword::As),
    ("break", Keyword::Break),
    ("case", Keyword::Case),
    ("class", Keyword::Class),
    ("clone", Keyword::Clone),
    ("const", Keyword::Const),
    ("continue", Keyword::Continue),
    ("default", Keyword::Default),
    ("echo", Keyword::Echo),
    ("else", Keyword::Else),
    ("elseif", Keyword::ElseIf),
    ("enum", Keyword::Enum),
    ("extends", Keyword::Extends),
    ("final", Keyword::Final),
    ("fn", Keyword::Fn),
    ("for", Keyword::For),
    ("foreach", Keyword::Foreach),
    ("function", Keyword::Function),
    ("if", Keyword::If),
    ("implements", Keyword::Implements),
    ("include", Keyword::Include),
    ("include_once", Keyword::IncludeOnce),
    ("instanceof", Keyword::Instanceof),
    ("interface", Keyword::Interface),
    ("match", Keyword::Match),
    ("namespace", Keyword::Namespace),
    ("new", Keyword::New),
    ("print", Keyword::Print),
    ("private", Keyword::Private),
    ("protected", Keyword::Protected),
    ("public", Keyword::Public),
    ("readonly", Keyword::Readonly),
    ("require", Keyword::Require),
    ("require_once", Keyword::RequireOnce),
    ("return", Keyword::Return),
    ("static", Keyword::Static),
    ("throw", Keyword::Throw),
    ("trait", Keyword::Trait),
    ("use", Keyword::Use),
    ("var", Keyword::Var),
    ("while", Keyword::While),
];

impl Keyword {
    /// Look up an identifier, ignoring ASCII case.
    #[must_use]
    pub fn from_ident(ident: &str) -> Option<Self> {
        KEYWORDS
            .iter()
            .find(|(text, _)| text.eq_ignore_ascii_case(ident))
            .map(|(_, kw)| *kw)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        KEYWORDS
            .iter()
            .find(|(_, kw)| *kw == self)
            .map_or("", |(text, _)| text)
    }

    /// Keywords that may prefix a class member or promoted parameter.
    #[must_use]
    pub const fn is_modifier(self) -> bool {
        matches!(
            self,
            Self::Public
                | Self::Protected
                | Self::Private
                | Self::Static
                | Self::Abstract
                | Self::Final
                | Self::Readonly
                | Self::Var
        )
    }
}

/// Structural punctuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Punct {
    Semicolon,
    Comma,
    OpenParen,
    CloseParen,
    OpenBrace,
    CloseBrace,
    OpenBracket,
    CloseBracket,
}

impl Punct {
    #[must_use]
    pub const fn as_char(self) -> char {
        match self {
            Self::Semicolon => ';',
            Self::Comma => ',',
            Self::OpenParen => '(',
            Self::CloseParen => ')',
            Self::OpenBrace => '{',
            Self::CloseBrace => '}',
            Self::OpenBracket => '[',
            Self::CloseBracket => ']',
        }
    }

    #[must_use]
    pub const fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            b';' => Some(Self::Semicolon),
            b',' => Some(Self::Comma),
            b'(' => Some(Self::OpenParen),
            b')' => Some(Self::CloseParen),
            b'{' => Some(Self::OpenBrace),
            b'}' => Some(Self::CloseBrace),
            b'[' => Some(Self::OpenBracket),
            b']' => Some(Self::CloseBracket),
            _ => None,
        }
    }

    /// The closing counterpart of an opening delimiter.
    #[must_use]
    pub const fn closer(self) -> Option<Self> {
        match self {
            Self::OpenParen => Some(Self::CloseParen),
            Self::OpenBrace => Some(Self::CloseBrace),
            Self::OpenBracket => Some(Self::CloseBracket),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_closing(self) -> bool {
        matches!(
            self,
            Self::CloseParen | Self::CloseBrace | Self::CloseBracket
        )
    }
}

/// Operators, including assignment forms and namespace/member separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Pow,
    Dot,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    DotAssign,
    PercentAssign,
    PowAssign,
    AmpAssign,
    PipeAssign,
    CaretAssign,
    ShlAssign,
    ShrAssign,
    CoalesceAssign,
    Equal,
    NotEqual,
    Identical,
    NotIdentical,
    Less,
    Greater,
    LessEqual,
    GreaterEqual,
    Spaceship,
    AndAnd,
    OrOr,
    Not,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Shl,
    Shr,
    Coalesce,
    Question,
    Colon,
    DoubleColon,
    Arrow,
    NullsafeArrow,
    DoubleArrow,
    Increment,
    Decrement,
    At,
    Backslash,
    Dollar,
    Ellipsis,
}

/// Operator spellings, longest first so the lexer can apply maximal munch
/// by taking the first entry that matches.
pub(crate) const OPERATORS: &[(&str, Operator)] = &[
    ("**=", Operator::PowAssign),
    ("...", Operator::Ellipsis),
    ("<=>", Operator::Spaceship),
    ("===", Operator::Identical),
    ("!==", Operator::NotIdentical),
    ("<<=", Operator::ShlAssign),
    (">>=", Operator::ShrAssign),
    ("??=", Operator::CoalesceAssign),
    ("?->", Operator::NullsafeArrow),
    ("++", Operator::Increment),
    ("--", Operator::Decrement),
    ("->", Operator::Arrow),
    ("=>", Operator::DoubleArrow),
    ("::", Operator::DoubleColon),
    ("==", Operator::Equal),
    ("!=", Operator::NotEqual),
    ("<>", Operator::NotEqual),
    ("<=", Operator::LessEqual),
    (">=", Operator::GreaterEqual),
    ("&&", Operator::AndAnd),
    ("||", Operator::OrOr),
    ("??", Operator::Coalesce),
    ("+=", Operator::PlusAssign),
    ("-=", Operator::MinusAssign),
    ("*=", Operator::StarAssign),
    ("/=", Operator::SlashAssign),
    (".=", Operator::DotAssign),
    ("%=", Operator::PercentAssign),
    ("&=", Operator::AmpAssign),
    ("|=", Operator::PipeAssign),
    ("^=", Operator::CaretAssign),
    ("<<", Operator::Shl),
    (">>", Operator::Shr),
    ("**", Operator::Pow),
    ("+", Operator::Plus),
    ("-", Operator::Minus),
    ("*", Operator::Star),
    ("/", Operator::Slash),
    ("%", Operator::Percent),
    ("=", Operator::Assign),
    ("<", Operator::Less),
    (">", Operator::Greater),
    ("!", Operator::Not),
    (".", Operator::Dot),
    ("&", Operator::Amp),
    ("|", Operator::Pipe),
    ("^", Operator::Caret),
    ("~", Operator::Tilde),
    ("?", Operator::Question),
    (":", Operator::Colon),
    ("@", Operator::At),
    ("\\", Operator::Backslash),
    ("$", Operator::Dollar),
];

impl Operator {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            // `<>` shares the variant with `!=`; report the canonical form.
            Self::NotEqual => "!=",
            _ => OPERATORS
                .iter()
                .find(|(_, op)| *op == self)
                .map_or("", |(text, _)| text),
        }
    }

    /// Compound or plain assignment operators.
    #[must_use]
    pub const fn is_assignment(self) -> bool {
        matches!(
            self,
            Self::Assign
                | Self::PlusAssign
                | Self::MinusAssign
                | Self::StarAssign
                | Self::SlashAssign
                | Self::DotAssign
                | Self::PercentAssign
                | Self::PowAssign
                | Self::AmpAssign
                | Self::PipeAssign
                | Self::CaretAssign
                | Self::ShlAssign
                | Self::ShrAssign
                | Self::CoalesceAssign
        )
    }

    /// Operators whose spelling placed after `=` reads as a reversed
    /// compound assignment (`=+` for `+=`).
    #[must_use]
    pub const fn has_compound_form(self) -> bool {
        matches!(
            self,
            Self::Plus
                | Self::Minus
                | Self::Star
                | Self::Slash
                | Self::Dot
                | Self::Percent
                | Self::Pipe
                | Self::Caret
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QuoteStyle {
    /// `'...'`, no interpolation.
    Single,
    /// `"..."`, interpolating.
    Double,
    /// `` `...` ``, shell execution, interpolating.
    Backtick,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommentStyle {
    /// `// ...`
    Line,
    /// `# ...`
    Hash,
    /// `/* ... */`
    Block,
    /// `/** ... */`
    Doc,
}

/// Token kinds produced by the lexer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenKind {
    /// Run of spaces, tabs and line breaks.
    Whitespace,
    Comment(CommentStyle),
    /// Text outside `<?php ... ?>`.
    InlineHtml,
    /// `<?php` or `<?=`.
    OpenTag,
    /// `?>`.
    CloseTag,
    Identifier,
    Keyword(Keyword),
    /// `$name`.
    Variable,
    Integer,
    Float,
    /// Quoted string. `interpolations` holds the absolute byte offsets of
    /// `$name` and `{$` markers inside interpolating strings.
    String {
        quote: QuoteStyle,
        interpolations: Vec<usize>,
    },
    /// Heredoc or nowdoc, including the opening and closing labels.
    Heredoc {
        label: String,
        nowdoc: bool,
        interpolations: Vec<usize>,
    },
    Operator(Operator),
    Punct(Punct),
    Eof,
    /// Bytes the lexer could not turn into a valid token.
    Invalid(LexErrorKind),
}

impl TokenKind {
    /// Whitespace and comments: kept for losslessness, ignored by the grammar.
    #[must_use]
    pub const fn is_trivia(&self) -> bool {
        matches!(self, Self::Whitespace | Self::Comment(_))
    }

    /// Short human description used in diagnostics.
    #[must_use]
    pub fn describe(&self) -> String {
        match self {
            Self::Whitespace => "whitespace".to_string(),
            Self::Comment(_) => "comment".to_string(),
            Self::InlineHtml => "inline HTML".to_string(),
            Self::OpenTag => "'<?php'".to_string(),
            Self::CloseTag => "'?>'".to_string(),
            Self::Identifier => "identifier".to_string(),
            Self::Keyword(kw) => format!("'{}'", kw.as_str()),
            Self::Variable => "variable".to_string(),
            Self::Integer => "integer".to_string(),
            Self::Float => "float".to_string(),
            Self::String { .. } => "string".to_string(),
            Self::Heredoc { nowdoc: false, .. } => "heredoc".to_string(),
            Self::Heredoc { nowdoc: true, .. } => "nowdoc".to_string(),
            Self::Operator(op) => format!("'{}'", op.as_str()),
            Self::Punct(p) => format!("'{}'", p.as_char()),
            Self::Eof => "end of input".to_string(),
            Self::Invalid(_) => "invalid token".to_string(),
        }
    }
}

/// A single token with its kind, text, location and leading trivia.
///
/// Trivia tokens (whitespace, comments) are produced by the lexer as
/// ordinary tokens; the parser's token stream then moves them into the
/// `leading_trivia` of the next significant token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub text: String,
    pub span: Span,
    pub start: Position,
    pub end: Position,
    pub leading_trivia: Vec<Self>,
}

impl Token {
    #[must_use]
    pub fn is_punct(&self, punct: Punct) -> bool {
        self.kind == TokenKind::Punct(punct)
    }

    #[must_use]
    pub fn is_operator(&self, op: Operator) -> bool {
        self.kind == TokenKind::Operator(op)
    }

    #[must_use]
    pub fn is_keyword(&self, kw: Keyword) -> bool {
        self.kind == TokenKind::Keyword(kw)
    }

    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// Identifiers and keywords, both usable as names after `->`, `::`
    /// and in declaration name positions.
    #[must_use]
    pub const fn is_name_like(&self) -> bool {
        matches!(self.kind, TokenKind::Identifier | TokenKind::Keyword(_))
    }

    /// Span including leading trivia.
    #[must_use]
    pub fn full_span(&self) -> Span {
        self.leading_trivia
            .first()
            .map_or(self.span, |first| first.span.merge(self.span))
    }

    /// True when any leading trivia contains a line break.
    #[must_use]
    pub fn has_leading_newline(&self) -> bool {
        self.leading_trivia
            .iter()
            .any(|t| t.kind == TokenKind::Whitespace && t.text.contains('\n'))
    }
}
