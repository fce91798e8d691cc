//! Pretty-printer that serializes a syntax tree back into canonical text.
//!
//! Works token by token: spacing is decided from each token and the node
//! that owns it, statements and block braces break lines, and blocks are
//! indented by four spaces. Comments are kept, as is a single blank line
//! wherever the input had one or more.
//!
//! Output is only meaningful for trees without diagnostics. For those,
//! re-parsing the output yields the same tree shape.

use crate::ast::{Declaration, NodeKind, TypeShape, UnaryOp};
use crate::token::{CommentStyle, Keyword, Operator, Punct, Token, TokenKind};
use crate::tree::{SyntaxTree, TokenId};

const INDENT: &str = "    ";

/// Separator written before the next item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gap {
    None,
    Space,
    Newline,
}

/// Format a syntax tree into canonical PHP source.
#[must_use]
pub fn format(tree: &SyntaxTree) -> String {
    let mut printer = Printer {
        tree,
        out: String::new(),
        indent: 0,
        gap: Gap::None,
        prev: None,
    };
    for id in tree.token_ids() {
        printer.token(id);
    }
    printer.out
}

struct Printer<'t> {
    tree: &'t SyntaxTree,
    out: String,
    indent: usize,
    gap: Gap,
    prev: Option<TokenId>,
}

impl Printer<'_> {
    fn token(&mut self, id: TokenId) {
        let tree = self.tree;
        let token = tree.token(id);
        let parent = tree.kind(tree.token_parent(id));
        let (newlines, after_comment) = self.comments(token);

        if is_block_brace(token, parent, Punct::CloseBrace) {
            self.indent = self.indent.saturating_sub(1);
            self.gap = Gap::Newline;
        }

        if token.is_eof() {
            let ends_in_html = self
                .prev
                .is_some_and(|prev| matches!(tree.token(prev).kind, TokenKind::InlineHtml | TokenKind::CloseTag));
            if !self.out.is_empty() && !self.out.ends_with('\n') && (!ends_in_html || after_comment.is_some()) {
                self.out.push('\n');
            }
            return;
        }

        let gap = match after_comment {
            Some(CommentStyle::Line | CommentStyle::Hash | CommentStyle::Doc) => Gap::Newline,
            Some(CommentStyle::Block) if newlines > 0 => Gap::Newline,
            _ => self.gap_before(id),
        };
        self.write_gap(gap, newlines);
        self.out.push_str(&token.text);
        self.gap = self.gap_after(token, parent);
        self.prev = Some(id);
    }

    /// Print the comments in a token's leading trivia. Returns the line
    /// breaks after the last comment and the style of that comment.
    fn comments(&mut self, token: &Token) -> (usize, Option<CommentStyle>) {
        let mut newlines = 0;
        let mut last = None;
        for trivia in &token.leading_trivia {
            match trivia.kind {
                TokenKind::Whitespace => newlines += trivia.text.matches('\n').count(),
                TokenKind::Comment(style) => {
                    let forced = matches!(
                        last,
                        Some(CommentStyle::Line | CommentStyle::Hash | CommentStyle::Doc)
                    );
                    let gap = if newlines == 0 && !forced {
                        Gap::Space
                    } else {
                        Gap::Newline
                    };
                    self.write_gap(gap, newlines);
                    match style {
                        CommentStyle::Line | CommentStyle::Hash => {
                            self.out.push_str(trivia.text.trim_end());
                        }
                        CommentStyle::Block | CommentStyle::Doc => self.out.push_str(&trivia.text),
                    }
                    newlines = 0;
                    last = Some(style);
                }
                _ => {}
            }
        }
        (newlines, last)
    }

    fn write_gap(&mut self, gap: Gap, newlines: usize) {
        if self.out.is_empty() {
            return;
        }
        match gap {
            Gap::None => {}
            Gap::Space => {
                if !self.out.ends_with('\n') {
                    self.out.push(' ');
                }
            }
            Gap::Newline => {
                if !self.out.ends_with('\n') {
                    self.out.push('\n');
                }
                if newlines >= 2 {
                    self.out.push('\n');
                }
                for _ in 0..self.indent {
                    self.out.push_str(INDENT);
                }
            }
        }
    }

    fn gap_before(&self, id: TokenId) -> Gap {
        let Some(prev_id) = self.prev else {
            return Gap::None;
        };
        let tree = self.tree;
        let token = tree.token(id);
        let prev = tree.token(prev_id);
        if matches!(token.kind, TokenKind::InlineHtml)
            || matches!(prev.kind, TokenKind::InlineHtml | TokenKind::CloseTag)
        {
            return Gap::None;
        }
        let parent = tree.kind(tree.token_parent(id));
        let prev_parent = tree.kind(tree.token_parent(prev_id));

        if self.gap == Gap::Newline {
            // `} else`, `});`, `},`
            if is_block_brace(prev, prev_parent, Punct::CloseBrace) {
                match token.kind {
                    TokenKind::Keyword(Keyword::Else | Keyword::ElseIf) => return Gap::Space,
                    TokenKind::Punct(
                        Punct::Semicolon | Punct::Comma | Punct::CloseParen | Punct::CloseBracket,
                    )
                    | TokenKind::Operator(Operator::Arrow | Operator::NullsafeArrow) => {
                        return Gap::None;
                    }
                    _ => {}
                }
            }
            return Gap::Newline;
        }
        if self.gap == Gap::None || glued(prev, prev_parent, token, parent) {
            Gap::None
        } else {
            Gap::Space
        }
    }

    fn gap_after(&mut self, token: &Token, parent: &NodeKind) -> Gap {
        match token.kind {
            TokenKind::OpenTag if token.text == "<?=" => Gap::Space,
            TokenKind::OpenTag => Gap::Newline,
            TokenKind::CloseTag | TokenKind::InlineHtml => Gap::None,
            TokenKind::Punct(Punct::Semicolon) if !matches!(parent, NodeKind::For) => Gap::Newline,
            TokenKind::Punct(Punct::Comma) if matches!(parent, NodeKind::Match) => Gap::Newline,
            TokenKind::Punct(Punct::OpenBrace) if is_block_parent(parent) => {
                self.indent += 1;
                Gap::Newline
            }
            TokenKind::Punct(Punct::CloseBrace) if is_block_parent(parent) => Gap::Newline,
            _ => Gap::Space,
        }
    }
}

const fn is_block_parent(parent: &NodeKind) -> bool {
    matches!(
        parent,
        NodeKind::Block | NodeKind::MemberList | NodeKind::Match
    )
}

fn is_block_brace(token: &Token, parent: &NodeKind, brace: Punct) -> bool {
    token.is_punct(brace) && is_block_parent(parent)
}

/// Prefix operators written against their operand.
const fn binds_to_operand(op: UnaryOp) -> bool {
    matches!(
        op,
        UnaryOp::Not
            | UnaryOp::Negate
            | UnaryOp::Plus
            | UnaryOp::BitNot
            | UnaryOp::PreIncrement
            | UnaryOp::PreDecrement
            | UnaryOp::Silence
            | UnaryOp::Reference
            | UnaryOp::Spread
    )
}

/// True when no space goes between `prev` and `token`. Gluing never
/// joins two tokens into one: operators are only glued to operands.
fn glued(prev: &Token, prev_parent: &NodeKind, token: &Token, parent: &NodeKind) -> bool {
    match token.kind {
        TokenKind::Punct(
            Punct::Comma | Punct::Semicolon | Punct::CloseParen | Punct::CloseBracket,
        )
        | TokenKind::Operator(Operator::Arrow | Operator::NullsafeArrow | Operator::DoubleColon) => {
            return true;
        }
        _ => {}
    }
    match prev.kind {
        TokenKind::Punct(Punct::OpenParen | Punct::OpenBracket)
        | TokenKind::Operator(
            Operator::Arrow
            | Operator::NullsafeArrow
            | Operator::DoubleColon
            | Operator::Dollar
            | Operator::Backslash,
        ) => return true,
        _ => {}
    }
    // `${expr}` and `->{expr}`
    if (prev.is_punct(Punct::OpenBrace) && !is_block_parent(prev_parent))
        || (token.is_punct(Punct::CloseBrace) && !is_block_parent(parent))
    {
        return true;
    }
    match (prev_parent, &prev.kind) {
        (NodeKind::Type(TypeShape::Nullable), TokenKind::Operator(Operator::Question))
        | (
            NodeKind::Type(TypeShape::Union | TypeShape::Intersection),
            TokenKind::Operator(Operator::Pipe | Operator::Amp),
        ) => return true,
        (NodeKind::Unary { op }, TokenKind::Operator(_)) if binds_to_operand(*op) => {
            return !matches!(token.kind, TokenKind::Operator(_));
        }
        (
            NodeKind::Parameter(_)
            | NodeKind::Declaration(_)
            | NodeKind::Closure
            | NodeKind::ArrowFunction,
            TokenKind::Operator(Operator::Amp | Operator::Ellipsis),
        ) => return true,
        _ => {}
    }
    match (parent, &token.kind) {
        (
            NodeKind::Type(TypeShape::Union | TypeShape::Intersection),
            TokenKind::Operator(Operator::Pipe | Operator::Amp),
        )
        | (
            NodeKind::Unary {
                op: UnaryOp::PostIncrement | UnaryOp::PostDecrement,
            },
            _,
        ) => return true,
        // Return types, enum backing types and named arguments.
        (NodeKind::Ternary, TokenKind::Operator(Operator::Colon)) => return false,
        (_, TokenKind::Operator(Operator::Colon)) => return true,
        _ => {}
    }
    match token.kind {
        TokenKind::Operator(Operator::Backslash) => {
            prev.is_name_like() && token.leading_trivia.is_empty()
        }
        TokenKind::Punct(Punct::OpenParen) => is_callee_end(prev, prev_parent),
        TokenKind::Punct(Punct::OpenBracket) => {
            is_callee_end(prev, prev_parent) || matches!(prev.kind, TokenKind::String { .. })
        }
        _ => false,
    }
}

/// Last token of something that can be called or indexed.
fn is_callee_end(prev: &Token, prev_parent: &NodeKind) -> bool {
    match prev.kind {
        TokenKind::Identifier
        | TokenKind::Variable
        | TokenKind::Punct(Punct::CloseParen | Punct::CloseBracket) => true,
        TokenKind::Punct(Punct::CloseBrace) => !is_block_parent(prev_parent),
        // Keywords used as member or function names.
        TokenKind::Keyword(_) => matches!(
            prev_parent,
            NodeKind::MemberAccess { .. }
                | NodeKind::StaticAccess { .. }
                | NodeKind::Name { .. }
                | NodeKind::Declaration(Declaration::Method { .. } | Declaration::Function { .. })
        ),
        _ => false,
    }
}
