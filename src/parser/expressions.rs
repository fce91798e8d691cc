use crate::ast::{LiteralKind, NodeKind, UnaryOp};
use crate::token::{Keyword, Operator, Punct, TokenKind};
use crate::tree::Checkpoint;

use super::{ParseErrorKind, Parser};

/// Right binding power of prefix operators and casts.
const PREFIX_BP: u8 = 32;
const INSTANCEOF_BP: (u8, u8) = (34, 35);

const CAST_TYPES: &[&str] = &[
    "int", "integer", "float", "double", "string", "bool", "boolean", "array", "object",
    "binary", "unset",
];

/// Left and right binding power of a binary operator. Right-associative
/// operators have the lower power on the right.
const fn infix_binding_power(op: Operator) -> Option<(u8, u8)> {
    let bp = match op {
        _ if op.is_assignment() => (5, 4),
        Operator::Question => (7, 6),
        Operator::Coalesce => (9, 8),
        Operator::OrOr => (10, 11),
        Operator::AndAnd => (12, 13),
        Operator::Pipe => (14, 15),
        Operator::Caret => (16, 17),
        Operator::Amp => (18, 19),
        Operator::Equal
        | Operator::NotEqual
        | Operator::Identical
        | Operator::NotIdentical
        | Operator::Spaceship => (20, 21),
        Operator::Less | Operator::Greater | Operator::LessEqual | Operator::GreaterEqual => {
            (22, 23)
        }
        Operator::Dot => (24, 25),
        Operator::Shl | Operator::Shr => (26, 27),
        Operator::Plus | Operator::Minus => (28, 29),
        Operator::Star | Operator::Slash | Operator::Percent => (30, 31),
        Operator::Pow => (37, 36),
        _ => return None,
    };
    Some(bp)
}

const fn prefix_op(op: Operator) -> Option<UnaryOp> {
    let unary = match op {
        Operator::Not => UnaryOp::Not,
        Operator::Minus => UnaryOp::Negate,
        Operator::Plus => UnaryOp::Plus,
        Operator::Tilde => UnaryOp::BitNot,
        Operator::Increment => UnaryOp::PreIncrement,
        Operator::Decrement => UnaryOp::PreDecrement,
        Operator::At => UnaryOp::Silence,
        Operator::Amp => UnaryOp::Reference,
        Operator::Ellipsis => UnaryOp::Spread,
        _ => return None,
    };
    Some(unary)
}

/// Operators that end an expression rather than appear inside one.
const fn is_anchor_op(op: Operator) -> bool {
    matches!(op, Operator::Colon | Operator::DoubleArrow)
}

impl Parser<'_> {
    pub(super) fn parse_expression(&mut self) {
        self.parse_expr_bp(0);
    }

    fn parse_expr_bp(&mut self, min_bp: u8) {
        if !self.enter() {
            return;
        }
        let checkpoint = self.builder.checkpoint();
        self.parse_prefix();
        loop {
            if self.parse_postfix(checkpoint) {
                continue;
            }
            match self.current_kind() {
                TokenKind::Keyword(Keyword::Instanceof) => {
                    if INSTANCEOF_BP.0 < min_bp {
                        break;
                    }
                    self.parse_instanceof(checkpoint);
                }
                TokenKind::Operator(op) => {
                    let Some((l_bp, r_bp)) = infix_binding_power(op) else {
                        break;
                    };
                    if l_bp < min_bp {
                        break;
                    }
                    if let Some(reversed) = self.at_reversed_compound() {
                        self.parse_reversed_compound(checkpoint, reversed, r_bp);
                    } else if op == Operator::Question {
                        self.parse_ternary(checkpoint, r_bp);
                    } else {
                        let kind = if op.is_assignment() {
                            NodeKind::Assignment { op }
                        } else {
                            NodeKind::Binary { op }
                        };
                        self.builder.start_node_at(checkpoint);
                        self.bump();
                        self.parse_operand(op, r_bp);
                        self.builder.finish_node(kind);
                    }
                }
                _ => break,
            }
        }
        self.leave();
    }

    /// Right operand of a binary operator. An operator that cannot start
    /// an expression is reported as unexpected after `after`, and the
    /// operand that follows it is kept inside the error node.
    fn parse_operand(&mut self, after: Operator, r_bp: u8) {
        let TokenKind::Operator(found) = self.current_kind() else {
            self.parse_expr_bp(r_bp);
            return;
        };
        if prefix_op(found).is_some()
            || is_anchor_op(found)
            || matches!(found, Operator::Backslash | Operator::Dollar)
        {
            self.parse_expr_bp(r_bp);
            return;
        }
        let span = self.current_span();
        self.builder.start_node();
        self.bump();
        self.parse_expr_bp(r_bp);
        let kind = ParseErrorKind::UnexpectedOperator {
            after: after.as_str(),
            found: found.as_str(),
        };
        let (code, diagnostic) = self.report(&kind, span);
        self.builder
            .finish_node(NodeKind::Error { code, diagnostic });
    }

    /// `=` directly followed by `+`, `-`, `*`, ... and then a space, as in
    /// `$x =+ 10`: almost always a swapped compound assignment.
    fn at_reversed_compound(&mut self) -> Option<Operator> {
        if !self.at_op(Operator::Assign) {
            return None;
        }
        let next = self.nth(1);
        let TokenKind::Operator(op) = next.kind else {
            return None;
        };
        if !op.has_compound_form() || !next.leading_trivia.is_empty() {
            return None;
        }
        let spaced = !self.nth(2).leading_trivia.is_empty();
        spaced.then_some(op)
    }

    fn parse_reversed_compound(&mut self, checkpoint: Checkpoint, op: Operator, r_bp: u8) {
        self.builder.start_node_at(checkpoint);
        self.bump();
        let span = self.current_span();
        self.builder.start_node();
        self.bump();
        self.parse_expr_bp(r_bp);
        let kind = ParseErrorKind::UnexpectedOperator {
            after: "=",
            found: op.as_str(),
        };
        let (code, diagnostic) = self.report(&kind, span);
        self.builder
            .finish_node(NodeKind::Error { code, diagnostic });
        self.builder.finish_node(NodeKind::Assignment {
            op: Operator::Assign,
        });
    }

    /// `cond ? a : b` and `cond ?: b`.
    fn parse_ternary(&mut self, checkpoint: Checkpoint, r_bp: u8) {
        self.builder.start_node_at(checkpoint);
        self.bump();
        if !self.eat_op(Operator::Colon) {
            self.parse_expr_bp(0);
            self.expect_op(Operator::Colon, "':'");
        }
        self.parse_expr_bp(r_bp);
        self.builder.finish_node(NodeKind::Ternary);
    }

    fn parse_instanceof(&mut self, checkpoint: Checkpoint) {
        self.builder.start_node_at(checkpoint);
        self.bump();
        if self.at_name() || self.at_op(Operator::Backslash) {
            self.parse_name();
        } else {
            self.parse_expr_bp(INSTANCEOF_BP.1);
        }
        self.builder.finish_node(NodeKind::Instanceof);
    }

    fn parse_prefix(&mut self) {
        match self.current_kind() {
            TokenKind::Operator(op) => match prefix_op(op) {
                Some(unary) => self.parse_unary(unary, PREFIX_BP),
                None => match op {
                    Operator::Backslash => self.parse_name(),
                    Operator::Dollar => self.parse_variable_variable(),
                    _ => self.parse_primary(),
                },
            },
            TokenKind::Punct(Punct::OpenParen) => match self.cast_type() {
                Some(ty) => {
                    self.builder.start_node();
                    self.bump();
                    self.bump();
                    self.bump();
                    self.parse_expr_bp(PREFIX_BP);
                    self.builder.finish_node(NodeKind::Cast { ty });
                }
                None => self.parse_parenthesized(),
            },
            TokenKind::Keyword(Keyword::Print) => self.parse_unary(UnaryOp::Print, 0),
            TokenKind::Keyword(Keyword::Clone) => self.parse_unary(UnaryOp::Clone, PREFIX_BP),
            TokenKind::Keyword(Keyword::Include | Keyword::IncludeOnce) => {
                self.parse_unary(UnaryOp::Include, 0);
            }
            TokenKind::Keyword(Keyword::Require | Keyword::RequireOnce) => {
                self.parse_unary(UnaryOp::Require, 0);
            }
            TokenKind::Keyword(Keyword::Throw) => {
                self.builder.start_node();
                self.bump();
                self.parse_expression();
                self.builder.finish_node(NodeKind::Throw);
            }
            _ => self.parse_primary(),
        }
    }

    fn parse_unary(&mut self, op: UnaryOp, r_bp: u8) {
        self.builder.start_node();
        self.bump();
        self.parse_expr_bp(r_bp);
        self.builder.finish_node(NodeKind::Unary { op });
    }

    /// `(int)` and friends, returning the lowercased type.
    fn cast_type(&mut self) -> Option<String> {
        if !self.at_punct(Punct::OpenParen) || !self.nth(2).is_punct(Punct::CloseParen) {
            return None;
        }
        let inner = self.nth(1);
        if inner.kind != TokenKind::Identifier {
            return None;
        }
        let ty = inner.text.to_ascii_lowercase();
        CAST_TYPES.contains(&ty.as_str()).then_some(ty)
    }

    fn parse_primary(&mut self) {
        match self.current_kind() {
            TokenKind::Variable => self.parse_variable(),
            TokenKind::Integer => self.parse_literal(LiteralKind::Int),
            TokenKind::Float => self.parse_literal(LiteralKind::Float),
            TokenKind::String { interpolations, .. } => self.parse_literal(LiteralKind::String {
                interpolated: !interpolations.is_empty(),
            }),
            TokenKind::Heredoc { nowdoc, .. } => {
                self.parse_literal(LiteralKind::Heredoc { nowdoc });
            }
            TokenKind::Identifier => self.parse_identifier(),
            TokenKind::Invalid(_) => self.bump(),
            TokenKind::Punct(Punct::OpenBracket) => self.parse_array(),
            TokenKind::Keyword(Keyword::New) => self.parse_new(),
            TokenKind::Keyword(Keyword::Match) => self.parse_match(),
            TokenKind::Keyword(Keyword::Fn) => self.parse_arrow_function(),
            TokenKind::Keyword(Keyword::Function) => self.parse_closure(),
            TokenKind::Keyword(Keyword::Static) => {
                if self.nth(1).is_keyword(Keyword::Fn) {
                    self.parse_arrow_function();
                } else if self.nth(1).is_keyword(Keyword::Function) {
                    self.parse_closure();
                } else {
                    self.parse_name();
                }
            }
            TokenKind::Operator(op) if !is_anchor_op(op) => {
                // An operator that cannot start an expression: keep it and
                // the operand after it in one error node.
                let span = self.current_span();
                let kind = ParseErrorKind::ExpectedToken {
                    expected: "expression",
                    found: self.found(),
                };
                self.builder.start_node();
                self.bump();
                if self.at_expression_start() {
                    self.parse_expr_bp(PREFIX_BP);
                }
                let (code, diagnostic) = self.report(&kind, span);
                self.builder
                    .finish_node(NodeKind::Error { code, diagnostic });
            }
            _ => {
                let kind = self.expected("expression");
                self.error_missing(&kind, "expression");
            }
        }
    }

    fn parse_literal(&mut self, kind: LiteralKind) {
        self.builder.start_node();
        self.bump();
        self.builder.finish_node(NodeKind::Literal(kind));
    }

    fn parse_variable(&mut self) {
        let name = self
            .current()
            .text
            .strip_prefix('$')
            .unwrap_or_default()
            .to_string();
        self.builder.start_node();
        self.bump();
        self.builder.finish_node(NodeKind::Variable { name });
    }

    /// `$$name` and `${expr}`.
    fn parse_variable_variable(&mut self) {
        self.builder.start_node();
        self.bump();
        if self.at_punct(Punct::OpenBrace) {
            let open_span = self.current_span();
            self.bump();
            self.delimiters.push(Punct::OpenBrace);
            self.parse_expression();
            self.delimiters.pop();
            self.expect_closer(Punct::OpenBrace, open_span);
        } else if self.at_variable() || self.at_op(Operator::Dollar) {
            self.parse_prefix();
        } else {
            let kind = self.expected("variable name");
            self.error_missing(&kind, "$name");
        }
        self.builder.finish_node(NodeKind::Variable {
            name: String::new(),
        });
    }

    /// Constants, function names, `true`/`false`/`null` and `array(...)`.
    fn parse_identifier(&mut self) {
        let text = self.current().text.to_ascii_lowercase();
        let followed_by_paren = self.nth(1).is_punct(Punct::OpenParen);
        match text.as_str() {
            "true" | "false" if !followed_by_paren => self.parse_literal(LiteralKind::Bool),
            "null" if !followed_by_paren => self.parse_literal(LiteralKind::Null),
            "array" | "list" if followed_by_paren => self.parse_array(),
            _ => self.parse_name(),
        }
    }

    fn parse_name(&mut self) {
        self.builder.start_node();
        let name = self.bump_qualified_name();
        self.builder.finish_node(NodeKind::Name { name });
    }

    fn parse_postfix(&mut self, checkpoint: Checkpoint) -> bool {
        match self.current_kind() {
            TokenKind::Punct(Punct::OpenParen) => {
                self.builder.start_node_at(checkpoint);
                self.parse_argument_list();
                self.builder.finish_node(NodeKind::Call);
            }
            TokenKind::Punct(Punct::OpenBracket) => {
                self.builder.start_node_at(checkpoint);
                let open_span = self.current_span();
                self.bump();
                self.delimiters.push(Punct::OpenBracket);
                if !self.at_punct(Punct::CloseBracket) {
                    self.parse_expression();
                }
                self.delimiters.pop();
                self.expect_closer(Punct::OpenBracket, open_span);
                self.builder.finish_node(NodeKind::Index);
            }
            TokenKind::Operator(op @ (Operator::Arrow | Operator::NullsafeArrow)) => {
                self.builder.start_node_at(checkpoint);
                self.bump();
                let name = self.parse_member_name("property name");
                self.builder.finish_node(NodeKind::MemberAccess {
                    name,
                    nullsafe: op == Operator::NullsafeArrow,
                });
            }
            TokenKind::Operator(Operator::DoubleColon) => {
                self.builder.start_node_at(checkpoint);
                self.bump();
                let member = self.parse_member_name("member name");
                self.builder
                    .finish_node(NodeKind::StaticAccess { member });
            }
            TokenKind::Operator(op @ (Operator::Increment | Operator::Decrement)) => {
                self.builder.start_node_at(checkpoint);
                self.bump();
                let op = if op == Operator::Increment {
                    UnaryOp::PostIncrement
                } else {
                    UnaryOp::PostDecrement
                };
                self.builder.finish_node(NodeKind::Unary { op });
            }
            _ => return false,
        }
        true
    }

    /// Name after `->` or `::`. Dynamic members (`$obj->$prop`,
    /// `$obj->{expr}`) have no static name.
    fn parse_member_name(&mut self, expected: &'static str) -> Option<String> {
        if self.at_name() || self.at_variable() {
            let text = self.current().text.clone();
            self.bump();
            return Some(text);
        }
        if self.at_punct(Punct::OpenBrace) {
            let open_span = self.current_span();
            self.bump();
            self.delimiters.push(Punct::OpenBrace);
            self.parse_expression();
            self.delimiters.pop();
            self.expect_closer(Punct::OpenBrace, open_span);
            return None;
        }
        let kind = self.expected(expected);
        self.error_missing(&kind, "name");
        None
    }

    /// `( arguments )` of a call, `new`, attribute or closure `use`.
    pub(super) fn parse_argument_list(&mut self) {
        let checkpoint = self.builder.checkpoint();
        self.builder.start_node();
        let open_span = self.current_span();
        self.bump();
        self.delimiters.push(Punct::OpenParen);
        loop {
            if self.at_argument_list_end() {
                break;
            }
            // First-class callable syntax: `strlen(...)`.
            if self.at_op(Operator::Ellipsis) && self.nth(1).is_punct(Punct::CloseParen) {
                self.bump();
                break;
            }
            self.parse_argument();
            if self.eat_punct(Punct::Comma) {
                continue;
            }
            if self.at_argument_list_end() {
                break;
            }
            let kind = ParseErrorKind::ExpectedToken {
                expected: "',' or ')'",
                found: self.found(),
            };
            self.skip_to_list_anchor(kind, false);
            self.eat_punct(Punct::Comma);
        }
        self.delimiters.pop();
        self.finish_delimited(
            Punct::OpenParen,
            open_span,
            checkpoint,
            NodeKind::ArgumentList,
        );
    }

    fn at_argument_list_end(&mut self) -> bool {
        self.at_eof()
            || self.at_punct(Punct::CloseParen)
            || self.at_punct(Punct::Semicolon)
            || self.at_enclosing_closer()
    }

    fn parse_argument(&mut self) {
        self.builder.start_node();
        let mut name = None;
        if self.at_name() && self.nth(1).is_operator(Operator::Colon) {
            name = self.bump_name();
            self.bump();
        }
        self.parse_expression();
        self.builder.finish_node(NodeKind::Argument { name });
    }

    /// `[ ... ]`, `array( ... )` or `list( ... )`.
    fn parse_array(&mut self) {
        let checkpoint = self.builder.checkpoint();
        self.builder.start_node();
        if self.current().kind == TokenKind::Identifier {
            self.bump();
        }
        let open = if self.at_punct(Punct::OpenBracket) {
            Punct::OpenBracket
        } else {
            Punct::OpenParen
        };
        let close = open.closer().unwrap_or(open);
        let open_span = self.current_span();
        self.bump();
        self.delimiters.push(open);
        loop {
            if self.at_eof()
                || self.at_punct(close)
                || self.at_punct(Punct::Semicolon)
                || self.at_enclosing_closer()
            {
                break;
            }
            let before = self.consumed;
            // Skipped slot in a destructuring list: `[, $b]`.
            if self.eat_punct(Punct::Comma) {
                continue;
            }
            self.parse_array_element();
            if self.eat_punct(Punct::Comma) || self.at_punct(close) {
                continue;
            }
            if self.at_expression_start() {
                let kind = self.expected("','");
                self.error_missing(&kind, ",");
            } else if !self.at_eof() && !self.at_enclosing_closer() && !self.at_punct(Punct::Semicolon) {
                let kind = ParseErrorKind::ExpectedToken {
                    expected: "',' or closing bracket",
                    found: self.found(),
                };
                self.skip_to_list_anchor(kind, false);
            }
            if self.consumed == before {
                break;
            }
        }
        self.delimiters.pop();
        self.finish_delimited(open, open_span, checkpoint, NodeKind::Array);
    }

    fn parse_array_element(&mut self) {
        self.builder.start_node();
        self.parse_expression();
        if self.eat_op(Operator::DoubleArrow) {
            self.parse_expression();
        }
        self.builder.finish_node(NodeKind::ArrayElement);
    }

    /// `( expr )`, also the condition of `if`, `while` and `match`.
    pub(super) fn parse_parenthesized(&mut self) {
        let checkpoint = self.builder.checkpoint();
        self.builder.start_node();
        let open_span = self.current_span();
        self.bump();
        self.delimiters.push(Punct::OpenParen);
        if self.at_expression_start() {
            self.parse_expression();
        } else {
            let kind = self.expected("expression");
            self.error_missing(&kind, "expression");
        }
        if !self.at_punct(Punct::CloseParen)
            && !self.at_punct(Punct::OpenBrace)
            && !self.at_punct(Punct::Semicolon)
            && !self.at_eof()
            && !self.at_enclosing_closer()
        {
            let kind = ParseErrorKind::ExpectedToken {
                expected: "')'",
                found: self.found(),
            };
            self.skip_to_list_anchor(kind, true);
        }
        self.delimiters.pop();
        self.finish_delimited(
            Punct::OpenParen,
            open_span,
            checkpoint,
            NodeKind::Parenthesized,
        );
    }

    /// `match (subject) { cond, cond => expr, default => expr }`.
    fn parse_match(&mut self) {
        let checkpoint = self.builder.checkpoint();
        self.builder.start_node();
        self.bump();
        self.parse_condition();
        if !self.at_punct(Punct::OpenBrace) {
            let kind = self.expected("'{'");
            self.error_missing(&kind, "{");
            self.builder.finish_node(NodeKind::Match);
            return;
        }
        let open_span = self.current_span();
        self.bump();
        self.delimiters.push(Punct::OpenBrace);
        loop {
            if self.at_match_end() {
                break;
            }
            self.parse_match_arm();
            if self.eat_punct(Punct::Comma) {
                continue;
            }
            if self.at_match_end() || self.at_punct(Punct::Semicolon) {
                break;
            }
            if self.at_expression_start() || self.at_kw(Keyword::Default) {
                self.error_missing(
                    &ParseErrorKind::MalformedMatchArm {
                        detail: "missing ',' between match arms",
                    },
                    ",",
                );
                continue;
            }
            self.skip_to_list_anchor(
                ParseErrorKind::MalformedMatchArm {
                    detail: "unexpected tokens after match arm",
                },
                false,
            );
            if !self.eat_punct(Punct::Comma) {
                break;
            }
        }
        self.delimiters.pop();
        self.finish_delimited(Punct::OpenBrace, open_span, checkpoint, NodeKind::Match);
    }

    fn at_match_end(&mut self) -> bool {
        self.at_eof() || self.at_punct(Punct::CloseBrace) || self.at_enclosing_closer()
    }

    fn parse_match_arm(&mut self) {
        self.builder.start_node();
        let is_default = self.eat_kw(Keyword::Default);
        if !is_default {
            loop {
                self.parse_expression();
                if !self.eat_punct(Punct::Comma) || self.at_op(Operator::DoubleArrow) {
                    break;
                }
            }
        }
        if self.eat_op(Operator::DoubleArrow) {
            self.parse_expression();
        } else {
            self.error_missing(
                &ParseErrorKind::MalformedMatchArm {
                    detail: "expected '=>' after match condition",
                },
                "=>",
            );
            if self.at_expression_start() {
                self.parse_expression();
            }
        }
        self.builder.finish_node(NodeKind::MatchArm { is_default });
    }

    /// `new Foo(...)`, `new $class`, `new (expr)` or `new class { ... }`.
    fn parse_new(&mut self) {
        self.builder.start_node();
        self.bump();
        if self.eat_kw(Keyword::Class) {
            self.parse_anonymous_class_rest();
            self.builder.finish_node(NodeKind::New);
            return;
        }
        if self.at_name() || self.at_op(Operator::Backslash) {
            self.parse_name();
        } else if self.at_variable() {
            let checkpoint = self.builder.checkpoint();
            self.parse_variable();
            while self.at_op(Operator::Arrow) || self.at_op(Operator::DoubleColon) {
                self.parse_postfix(checkpoint);
            }
        } else if self.at_punct(Punct::OpenParen) {
            self.parse_parenthesized();
        } else {
            let kind = self.expected("class name");
            self.error_missing(&kind, "name");
        }
        if self.at_punct(Punct::OpenParen) {
            self.parse_argument_list();
        }
        self.builder.finish_node(NodeKind::New);
    }

    /// `[static] fn (params): type => expr`.
    fn parse_arrow_function(&mut self) {
        self.builder.start_node();
        self.eat_kw(Keyword::Static);
        self.bump();
        self.eat_op(Operator::Amp);
        self.parse_parameter_list();
        if self.eat_op(Operator::Colon) {
            self.parse_type();
        }
        if self.expect_op(Operator::DoubleArrow, "'=>'") || self.at_expression_start() {
            self.parse_expression();
        }
        self.builder.finish_node(NodeKind::ArrowFunction);
    }

    /// `[static] function (params) use (vars): type { body }`.
    fn parse_closure(&mut self) {
        self.builder.start_node();
        self.eat_kw(Keyword::Static);
        self.bump();
        self.eat_op(Operator::Amp);
        self.parse_parameter_list();
        if self.eat_kw(Keyword::Use) {
            if self.at_punct(Punct::OpenParen) {
                self.parse_argument_list();
            } else {
                let kind = self.expected("'('");
                self.error_missing(&kind, "(");
            }
        }
        if self.eat_op(Operator::Colon) {
            self.parse_type();
        }
        if self.at_punct(Punct::OpenBrace) {
            self.parse_block(false);
        } else {
            let kind = self.expected("'{'");
            self.error_missing(&kind, "{");
        }
        self.builder.finish_node(NodeKind::Closure);
    }
}
