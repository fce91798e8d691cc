use crate::ast::{JumpKind, NodeKind};
use crate::token::{Keyword, Operator, Punct, Span, TokenKind};

use super::{ParseErrorKind, Parser};

impl Parser<'_> {
    /// Parse one statement. Always consumes at least one token unless the
    /// input is exhausted.
    pub(super) fn parse_statement(&mut self) {
        let before = self.consumed;
        if self.enter() {
            self.statement();
            self.leave();
        }
        if self.consumed == before {
            self.skip_stuck_token("statement");
        }
    }

    fn statement(&mut self) {
        match self.current_kind() {
            TokenKind::InlineHtml | TokenKind::OpenTag | TokenKind::CloseTag => {
                self.parse_inline_html();
            }
            TokenKind::Punct(Punct::OpenBrace) => self.parse_block(true),
            TokenKind::Punct(Punct::Semicolon) => {
                self.builder.start_node();
                self.bump();
                self.builder.finish_node(NodeKind::EmptyStatement);
            }
            TokenKind::Punct(Punct::OpenParen | Punct::OpenBracket) => {
                self.parse_expression_statement();
            }
            // Stray closers, separators and arm arrows are handled by the
            // caller.
            TokenKind::Punct(_) | TokenKind::Operator(Operator::Colon | Operator::DoubleArrow) => {}
            TokenKind::Keyword(kw) => self.keyword_statement(kw),
            _ => self.parse_expression_statement(),
        }
    }

    fn keyword_statement(&mut self, kw: Keyword) {
        match kw {
            Keyword::Echo => self.parse_echo(),
            Keyword::Return => self.parse_return(),
            Keyword::If => self.parse_if(),
            Keyword::While => self.parse_while(),
            Keyword::Foreach => self.parse_foreach(),
            Keyword::For => self.parse_for(),
            Keyword::Break => self.parse_jump(JumpKind::Break),
            Keyword::Continue => self.parse_jump(JumpKind::Continue),
            Keyword::Namespace if !self.nth(1).is_operator(Operator::Backslash) => {
                self.parse_namespace();
            }
            Keyword::Use => self.parse_use(),
            Keyword::Const => self.parse_member(),
            Keyword::Function if self.function_declaration_follows() => {
                self.parse_function_declaration();
            }
            Keyword::Class | Keyword::Interface | Keyword::Trait if self.nth(1).is_name_like() => {
                self.parse_class_declaration();
            }
            Keyword::Abstract | Keyword::Final | Keyword::Readonly => {
                self.parse_class_declaration();
            }
            Keyword::Enum if self.nth(1).is_name_like() => self.parse_enum_declaration(),
            Keyword::Class | Keyword::Interface | Keyword::Trait | Keyword::Enum
                if self.nth(1).is_eof() =>
            {
                self.parse_truncated_declaration(kw);
            }
            _ if self.at_expression_start() => self.parse_expression_statement(),
            // `case`, `default`, `else` and other keywords that cannot
            // start a statement are skipped once by the caller.
            _ => {}
        }
    }

    /// A declaration keyword that is the last token of the input.
    fn parse_truncated_declaration(&mut self, kw: Keyword) {
        let expected = match kw {
            Keyword::Interface => "interface name",
            Keyword::Trait => "trait name",
            Keyword::Enum => "enum name",
            _ => "class name",
        };
        let span = self.current_span();
        self.builder.start_node();
        self.bump();
        let kind = ParseErrorKind::UnexpectedEndOfInput { expected };
        let (code, diagnostic) = self.report(&kind, span);
        self.builder.finish_node(NodeKind::Error { code, diagnostic });
    }

    /// `function name(` or `function &name(`, as opposed to a closure.
    fn function_declaration_follows(&mut self) -> bool {
        if self.nth(1).is_operator(Operator::Amp) {
            self.nth(2).is_name_like()
        } else {
            self.nth(1).is_name_like()
        }
    }

    fn parse_inline_html(&mut self) {
        self.builder.start_node();
        while matches!(
            self.current().kind,
            TokenKind::InlineHtml | TokenKind::OpenTag | TokenKind::CloseTag
        ) {
            self.bump();
        }
        self.builder.finish_node(NodeKind::InlineHtml);
    }

    /// `{ statements }`. With `implicit_close`, a declaration keyword at
    /// column 1 ends an unclosed block.
    pub(super) fn parse_block(&mut self, implicit_close: bool) {
        let checkpoint = self.builder.checkpoint();
        self.builder.start_node();
        let open_span = self.current_span();
        self.bump();
        self.delimiters.push(Punct::OpenBrace);
        self.parse_block_statements(implicit_close);
        self.delimiters.pop();
        self.finish_delimited(Punct::OpenBrace, open_span, checkpoint, NodeKind::Block);
    }

    pub(super) fn parse_block_statements(&mut self, implicit_close: bool) {
        loop {
            if self.at_eof() || self.at_punct(Punct::CloseBrace) || self.at_enclosing_closer() {
                break;
            }
            if implicit_close && self.at_column_one_declaration(true) {
                tracing::debug!(
                    offset = self.current_span().start,
                    "declaration at column 1 closes the open block"
                );
                break;
            }
            self.parse_statement();
        }
    }

    fn parse_expression_statement(&mut self) {
        self.builder.start_node();
        self.parse_expression();
        self.expect_semicolon();
        self.builder.finish_node(NodeKind::ExpressionStatement);
    }

    fn parse_echo(&mut self) {
        self.builder.start_node();
        self.bump();
        self.parse_expression();
        while self.eat_punct(Punct::Comma) {
            self.parse_expression();
        }
        self.expect_semicolon();
        self.builder.finish_node(NodeKind::Echo);
    }

    fn parse_return(&mut self) {
        self.builder.start_node();
        self.bump();
        if self.at_expression_start() {
            self.parse_expression();
        }
        self.expect_semicolon();
        self.builder.finish_node(NodeKind::Return);
    }

    /// `( expr )` after `if`, `while`, `match`.
    pub(super) fn parse_condition(&mut self) {
        if self.at_punct(Punct::OpenParen) {
            self.parse_parenthesized();
        } else {
            let kind = self.expected("'('");
            self.error_missing(&kind, "(");
            if self.at_expression_start() {
                self.parse_expression();
            }
        }
    }

    /// Body of a control structure: a block or a single statement.
    fn parse_body(&mut self) {
        if self.at_eof() || self.at_enclosing_closer() {
            let kind = self.expected("statement");
            self.error_missing(&kind, "statement");
        } else {
            self.parse_statement();
        }
    }

    fn parse_if(&mut self) {
        self.builder.start_node();
        self.bump();
        self.parse_condition();
        self.parse_body();
        while self.at_kw(Keyword::ElseIf) {
            self.builder.start_node();
            self.bump();
            self.parse_condition();
            self.parse_body();
            self.builder.finish_node(NodeKind::ElseIf);
        }
        if self.at_kw(Keyword::Else) {
            self.builder.start_node();
            self.bump();
            self.parse_body();
            self.builder.finish_node(NodeKind::Else);
        }
        self.builder.finish_node(NodeKind::If);
    }

    fn parse_while(&mut self) {
        self.builder.start_node();
        self.bump();
        self.parse_condition();
        self.parse_body();
        self.builder.finish_node(NodeKind::While);
    }

    fn parse_foreach(&mut self) {
        self.builder.start_node();
        self.bump();
        let open_span = self.current_span();
        if self.expect_punct(Punct::OpenParen) {
            self.delimiters.push(Punct::OpenParen);
            self.parse_expression();
            if self.expect_kw(Keyword::As, "'as'") {
                self.parse_expression();
                if self.eat_op(Operator::DoubleArrow) {
                    self.parse_expression();
                }
            }
            self.delimiters.pop();
            self.close_header(open_span);
        }
        self.parse_body();
        self.builder.finish_node(NodeKind::Foreach);
    }

    fn parse_for(&mut self) {
        self.builder.start_node();
        self.bump();
        let open_span = self.current_span();
        if self.expect_punct(Punct::OpenParen) {
            self.delimiters.push(Punct::OpenParen);
            for section in 0..3 {
                if self.at_expression_start() {
                    self.parse_expression();
                    while self.eat_punct(Punct::Comma) {
                        self.parse_expression();
                    }
                }
                if section < 2 && !self.expect_punct(Punct::Semicolon) {
                    break;
                }
            }
            self.delimiters.pop();
            self.close_header(open_span);
        }
        self.parse_body();
        self.builder.finish_node(NodeKind::For);
    }

    /// Close a `foreach`/`for` header, skipping junk before the `)`.
    fn close_header(&mut self, open_span: Span) {
        if !self.at_punct(Punct::CloseParen)
            && !self.at_punct(Punct::OpenBrace)
            && !self.at_eof()
            && !self.at_enclosing_closer()
        {
            let kind = ParseErrorKind::ExpectedToken {
                expected: "')'",
                found: self.found(),
            };
            self.delimiters.push(Punct::OpenParen);
            self.skip_to_list_anchor(kind, true);
            self.delimiters.pop();
        }
        self.expect_closer(Punct::OpenParen, open_span);
    }

    fn parse_jump(&mut self, keyword: JumpKind) {
        self.builder.start_node();
        self.bump();
        if self.current().kind == TokenKind::Integer {
            self.bump();
        }
        self.expect_semicolon();
        self.builder.finish_node(NodeKind::Jump { keyword });
    }

    fn parse_namespace(&mut self) {
        self.builder.start_node();
        self.bump();
        let name = if self.at_name() || self.at_op(Operator::Backslash) {
            Some(self.bump_qualified_name())
        } else {
            None
        };
        let braced = self.at_punct(Punct::OpenBrace);
        if braced {
            self.parse_block(false);
        } else if name.is_some() {
            self.expect_semicolon();
        } else {
            let kind = self.expected("namespace name");
            self.error_missing(&kind, "name");
        }
        self.builder.finish_node(NodeKind::Namespace { name, braced });
    }

    /// `use A\B [as C], ...;`, also used for trait imports in classes.
    pub(super) fn parse_use(&mut self) {
        self.builder.start_node();
        self.bump();
        if self.at_kw(Keyword::Function) || self.at_kw(Keyword::Const) {
            self.bump();
        }
        let mut imports = Vec::new();
        loop {
            if !(self.at_name() || self.at_op(Operator::Backslash)) {
                let kind = self.expected("name");
                self.error_missing(&kind, "name");
                break;
            }
            imports.push(self.bump_qualified_name());
            if self.eat_kw(Keyword::As) && self.bump_name().is_none() {
                let kind = self.expected("alias");
                self.error_missing(&kind, "name");
            }
            if !self.eat_punct(Punct::Comma) {
                break;
            }
        }
        if self.at_punct(Punct::OpenBrace) {
            // Trait adaptation blocks are kept as a plain block.
            self.parse_block(false);
        } else {
            self.expect_semicolon();
        }
        self.builder.finish_node(NodeKind::Use { imports });
    }

    fn expect_kw(&mut self, kw: Keyword, expected: &'static str) -> bool {
        if self.eat_kw(kw) {
            return true;
        }
        let kind = self.expected(expected);
        self.error_missing(&kind, kw.as_str());
        false
    }
}

#[cfg(test)]
mod tests {
    use crate::ast::NodeKind;
    use crate::diagnostic::DiagnosticCode;
    use crate::parser::{ParseResult, ParserConfig, parse};
    use crate::source::SourceBuffer;

    fn parse_input(input: &str) -> ParseResult {
        parse(SourceBuffer::new(input), &ParserConfig::default())
    }

    fn kinds(result: &ParseResult) -> Vec<&'static str> {
        let tree = &result.tree;
        tree.descendants(tree.root())
            .map(|id| tree.kind(id).name())
            .collect()
    }

    #[test]
    fn control_flow() {
        let result = parse_input(
            "if ($a) { echo 1; } elseif ($b) echo 2; else { return; }\n\
             while ($i < 3) { $i++; }\n\
             foreach ($items as $k => $v) { continue; }\n\
             for ($i = 0; $i < 10; $i++) { break 1; }",
        );
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let kinds = kinds(&result);
        for expected in ["If", "ElseIf", "Else", "While", "Foreach", "For", "Jump"] {
            assert!(kinds.contains(&expected), "missing {expected}");
        }
    }

    #[test]
    fn namespace_and_use() {
        let result = parse_input("<?php\nnamespace App\\Models;\nuse Foo\\Bar as Baz, Qux;\n");
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        let tree = &result.tree;
        let imports = tree
            .descendants(tree.root())
            .find_map(|id| match tree.kind(id) {
                NodeKind::Use { imports } => Some(imports.clone()),
                _ => None,
            })
            .expect("use node");
        assert_eq!(imports, vec!["Foo\\Bar".to_string(), "Qux".to_string()]);
    }

    #[test]
    fn unclosed_block_reports_opener() {
        let result = parse_input("<?php\nif ($a) {\n    echo 1;\n");
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, DiagnosticCode::UnbalancedDelimiter);
        assert_eq!(result.diagnostics[0].span.start, 14);
    }

    #[test]
    fn column_one_declaration_closes_function_body() {
        let input = "<?php\nfunction a() {\n    echo 1;\n\nclass B {}\n";
        let result = parse_input(input);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, DiagnosticCode::UnbalancedDelimiter);
        let tree = &result.tree;
        let top: Vec<_> = tree
            .child_nodes(tree.root())
            .map(|id| tree.kind(id).name())
            .collect();
        assert_eq!(top, vec!["InlineHtml", "FunctionDeclaration", "ClassDeclaration"]);
    }

    #[test]
    fn close_tag_terminates_statement() {
        let result = parse_input("<p><?php echo $x ?></p>");
        assert!(result.diagnostics.is_empty(), "{:?}", result.diagnostics);
        assert_eq!(result.text(), "<p><?php echo $x ?></p>");
    }
}
