use crate::ast::{ClassKind, Declaration, Modifiers, NodeKind, Parameter, TypeShape, Visibility};
use crate::token::{Keyword, Operator, Punct, TokenKind};

use super::{ParseErrorKind, Parser};

impl Parser<'_> {
    /// Visibility and other modifiers, in any order.
    fn parse_modifiers(&mut self) -> Modifiers {
        let mut modifiers = Modifiers::default();
        loop {
            let TokenKind::Keyword(kw) = self.current_kind() else {
                break;
            };
            match kw {
                Keyword::Public | Keyword::Var => modifiers.visibility = Some(Visibility::Public),
                Keyword::Protected => modifiers.visibility = Some(Visibility::Protected),
                Keyword::Private => modifiers.visibility = Some(Visibility::Private),
                // `static::` and `static fn` are expressions, not modifiers.
                Keyword::Static
                    if self.nth(1).is_operator(Operator::DoubleColon)
                        || self.nth(1).is_keyword(Keyword::Fn) =>
                {
                    break;
                }
                Keyword::Static => modifiers.is_static = true,
                Keyword::Abstract => modifiers.is_abstract = true,
                Keyword::Final => modifiers.is_final = true,
                Keyword::Readonly => modifiers.is_readonly = true,
                _ => break,
            }
            self.bump();
        }
        modifiers
    }

    fn parse_declaration_name(&mut self, expected: &'static str) -> Option<String> {
        let name = self.bump_name();
        if name.is_none() {
            let kind = self.expected(expected);
            self.error_missing(&kind, "name");
        }
        name
    }

    /// Comma-separated class names after `extends` or `implements`.
    fn parse_name_list(&mut self) -> Vec<String> {
        let mut names = Vec::new();
        loop {
            if self.at_name() || self.at_op(Operator::Backslash) {
                self.builder.start_node();
                let name = self.bump_qualified_name();
                self.builder
                    .finish_node(NodeKind::Name { name: name.clone() });
                names.push(name);
            } else {
                let kind = self.expected("class name");
                self.error_missing(&kind, "name");
                break;
            }
            if !self.eat_punct(Punct::Comma) {
                break;
            }
        }
        names
    }

    pub(super) fn parse_class_declaration(&mut self) {
        self.builder.start_node();
        let modifiers = self.parse_modifiers();
        let kind = match self.current_kind() {
            TokenKind::Keyword(Keyword::Interface) => ClassKind::Interface,
            TokenKind::Keyword(Keyword::Trait) => ClassKind::Trait,
            _ => ClassKind::Class,
        };
        if self.at_kw(Keyword::Class) || self.at_kw(Keyword::Interface) || self.at_kw(Keyword::Trait)
        {
            self.bump();
        } else {
            let error = self.expected("'class'");
            self.error_missing(&error, "class");
        }
        let name = self.parse_declaration_name("class name");
        let extends = if self.eat_kw(Keyword::Extends) {
            self.parse_name_list()
        } else {
            Vec::new()
        };
        let implements = if self.eat_kw(Keyword::Implements) {
            self.parse_name_list()
        } else {
            Vec::new()
        };
        self.parse_member_list(false);
        self.builder
            .finish_node(NodeKind::Declaration(Declaration::Class {
                kind,
                name,
                modifiers,
                extends,
                implements,
            }));
    }

    /// Anonymous class after `new class`: arguments, parents, body.
    pub(super) fn parse_anonymous_class_rest(&mut self) {
        if self.at_punct(Punct::OpenParen) {
            self.parse_argument_list();
        }
        if self.eat_kw(Keyword::Extends) {
            self.parse_name_list();
        }
        if self.eat_kw(Keyword::Implements) {
            self.parse_name_list();
        }
        self.parse_member_list(false);
    }

    pub(super) fn parse_enum_declaration(&mut self) {
        self.builder.start_node();
        self.bump();
        let name = self.parse_declaration_name("enum name");
        let mut backing = None;
        if self.eat_op(Operator::Colon) {
            if self.at_name() {
                backing = Some(self.current().text.to_ascii_lowercase());
            }
            self.parse_type();
        }
        if self.eat_kw(Keyword::Implements) {
            self.parse_name_list();
        }
        self.parse_member_list(true);
        self.builder
            .finish_node(NodeKind::Declaration(Declaration::Enum { name, backing }));
    }

    /// `{ members }` of a class, interface, trait or enum.
    fn parse_member_list(&mut self, is_enum: bool) {
        if !self.at_punct(Punct::OpenBrace) {
            let kind = self.expected("'{'");
            self.error_missing(&kind, "{");
            return;
        }
        let checkpoint = self.builder.checkpoint();
        self.builder.start_node();
        let open_span = self.current_span();
        self.bump();
        self.delimiters.push(Punct::OpenBrace);
        loop {
            if self.at_eof() || self.at_punct(Punct::CloseBrace) || self.at_enclosing_closer() {
                break;
            }
            if self.at_column_one_declaration(false) {
                tracing::debug!(
                    offset = self.current_span().start,
                    "declaration at column 1 closes the open member list"
                );
                break;
            }
            let before = self.consumed;
            if is_enum && self.current().kind == TokenKind::Identifier {
                self.parse_bare_enum_cases();
            } else {
                self.parse_member();
            }
            if self.consumed == before {
                self.skip_stuck_token("class member");
            }
        }
        self.delimiters.pop();
        self.finish_delimited(
            Punct::OpenBrace,
            open_span,
            checkpoint,
            NodeKind::MemberList,
        );
    }

    /// One class member: method, property, constant, enum case or trait
    /// `use`. Also handles top-level `const`.
    pub(super) fn parse_member(&mut self) {
        if !self.enter() {
            return;
        }
        match self.current_kind() {
            TokenKind::Keyword(Keyword::Use) => self.parse_use(),
            TokenKind::Keyword(Keyword::Case) => self.parse_enum_case(),
            _ => self.parse_modified_member(),
        }
        self.leave();
    }

    fn parse_modified_member(&mut self) {
        let checkpoint = self.builder.checkpoint();
        let modifiers = self.parse_modifiers();
        match self.current_kind() {
            TokenKind::Keyword(Keyword::Function) => {
                self.builder.start_node_at(checkpoint);
                self.bump();
                self.eat_op(Operator::Amp);
                let name = self.parse_declaration_name("method name");
                self.parse_callable_rest();
                self.builder
                    .finish_node(NodeKind::Declaration(Declaration::Method { name, modifiers }));
            }
            TokenKind::Keyword(Keyword::Const) => {
                self.builder.start_node_at(checkpoint);
                self.bump();
                let names = self.parse_constant_list();
                self.builder
                    .finish_node(NodeKind::Declaration(Declaration::Constant { modifiers, names }));
            }
            TokenKind::Variable => {
                self.builder.start_node_at(checkpoint);
                let names = self.parse_property_list();
                self.builder
                    .finish_node(NodeKind::Declaration(Declaration::Property { modifiers, names }));
            }
            _ if !modifiers.is_empty() && self.at_type_start() => {
                self.builder.start_node_at(checkpoint);
                self.parse_type();
                let names = self.parse_property_list();
                self.builder
                    .finish_node(NodeKind::Declaration(Declaration::Property { modifiers, names }));
            }
            _ if self.builder.added_since(checkpoint) > 0 => {
                // Modifiers with nothing recognisable after them.
                let span = self.current_span();
                let kind = self.expected("class member");
                self.wrap_error(checkpoint, kind, span);
            }
            _ => {}
        }
    }

    /// `NAME = expr, ...;` after `const`, with an optional type.
    fn parse_constant_list(&mut self) -> Vec<String> {
        if self.at_name() && self.nth(1).is_name_like() {
            self.parse_type();
        }
        let mut names = Vec::new();
        loop {
            match self.parse_declaration_name("constant name") {
                Some(name) => names.push(name),
                None => break,
            }
            if self.expect_op(Operator::Assign, "'='") {
                self.parse_expression();
            }
            if !self.eat_punct(Punct::Comma) {
                break;
            }
        }
        self.expect_semicolon();
        names
    }

    /// `$a [= expr], $b ...;`
    fn parse_property_list(&mut self) -> Vec<String> {
        let mut names = Vec::new();
        loop {
            if self.at_variable() {
                names.push(self.current().text.trim_start_matches('$').to_string());
                self.bump();
            } else {
                let kind = self.expected("property name");
                self.error_missing(&kind, "$name");
                break;
            }
            if self.eat_op(Operator::Assign) {
                self.parse_expression();
            }
            if !self.eat_punct(Punct::Comma) {
                break;
            }
        }
        self.expect_semicolon();
        names
    }

    /// `case Name [= value];`
    fn parse_enum_case(&mut self) {
        self.builder.start_node();
        self.bump();
        let name = self.parse_declaration_name("case name").unwrap_or_default();
        if self.eat_op(Operator::Assign) {
            self.parse_expression();
        }
        // Cases written as a comma list are accepted as well.
        if !self.eat_punct(Punct::Comma) {
            self.expect_semicolon();
        }
        self.builder
            .finish_node(NodeKind::Declaration(Declaration::EnumCase { name }));
    }

    /// Cases written without `case`, separated by commas: `A, B, C`.
    fn parse_bare_enum_cases(&mut self) {
        loop {
            self.builder.start_node();
            let name = self.bump_name().unwrap_or_default();
            if self.eat_op(Operator::Assign) {
                self.parse_expression();
            }
            self.builder
                .finish_node(NodeKind::Declaration(Declaration::EnumCase { name }));

            if self.eat_punct(Punct::Comma) {
                if self.current().kind == TokenKind::Identifier {
                    continue;
                }
                break;
            }
            if self.current().kind == TokenKind::Identifier {
                self.error_missing(&ParseErrorKind::MalformedEnumCase, ",");
                continue;
            }
            break;
        }
        self.eat_punct(Punct::Semicolon);
    }

    pub(super) fn parse_function_declaration(&mut self) {
        self.builder.start_node();
        self.bump();
        let by_ref = self.eat_op(Operator::Amp);
        let name = self.parse_declaration_name("function name");
        self.parse_callable_rest();
        self.builder
            .finish_node(NodeKind::Declaration(Declaration::Function { name, by_ref }));
    }

    /// Parameters, optional return type and body of a function or method.
    fn parse_callable_rest(&mut self) {
        self.parse_parameter_list();
        if self.eat_op(Operator::Colon) {
            self.parse_type();
        }
        self.parse_function_body();
    }

    fn parse_function_body(&mut self) {
        if self.at_punct(Punct::OpenBrace) {
            self.parse_block(true);
            return;
        }
        if self.eat_punct(Punct::Semicolon) {
            return;
        }
        let kind = self.expected("'{'");
        if self.at_statement_start() {
            // Body written without its opening brace: parse statements up
            // to the closing one.
            self.builder.start_node();
            self.error_missing(&kind, "{");
            self.parse_block_statements(true);
            if !self.eat_punct(Punct::CloseBrace) {
                self.builder.missing("}");
            }
            self.builder.finish_node(NodeKind::Block);
        } else {
            self.error_missing(&kind, "{");
        }
    }

    /// `( parameters )`. A list that runs into `{`, `;` or the end of
    /// input is closed implicitly.
    pub(super) fn parse_parameter_list(&mut self) {
        if !self.at_punct(Punct::OpenParen) {
            let kind = self.expected("'('");
            self.error_missing(&kind, "(");
            return;
        }
        let checkpoint = self.builder.checkpoint();
        self.builder.start_node();
        let open_span = self.current_span();
        self.bump();
        self.delimiters.push(Punct::OpenParen);
        loop {
            if self.at_list_end() {
                break;
            }
            self.parse_parameter();
            if self.eat_punct(Punct::Comma) {
                continue;
            }
            if self.at_list_end() {
                break;
            }
            if self.at_parameter_start() {
                self.error_missing(
                    &ParseErrorKind::MalformedParameterList {
                        detail: "missing ',' between parameters",
                    },
                    ",",
                );
                continue;
            }
            self.skip_to_list_anchor(
                ParseErrorKind::MalformedParameterList {
                    detail: "unexpected tokens in parameter list",
                },
                true,
            );
            self.eat_punct(Punct::Comma);
        }
        self.delimiters.pop();
        let closed = self.eat_punct(Punct::CloseParen);
        if !closed {
            let detail = if self.at_punct(Punct::OpenBrace) {
                "missing ')' before the function body"
            } else {
                "missing ')'"
            };
            self.error_missing(&ParseErrorKind::MalformedParameterList { detail }, ")");
        }
        self.builder.finish_node(NodeKind::ParameterList);
        if !closed {
            self.wrap_error(
                checkpoint,
                ParseErrorKind::UnclosedDelimiter { delimiter: '(' },
                open_span,
            );
        }
    }

    /// `)`, or a token that ends a parameter list left open.
    fn at_list_end(&mut self) -> bool {
        self.at_eof()
            || self.at_punct(Punct::CloseParen)
            || self.at_punct(Punct::OpenBrace)
            || self.at_punct(Punct::Semicolon)
            || self.at_op(Operator::DoubleArrow)
            || self.at_enclosing_closer()
    }

    fn at_parameter_start(&mut self) -> bool {
        match self.current_kind() {
            TokenKind::Variable => true,
            TokenKind::Operator(Operator::Amp | Operator::Ellipsis) => true,
            TokenKind::Keyword(kw) if kw.is_modifier() => true,
            _ => self.at_type_start(),
        }
    }

    fn at_type_start(&mut self) -> bool {
        matches!(
            self.current().kind,
            TokenKind::Identifier
                | TokenKind::Keyword(Keyword::Static)
                | TokenKind::Operator(Operator::Question | Operator::Backslash)
        ) || self.at_punct(Punct::OpenParen)
    }

    fn parse_parameter(&mut self) {
        self.builder.start_node();
        let modifiers = self.parse_modifiers();
        if !self.at_variable()
            && !self.at_op(Operator::Amp)
            && !self.at_op(Operator::Ellipsis)
            && self.at_type_start()
        {
            self.parse_type();
        }
        let by_ref = self.eat_op(Operator::Amp);
        let variadic = self.eat_op(Operator::Ellipsis);
        let name = if self.at_variable() {
            let name = self.current().text.trim_start_matches('$').to_string();
            self.bump();
            Some(name)
        } else {
            let kind = self.expected("parameter name");
            self.error_missing(&kind, "$name");
            None
        };
        if self.eat_op(Operator::Assign) {
            self.parse_expression();
        }
        self.builder.finish_node(NodeKind::Parameter(Parameter {
            name,
            modifiers,
            by_ref,
            variadic,
        }));
    }

    /// `?T`, `A|B`, `A&B`, `(A&B)|null`.
    pub(super) fn parse_type(&mut self) {
        if !self.enter() {
            return;
        }
        if self.at_op(Operator::Question) {
            self.builder.start_node();
            self.bump();
            self.parse_type_atom();
            self.builder.finish_node(NodeKind::Type(TypeShape::Nullable));
        } else {
            let checkpoint = self.builder.checkpoint();
            self.parse_type_atom();
            let (separator, shape) = if self.at_op(Operator::Pipe) {
                (Operator::Pipe, TypeShape::Union)
            } else if self.at_intersection_amp() {
                (Operator::Amp, TypeShape::Intersection)
            } else {
                self.leave();
                return;
            };
            self.builder.start_node_at(checkpoint);
            while self.at_op(separator) && (separator == Operator::Pipe || self.at_intersection_amp())
            {
                self.bump();
                self.parse_type_atom();
            }
            self.builder.finish_node(NodeKind::Type(shape));
        }
        self.leave();
    }

    /// `&` between two types, not the by-reference marker of a parameter.
    fn at_intersection_amp(&mut self) -> bool {
        self.at_op(Operator::Amp)
            && !matches!(
                self.nth(1).kind,
                TokenKind::Variable | TokenKind::Operator(Operator::Ellipsis)
            )
    }

    fn parse_type_atom(&mut self) {
        if self.at_punct(Punct::OpenParen) {
            // DNF group: `(A&B)`.
            let open_span = self.current_span();
            self.builder.start_node();
            self.bump();
            self.delimiters.push(Punct::OpenParen);
            self.parse_type();
            self.delimiters.pop();
            self.expect_closer(Punct::OpenParen, open_span);
            self.builder.finish_node(NodeKind::Type(TypeShape::Intersection));
        } else if self.at_name() || self.at_op(Operator::Backslash) {
            self.builder.start_node();
            let name = self.bump_qualified_name();
            self.builder
                .finish_node(NodeKind::Type(TypeShape::Named { name }));
        } else {
            let kind = self.expected("type");
            self.error_missing(&kind, "type");
        }
    }
}
