//! Lexer behaviour through the public API.

mod common;

use common::{BROKEN_FIXTURE, VALID_FIXTURE};
use php_syntax_rs::lexer::LexErrorKind;
use php_syntax_rs::token::{Keyword, Operator, Punct};
use php_syntax_rs::{LexMode, Lexer, SourceBuffer, Token, TokenKind, tokenize};

fn lex(input: &str) -> Vec<Token> {
    tokenize(&SourceBuffer::new(input))
}

fn significant(input: &str) -> Vec<TokenKind> {
    lex(input)
        .into_iter()
        .filter(|t| !t.kind.is_trivia())
        .map(|t| t.kind)
        .collect()
}

fn concat(tokens: &[Token]) -> String {
    tokens.iter().map(|t| t.text.as_str()).collect()
}

// -----------------------------------------------------------
// Coverage and modes.
// -----------------------------------------------------------

#[test]
fn fixtures_are_covered_byte_for_byte() {
    for fixture in [VALID_FIXTURE, BROKEN_FIXTURE] {
        let tokens = lex(fixture);
        assert_eq!(concat(&tokens), fixture);
        let mut offset = 0;
        for token in &tokens {
            assert_eq!(token.span.start, offset, "gap before {token:?}");
            offset = token.span.end;
        }
        assert!(tokens.last().is_some_and(Token::is_eof));
    }
}

#[test]
fn auto_mode_depends_on_open_tag() {
    assert_eq!(
        significant("echo 1;")[0],
        TokenKind::Keyword(Keyword::Echo)
    );
    let html = significant("<b>echo</b><?php echo 1;");
    assert_eq!(html[0], TokenKind::InlineHtml);
    assert_eq!(html[1], TokenKind::OpenTag);
}

#[test]
fn forced_modes() {
    let source = SourceBuffer::new("echo 1;");
    let first = Lexer::with_mode(&source, LexMode::Html)
        .next()
        .expect("token");
    assert_eq!(first.kind, TokenKind::InlineHtml);

    let source = SourceBuffer::new("<?php echo 1;");
    let first = Lexer::with_mode(&source, LexMode::Php)
        .find(|t| !t.kind.is_trivia())
        .expect("token");
    assert_eq!(first.kind, TokenKind::Operator(Operator::Less));
}

#[test]
fn lexer_is_lazy() {
    let source = SourceBuffer::new("$a = 1; $b = 2;");
    let mut lexer = Lexer::new(&source);
    let first = lexer.next().expect("token");
    assert_eq!(first.text, "$a");
    assert!(lexer.offset() < source.len());
}

// -----------------------------------------------------------
// Token shapes.
// -----------------------------------------------------------

#[test]
fn operators_use_maximal_munch() {
    let kinds = significant("$a ??= $b <=> $c ** 2 ?-> d ... ===");
    let ops: Vec<_> = kinds
        .iter()
        .filter_map(|k| match k {
            TokenKind::Operator(op) => Some(*op),
            _ => None,
        })
        .collect();
    assert_eq!(
        ops,
        vec![
            Operator::CoalesceAssign,
            Operator::Spaceship,
            Operator::Pow,
            Operator::NullsafeArrow,
            Operator::Ellipsis,
            Operator::Identical,
        ]
    );
}

#[test]
fn reversed_compound_assignment_is_two_tokens() {
    let kinds = significant("$x =+ 10;");
    assert_eq!(kinds[1], TokenKind::Operator(Operator::Assign));
    assert_eq!(kinds[2], TokenKind::Operator(Operator::Plus));
}

#[test]
fn punctuation() {
    let kinds = significant("f([1], {$a});");
    assert!(kinds.contains(&TokenKind::Punct(Punct::OpenBracket)));
    assert!(kinds.contains(&TokenKind::Punct(Punct::OpenBrace)));
    assert_eq!(kinds.last(), Some(&TokenKind::Eof));
}

#[test]
fn positions_are_one_based() {
    let tokens = lex("<?php\n  $name = 'x';");
    let variable = tokens
        .iter()
        .find(|t| t.kind == TokenKind::Variable)
        .expect("variable");
    assert_eq!((variable.start.line, variable.start.column), (2, 3));
    assert_eq!((variable.end.line, variable.end.column), (2, 8));
}

// -----------------------------------------------------------
// Errors never stop the lexer.
// -----------------------------------------------------------

#[test]
fn every_error_kind_is_an_invalid_token() {
    let cases: [(&str, fn(&LexErrorKind) -> bool); 5] = [
        ("$s = 'open", |e| matches!(e, LexErrorKind::UnterminatedString)),
        ("$h = <<<EOT\nbody\n", |e| {
            matches!(e, LexErrorKind::UnterminatedHeredoc { .. })
        }),
        ("/* never closed", |e| matches!(e, LexErrorKind::UnterminatedComment)),
        ("$n = 1__0;", |e| matches!(e, LexErrorKind::MalformedNumber { .. })),
        ("$a = 1 \u{1}", |e| matches!(e, LexErrorKind::InvalidCharacter { .. })),
    ];
    for (input, check) in cases {
        let tokens = lex(input);
        assert_eq!(concat(&tokens), input);
        let invalid: Vec<_> = tokens
            .iter()
            .filter_map(|t| match &t.kind {
                TokenKind::Invalid(e) => Some(e),
                _ => None,
            })
            .collect();
        assert_eq!(invalid.len(), 1, "{input:?}: {tokens:?}");
        assert!(check(invalid[0]), "{input:?}: {:?}", invalid[0]);
    }
}

#[test]
fn lexing_continues_after_invalid_token() {
    let kinds = significant("$a = 'open\n$b = 2;");
    assert!(matches!(kinds[2], TokenKind::Invalid(LexErrorKind::UnterminatedString)));
    assert_eq!(kinds[3], TokenKind::Variable);
    assert_eq!(kinds[5], TokenKind::Integer);
}
