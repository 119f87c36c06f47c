// Integration tests for the rattle lexer

use indoc::indoc;
use rattle::parser::{LexErrorKind, Lexer, Location, TokenKind};

fn kinds(source: &str) -> Vec<TokenKind> {
    Lexer::new(source)
        .tokenize()
        .into_iter()
        .map(|token| token.kind)
        .collect()
}

fn error_kinds(lexer: &Lexer) -> Vec<LexErrorKind> {
    lexer.errors().iter().map(|error| error.kind).collect()
}

#[test]
fn test_small_program() {
    let source = indoc! {r#"
        fn greet(name) {
            # say hello
            print("hi, " + name)
        }
    "#};

    let mut lexer = Lexer::new(source);
    let tokens = lexer.tokenize();
    let kinds: Vec<_> = tokens.iter().map(|token| token.kind).collect();

    assert_eq!(
        kinds,
        vec![
            TokenKind::Fn,
            TokenKind::Identifier,
            TokenKind::OpenParen,
            TokenKind::Identifier,
            TokenKind::CloseParen,
            TokenKind::OpenBrace,
            TokenKind::Newline,
            TokenKind::Comment,
            TokenKind::Newline,
            TokenKind::Identifier,
            TokenKind::OpenParen,
            TokenKind::String,
            TokenKind::Plus,
            TokenKind::Identifier,
            TokenKind::CloseParen,
            TokenKind::Newline,
            TokenKind::CloseBrace,
            TokenKind::Newline,
            TokenKind::Eot,
        ]
    );
    assert!(lexer.errors().is_empty());

    let string = tokens[11];
    assert_eq!(string.start, Location::new(3, 10, 43));
    assert_eq!(lexer.string_content(&string), Some(&b"hi, "[..]));
}

#[test]
fn test_unterminated_string_runs_to_end_of_input() {
    let mut lexer = Lexer::new("\"abc");
    let token = lexer.scan();

    assert_eq!(token.kind, TokenKind::Error);
    assert_eq!(token.end.offset, 4);
    assert_eq!(
        error_kinds(&lexer),
        vec![LexErrorKind::UnterminatedSingleLineString]
    );
    assert_eq!(lexer.scan().kind, TokenKind::Eot);
}

#[test]
fn test_newline_escape_decodes() {
    let mut lexer = Lexer::new(r#""a\nb""#);
    let token = lexer.scan();

    assert_eq!(token.kind, TokenKind::String);
    assert_eq!(lexer.string_content(&token), Some(&b"a\nb"[..]));
    // Raw text and locations are untouched by decoding.
    assert_eq!(lexer.raw(&token), br#""a\nb""#);
    assert_eq!(token.end.line, 1);
}

#[test]
fn test_decoding_keeps_later_locations() {
    let mut lexer = Lexer::new("'\\x41\\x42' ident");
    let string = lexer.scan();
    let ident = lexer.scan();

    assert_eq!(lexer.lexeme(&string), b"'AB'");
    assert_eq!(ident.start, Location::new(1, 11, 11));
    assert_eq!(lexer.lexeme(&ident), b"ident");
}

#[test]
fn test_multiple_errors_are_all_reported() {
    let mut lexer = Lexer::new("x = 0b ! 1__2 $");
    lexer.tokenize();

    assert_eq!(
        error_kinds(&lexer),
        vec![
            LexErrorKind::EmptyBinLiteral,
            LexErrorKind::IncompleteNotEqualOperator,
            LexErrorKind::RepeatedNumericSeparator,
            LexErrorKind::UnrecognizedCharacter,
        ]
    );
}

#[test]
fn test_error_display() {
    let mut lexer = Lexer::new("a\n  !");
    lexer.tokenize();
    let error = lexer.errors()[0];

    assert_eq!(error.kind.name(), "incomplete_not_equal_operator");
    assert_eq!(
        error.to_string(),
        "2:2: '!' must be followed by '='; did you mean 'not'?"
    );
}

#[test]
fn test_non_ascii_bytes_are_rejected_one_at_a_time() {
    let mut lexer = Lexer::new("é");
    let kinds: Vec<_> = lexer.tokenize().iter().map(|token| token.kind).collect();

    assert_eq!(
        kinds,
        vec![TokenKind::Error, TokenKind::Error, TokenKind::Eot]
    );
    assert_eq!(lexer.errors().len(), 2);
}

#[test]
fn test_compound_assignment_operators() {
    assert_eq!(
        kinds("+= -= *= /= %= @= &= |= ^= ~= <<= >>="),
        vec![
            TokenKind::PlusEqual,
            TokenKind::MinusEqual,
            TokenKind::StarEqual,
            TokenKind::SlashEqual,
            TokenKind::PercentEqual,
            TokenKind::AtEqual,
            TokenKind::BitAndEqual,
            TokenKind::BitOrEqual,
            TokenKind::XorEqual,
            TokenKind::InvertEqual,
            TokenKind::LshiftEqual,
            TokenKind::RshiftEqual,
            TokenKind::Eot,
        ]
    );
    assert!(TokenKind::RshiftEqual.is_assignment());
    assert!(!TokenKind::EqualEqual.is_assignment());
}

#[test]
fn test_clone_continues_independently() {
    let mut lexer = Lexer::new("a b");
    lexer.scan();
    let mut fork = lexer.clone();

    assert_eq!(fork.scan(), lexer.scan());
    assert_eq!(fork.scan().kind, TokenKind::Eot);
}

#[test]
fn test_source_need_not_be_utf8() {
    let mut lexer = Lexer::new(b"# caf\xe9\nx \xff 's\xe9'".to_vec());
    let kinds: Vec<_> = lexer.tokenize().iter().map(|token| token.kind).collect();

    assert_eq!(
        kinds,
        vec![
            TokenKind::Comment,
            TokenKind::Newline,
            TokenKind::Identifier,
            TokenKind::Error,
            TokenKind::String,
            TokenKind::Eot,
        ]
    );
    assert_eq!(
        error_kinds(&lexer),
        vec![LexErrorKind::UnrecognizedCharacter]
    );
}
