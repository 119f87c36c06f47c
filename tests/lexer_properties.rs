//! Property-based tests for the rattle lexer and parser.
//!
//! 1. **Lexer never panics** and always ends with `Eot`
//! 2. **Token spans are ordered** and lie within the input
//! 3. **Locations agree with offsets**: line and column can be recomputed
//!    from the byte offset alone
//! 4. **End of input is a fixed point**
//! 5. **Lexing is deterministic**: two fresh lexers over the same input agree
//! 6. **Valid numeric literals lex cleanly** and digit separators are removed
//!    from their decoded text
//! 7. **Parser terminates** on arbitrary input with in-bounds error spans

use proptest::prelude::*;

use rattle::parser::{Lexer, Location, Parser, TokenKind};

fn proptest_config() -> ProptestConfig {
    let default = ProptestConfig::default();
    ProptestConfig {
        cases: default.cases.max(256),
        ..default
    }
}

/// Location recomputed from scratch for a byte offset.
fn location_of(source: &str, offset: usize) -> Location {
    let before = &source.as_bytes()[..offset];
    let line = 1 + before.iter().filter(|&&byte| byte == b'\n').count();
    let line_start = before
        .iter()
        .rposition(|&byte| byte == b'\n')
        .map_or(0, |newline| newline + 1);
    Location::new(line, offset - line_start, offset)
}

fn decimal_literal() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("0".to_string()),
        "[1-9][0-9]{0,6}",
        "[1-9][0-9]{0,2}(_[0-9]{1,3}){1,3}",
        "0x[0-9a-fA-F]{1,4}(_[0-9a-fA-F]{1,4}){0,2}",
        "0o[0-7]{1,6}",
        "0b[01]{1,8}(_[01]{1,4}){0,2}",
        "[1-9][0-9]{0,3}\\.[0-9]{1,4}",
        "[1-9][0-9]{0,3}(\\.[0-9]{1,3})?[eE][+-]?[0-9]{1,3}",
        "0\\.[0-9]{1,4}",
    ]
}

proptest! {
    #![proptest_config(proptest_config())]

    #[test]
    fn lexer_never_panics(input in "\\PC{0,300}") {
        let tokens = Lexer::new(input.as_str()).tokenize();
        prop_assert_eq!(tokens.last().map(|token| token.kind), Some(TokenKind::Eot));
    }

    #[test]
    fn token_spans_are_ordered(input in "\\PC{0,300}") {
        let tokens = Lexer::new(input.as_str()).tokenize();
        let mut previous_end = 0;
        for token in &tokens {
            prop_assert!(token.start.offset <= token.end.offset);
            prop_assert!(token.end.offset <= input.len());
            prop_assert!(
                token.start.offset >= previous_end,
                "token {:?} overlaps the previous one in {:?}",
                token,
                input,
            );
            previous_end = token.end.offset;
        }
    }

    #[test]
    fn locations_match_offsets(input in "[a-z0-9 \\n\"'#(){}+=_.\\\\]{0,200}") {
        let mut lexer = Lexer::new(input.as_str());
        for token in lexer.tokenize() {
            prop_assert_eq!(token.start, location_of(&input, token.start.offset));
            prop_assert_eq!(token.end, location_of(&input, token.end.offset));
        }
        for error in lexer.errors() {
            prop_assert_eq!(error.start, location_of(&input, error.start.offset));
        }
    }

    #[test]
    fn end_of_input_repeats(input in "\\PC{0,100}") {
        let mut lexer = Lexer::new(input.as_str());
        let eot = *lexer.tokenize().last().unwrap();
        let errors = lexer.errors().len();
        for _ in 0..3 {
            prop_assert_eq!(lexer.scan(), eot);
        }
        prop_assert_eq!(lexer.errors().len(), errors);
    }

    #[test]
    fn lexing_is_deterministic(input in "\\PC{0,200}") {
        let mut first = Lexer::new(input.as_str());
        let mut second = Lexer::new(input.as_str());
        prop_assert_eq!(first.tokenize(), second.tokenize());
        prop_assert_eq!(first.errors(), second.errors());
        prop_assert_eq!(first.decoded(), second.decoded());
    }

    #[test]
    fn valid_numbers_lex_cleanly(literal in decimal_literal()) {
        let mut lexer = Lexer::new(literal.as_str());
        let token = lexer.scan();
        prop_assert!(lexer.errors().is_empty(), "{:?}: {:?}", literal, lexer.errors());
        prop_assert_ne!(token.kind, TokenKind::Error);
        prop_assert_eq!(lexer.scan().kind, TokenKind::Eot);

        let without_separators: Vec<u8> =
            literal.bytes().filter(|&byte| byte != b'_').collect();
        prop_assert_eq!(lexer.lexeme(&token), without_separators.as_slice());
    }

    #[test]
    fn parser_terminates(input in "\\PC{0,200}") {
        let mut parser = Parser::new(input.as_str());
        parser.parse();
        for error in parser.errors() {
            prop_assert!(error.start.offset <= error.end.offset);
            prop_assert!(error.end.offset <= input.len());
        }
    }

    #[test]
    fn parser_terminates_on_punctuation(
        input in "[a-z(){}\\[\\],:;=+\\n ]{0,200}|(fn|if|else|try|not|is|in|class)( [a-z(){}\\[\\]]){0,30}"
    ) {
        let mut parser = Parser::new(input.as_str());
        parser.parse();
        prop_assert!(parser.lexer_errors().is_empty());
    }
}
