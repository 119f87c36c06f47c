//! Main parser coordinator
//!
//! This module provides the [`Parser`] struct: the token stream the grammar
//! reads from, the parse error queue, and the main [`Parser::parse`] entry
//! point.
//!
//! # Parser Architecture
//!
//! - This module: token stream, contexts, nesting guards, error reporting
//! - `expressions`: Pratt expression parser driven by a per-token rule table
//! - `statements`: recursive descent over statements and blocks
//!
//! Parser methods are split across those files using `impl Parser` blocks.
//!
//! # Token stream
//!
//! Tokens come from a pushback stash first and from the lexer otherwise.
//! [`Parser::unget`] returns a token to the front of the stash, so tokens are
//! re-read in the reverse order they were pushed back. The active [`Context`]
//! decides which trivia tokens (comments, newlines, semicolons) are silently
//! dropped on the way out.
//!
//! Contexts and nesting depths are changed only through [`Scope`] guards,
//! which restore the previous state when dropped on every exit path.
//!
//! # Recursion limit
//!
//! Nested expressions and blocks recurse. Past [`MAX_DEPTH`] levels the parser
//! records [`ParseErrorKind::NestingTooDeep`] and skips the nested region
//! instead of descending into it.

use std::collections::VecDeque;
use std::ops::{BitOr, Deref, DerefMut};

use thiserror::Error;
use tracing::{debug, trace};

use crate::parser::ast::Statement;
use crate::parser::lexer::{LexError, Lexer, Location, Token, TokenKind};

/// Syntactic faults. Parsing always continues after one is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ParseErrorKind {
    #[error("'{{' is never closed")]
    UnterminatedBrace,
    #[error("'(' is never closed")]
    UnterminatedParen,
    #[error("'[' is never closed")]
    UnterminatedBracket,
    #[error("'}}' has no matching '{{'")]
    DanglingBrace,
    #[error("')' has no matching '('")]
    DanglingParen,
    #[error("']' has no matching '['")]
    DanglingBracket,
    #[error("expected an expression")]
    ExpectedAnExpression,
    #[error("expected a newline or ';' after the statement")]
    UnterminatedStatement,
    #[error("expected '{{'")]
    ExpectedOpeningBrace,
    #[error("expected an identifier")]
    ExpectedIdentifier,
    #[error("'not' must be followed by 'in' here")]
    IncompleteNotInOperator,
    #[error("conditional expression is missing its 'else'")]
    UnterminatedIfElse,
    #[error("nesting is too deep")]
    NestingTooDeep,
}

impl ParseErrorKind {
    /// The snake_case identifier of this kind, used by diagnostic dumps.
    pub fn name(self) -> &'static str {
        match self {
            ParseErrorKind::UnterminatedBrace => "unterminated_brace",
            ParseErrorKind::UnterminatedParen => "unterminated_paren",
            ParseErrorKind::UnterminatedBracket => "unterminated_bracket",
            ParseErrorKind::DanglingBrace => "dangling_brace",
            ParseErrorKind::DanglingParen => "dangling_paren",
            ParseErrorKind::DanglingBracket => "dangling_bracket",
            ParseErrorKind::ExpectedAnExpression => "expected_an_expression",
            ParseErrorKind::UnterminatedStatement => "unterminated_statement",
            ParseErrorKind::ExpectedOpeningBrace => "expected_opening_brace",
            ParseErrorKind::ExpectedIdentifier => "expected_identifier",
            ParseErrorKind::IncompleteNotInOperator => {
                "incomplete_not_in_operator"
            }
            ParseErrorKind::UnterminatedIfElse => "unterminated_if_else",
            ParseErrorKind::NestingTooDeep => "nesting_too_deep",
        }
    }
}

/// A recorded syntactic fault and the raw source span it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{start}: {kind}")]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub start: Location,
    pub end: Location,
}

/// Maximum number of nested expressions and blocks the parser descends into.
pub const MAX_DEPTH: usize = 64;

/// Set of token kinds the stream skips while it is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Context(u8);

impl Context {
    pub const NONE: Context = Context(0);
    pub const IGNORE_COMMENTS: Context = Context(1 << 1);
    pub const IGNORE_NEWLINE: Context = Context(1 << 2);
    pub const IGNORE_SEMICOLON: Context = Context(1 << 3);

    pub const DEFAULT: Context = Context::IGNORE_COMMENTS;
    pub const IGNORE_EOS: Context =
        Context::IGNORE_NEWLINE.union(Context::IGNORE_SEMICOLON);
    pub const IGNORE_NLCOM: Context =
        Context::IGNORE_NEWLINE.union(Context::IGNORE_COMMENTS);
    pub const IGNORE_SEMCOM: Context =
        Context::IGNORE_SEMICOLON.union(Context::IGNORE_COMMENTS);
    pub const IGNORE_EOSCOM: Context =
        Context::IGNORE_EOS.union(Context::IGNORE_COMMENTS);

    pub const fn union(self, other: Context) -> Context {
        Context(self.0 | other.0)
    }

    pub const fn contains(self, other: Context) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether tokens of `kind` are dropped under this context.
    pub fn ignores(self, kind: TokenKind) -> bool {
        match kind {
            TokenKind::Comment => self.contains(Context::IGNORE_COMMENTS),
            TokenKind::Newline => self.contains(Context::IGNORE_NEWLINE),
            TokenKind::Semicolon => self.contains(Context::IGNORE_SEMICOLON),
            _ => false,
        }
    }
}

impl BitOr for Context {
    type Output = Context;

    fn bitor(self, rhs: Context) -> Context {
        self.union(rhs)
    }
}

/// Bracket families with their own depth counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Nesting {
    Paren,
    Bracket,
    Brace,
}

impl Nesting {
    /// The family a closing delimiter belongs to.
    pub(crate) fn closed_by(kind: TokenKind) -> Option<Nesting> {
        match kind {
            TokenKind::CloseParen => Some(Nesting::Paren),
            TokenKind::CloseBracket => Some(Nesting::Bracket),
            TokenKind::CloseBrace => Some(Nesting::Brace),
            _ => None,
        }
    }

    /// The family an opening delimiter belongs to.
    pub(crate) fn opened_by(kind: TokenKind) -> Option<Nesting> {
        match kind {
            TokenKind::OpenParen => Some(Nesting::Paren),
            TokenKind::OpenBracket => Some(Nesting::Bracket),
            TokenKind::OpenBrace => Some(Nesting::Brace),
            _ => None,
        }
    }

    pub(crate) fn close(self) -> TokenKind {
        match self {
            Nesting::Paren => TokenKind::CloseParen,
            Nesting::Bracket => TokenKind::CloseBracket,
            Nesting::Brace => TokenKind::CloseBrace,
        }
    }

    pub(crate) fn unterminated(self) -> ParseErrorKind {
        match self {
            Nesting::Paren => ParseErrorKind::UnterminatedParen,
            Nesting::Bracket => ParseErrorKind::UnterminatedBracket,
            Nesting::Brace => ParseErrorKind::UnterminatedBrace,
        }
    }

    pub(crate) fn dangling(self) -> ParseErrorKind {
        match self {
            Nesting::Paren => ParseErrorKind::DanglingParen,
            Nesting::Bracket => ParseErrorKind::DanglingBracket,
            Nesting::Brace => ParseErrorKind::DanglingBrace,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Depths {
    paren: usize,
    bracket: usize,
    brace: usize,
}

impl Depths {
    fn counter(&mut self, nesting: Nesting) -> &mut usize {
        match nesting {
            Nesting::Paren => &mut self.paren,
            Nesting::Bracket => &mut self.bracket,
            Nesting::Brace => &mut self.brace,
        }
    }

    fn get(&self, nesting: Nesting) -> usize {
        match nesting {
            Nesting::Paren => self.paren,
            Nesting::Bracket => self.bracket,
            Nesting::Brace => self.brace,
        }
    }
}

/// Guard that restores the parser's context, and leaves a nesting level or
/// recursion level if one was entered, when dropped. Derefs to the parser it
/// borrows.
pub(crate) struct Scope<'p> {
    parser: &'p mut Parser,
    saved: Context,
    nesting: Option<Nesting>,
    descended: bool,
}

impl Deref for Scope<'_> {
    type Target = Parser;

    fn deref(&self) -> &Parser {
        self.parser
    }
}

impl DerefMut for Scope<'_> {
    fn deref_mut(&mut self) -> &mut Parser {
        self.parser
    }
}

impl Drop for Scope<'_> {
    fn drop(&mut self) {
        self.parser.context = self.saved;
        if let Some(nesting) = self.nesting {
            let counter = self.parser.depths.counter(nesting);
            *counter = counter.saturating_sub(1);
        }
        if self.descended {
            self.parser.recursion = self.parser.recursion.saturating_sub(1);
        }
    }
}

/// Recursive descent parser over a single source text
#[derive(Debug, Clone)]
pub struct Parser {
    pub(crate) lexer: Lexer,
    stash: VecDeque<Token>,
    errors: VecDeque<ParseError>,
    context: Context,
    depths: Depths,
    recursion: usize,
}

impl Parser {
    pub fn new(source: impl Into<Vec<u8>>) -> Self {
        Self::from_lexer(Lexer::new(source))
    }

    pub fn from_lexer(lexer: Lexer) -> Self {
        Parser {
            lexer,
            stash: VecDeque::new(),
            errors: VecDeque::new(),
            context: Context::DEFAULT,
            depths: Depths::default(),
            recursion: 0,
        }
    }

    /// Swap in a new lexer and clear all parser state. Returns the old lexer.
    pub fn reset(&mut self, lexer: Lexer) -> Lexer {
        let previous = std::mem::replace(self, Parser::from_lexer(lexer));
        previous.lexer
    }

    /// Parse statements until the end of input.
    pub fn parse(&mut self) -> Vec<Statement> {
        let mut statements = Vec::new();
        while let Some(statement) = self.parse_statement() {
            statements.push(statement);
        }
        debug!(
            statements = statements.len(),
            parse_errors = self.errors.len(),
            lex_errors = self.lexer.errors().len(),
            "parsed program"
        );
        statements
    }

    pub fn errors(&self) -> &VecDeque<ParseError> {
        &self.errors
    }

    /// Drain the parse error queue.
    pub fn take_errors(&mut self) -> VecDeque<ParseError> {
        std::mem::take(&mut self.errors)
    }

    pub fn lexer(&self) -> &Lexer {
        &self.lexer
    }

    pub fn lexer_errors(&self) -> &VecDeque<LexError> {
        self.lexer.errors()
    }

    pub fn context(&self) -> Context {
        self.context
    }

    // ===== Token stream =====

    /// Next token not ignored by the active context.
    pub(crate) fn get(&mut self) -> Token {
        loop {
            let token = match self.stash.pop_front() {
                Some(token) => token,
                None => self.lexer.scan(),
            };
            if self.context.ignores(token.kind) {
                trace!(kind = %token.kind, "skipped");
                continue;
            }
            trace!(kind = %token.kind, at = %token.start, "get");
            return token;
        }
    }

    /// Push `token` back so the next [`Parser::get`] returns it.
    pub(crate) fn unget(&mut self, token: Token) {
        trace!(kind = %token.kind, "unget");
        self.stash.push_front(token);
    }

    /// Consume the next token if it has the given kind.
    pub(crate) fn accept(&mut self, kind: TokenKind) -> Option<Token> {
        let token = self.get();
        if token.kind == kind {
            Some(token)
        } else {
            self.unget(token);
            None
        }
    }

    pub(crate) fn peek_kind(&mut self) -> TokenKind {
        let token = self.get();
        self.unget(token);
        token.kind
    }

    // ===== Scopes =====

    /// Switch to `context` until the returned guard drops.
    pub(crate) fn with_context(&mut self, context: Context) -> Scope<'_> {
        let saved = std::mem::replace(&mut self.context, context);
        Scope {
            parser: self,
            saved,
            nesting: None,
            descended: false,
        }
    }

    /// Enter one level of `nesting` under `context` until the guard drops.
    pub(crate) fn enter(&mut self, nesting: Nesting, context: Context) -> Scope<'_> {
        *self.depths.counter(nesting) += 1;
        let saved = std::mem::replace(&mut self.context, context);
        Scope {
            parser: self,
            saved,
            nesting: Some(nesting),
            descended: false,
        }
    }

    pub(crate) fn depth(&self, nesting: Nesting) -> usize {
        self.depths.get(nesting)
    }

    /// Whether another recursion level would exceed [`MAX_DEPTH`].
    pub(crate) fn too_deep(&self) -> bool {
        self.recursion >= MAX_DEPTH
    }

    /// Count one recursion level until the guard drops.
    pub(crate) fn descend(&mut self) -> Scope<'_> {
        self.recursion += 1;
        let saved = self.context;
        Scope {
            parser: self,
            saved,
            nesting: None,
            descended: true,
        }
    }

    /// Record [`ParseErrorKind::NestingTooDeep`] at `at`, an already consumed
    /// token, and discard the construct it starts.
    ///
    /// An opening delimiter is skipped through its matching close. Anything
    /// else is skipped up to a close delimiter it did not open, a statement
    /// terminator outside any bracket, or the end of input, which is left in
    /// the stream.
    pub(crate) fn skip_nested(&mut self, at: &Token) {
        self.report(ParseErrorKind::NestingTooDeep, at);
        let bracketed = Nesting::opened_by(at.kind).is_some();
        let mut open = usize::from(bracketed);
        loop {
            let token = self.get();
            match token.kind {
                TokenKind::OpenParen | TokenKind::OpenBracket | TokenKind::OpenBrace => {
                    open += 1;
                }
                TokenKind::CloseParen | TokenKind::CloseBracket | TokenKind::CloseBrace
                    if open > 0 =>
                {
                    open -= 1;
                    if open == 0 && bracketed {
                        return;
                    }
                }
                TokenKind::Newline | TokenKind::Semicolon if open > 0 => {}
                TokenKind::CloseParen
                | TokenKind::CloseBracket
                | TokenKind::CloseBrace
                | TokenKind::Newline
                | TokenKind::Semicolon
                | TokenKind::Eot => {
                    debug!(kind = %token.kind, skipped_to = %token.start, "left nested region");
                    self.unget(token);
                    return;
                }
                _ => {}
            }
        }
    }

    // ===== Errors =====

    pub(crate) fn report(&mut self, kind: ParseErrorKind, token: &Token) {
        self.report_span(kind, token.start, token.end);
    }

    pub(crate) fn report_span(
        &mut self,
        kind: ParseErrorKind,
        start: Location,
        end: Location,
    ) {
        debug!(error = kind.name(), %start, %end, "parse error");
        self.errors.push_back(ParseError { kind, start, end });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_flags() {
        assert!(Context::DEFAULT.ignores(TokenKind::Comment));
        assert!(!Context::DEFAULT.ignores(TokenKind::Newline));
        assert!(Context::IGNORE_NLCOM.ignores(TokenKind::Newline));
        assert!(!Context::IGNORE_NLCOM.ignores(TokenKind::Semicolon));
        assert!(Context::IGNORE_EOSCOM.ignores(TokenKind::Semicolon));
        assert_eq!(
            Context::IGNORE_NEWLINE | Context::IGNORE_SEMICOLON,
            Context::IGNORE_EOS
        );
        assert!(!Context::NONE.ignores(TokenKind::Comment));
    }

    #[test]
    fn test_unget_is_last_in_first_out() {
        let mut parser = Parser::new("a b c");
        let a = parser.get();
        let b = parser.get();
        parser.unget(b);
        parser.unget(a);
        assert_eq!(parser.get(), a);
        assert_eq!(parser.get(), b);
        let token = parser.get();
        assert_eq!(parser.lexer.raw(&token), b"c");
    }

    #[test]
    fn test_context_skips_trivia() {
        let mut parser = Parser::new("a # note\nb");
        assert_eq!(parser.get().kind, TokenKind::Identifier);
        assert_eq!(parser.get().kind, TokenKind::Newline);

        let mut parser = Parser::new("a # note\nb");
        let mut scope = parser.with_context(Context::IGNORE_NLCOM);
        assert_eq!(scope.get().kind, TokenKind::Identifier);
        assert_eq!(scope.get().kind, TokenKind::Identifier);
        assert_eq!(scope.get().kind, TokenKind::Eot);
    }

    #[test]
    fn test_context_applies_to_stashed_tokens() {
        let mut parser = Parser::new("\nx");
        let newline = parser.get();
        assert_eq!(newline.kind, TokenKind::Newline);
        parser.unget(newline);
        let mut scope = parser.with_context(Context::IGNORE_NLCOM);
        assert_eq!(scope.get().kind, TokenKind::Identifier);
    }

    #[test]
    fn test_scopes_restore_state() {
        let mut parser = Parser::new("");
        {
            let mut outer = parser.enter(Nesting::Paren, Context::IGNORE_NLCOM);
            assert_eq!(outer.depth(Nesting::Paren), 1);
            {
                let inner = outer.enter(Nesting::Paren, Context::NONE);
                assert_eq!(inner.depth(Nesting::Paren), 2);
                assert_eq!(inner.context(), Context::NONE);
            }
            assert_eq!(outer.depth(Nesting::Paren), 1);
            assert_eq!(outer.context(), Context::IGNORE_NLCOM);
        }
        assert_eq!(parser.depth(Nesting::Paren), 0);
        assert_eq!(parser.context(), Context::DEFAULT);
    }

    #[test]
    fn test_descend_counts_recursion() {
        let mut parser = Parser::new("");
        {
            let mut outer = parser.descend();
            assert_eq!(outer.recursion, 1);
            let inner = outer.descend();
            assert_eq!(inner.recursion, 2);
        }
        assert_eq!(parser.recursion, 0);
        assert!(!parser.too_deep());
    }

    #[test]
    fn test_skip_nested_stops_at_enclosing_close() {
        let mut parser = Parser::new("a (b ) c) d");
        let a = parser.get();
        parser.skip_nested(&a);
        assert_eq!(parser.get().kind, TokenKind::CloseParen);
        let token = parser.get();
        assert_eq!(parser.lexer.raw(&token), b"d");
        assert_eq!(parser.errors()[0].kind, ParseErrorKind::NestingTooDeep);
    }

    #[test]
    fn test_skip_nested_consumes_bracketed_construct() {
        let mut parser = Parser::new("(b (c)\n) d");
        let open = parser.get();
        parser.skip_nested(&open);
        let token = parser.get();
        assert_eq!(parser.lexer.raw(&token), b"d");
    }

    #[test]
    fn test_eot_repeats() {
        let mut parser = Parser::new("");
        assert_eq!(parser.get().kind, TokenKind::Eot);
        assert_eq!(parser.get().kind, TokenKind::Eot);
    }

    #[test]
    fn test_reset_clears_errors() {
        let mut parser = Parser::new("}");
        parser.parse();
        assert_eq!(parser.errors().len(), 1);
        let old = parser.reset(Lexer::new("x"));
        assert_eq!(old.source(), b"}");
        assert!(parser.errors().is_empty());
        assert_eq!(parser.parse().len(), 1);
    }
}
