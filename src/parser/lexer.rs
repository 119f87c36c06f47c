//! Lexer (scanner) for rattle source code
//!
//! Converts raw source text into [`Token`]s, one per call to [`Lexer::scan`].
//! The lexer never fails: malformed input produces [`TokenKind::Error`] tokens
//! and a [`LexError`] record in the lexer's error queue, and scanning resumes
//! at the next character.
//!
//! # Buffers
//!
//! The source text is never modified. While the cursor walks it, every
//! consumed byte is also copied into a *decoded* buffer, except for numeric
//! digit separators and escape sequences, which are excised or replaced by the
//! byte they denote. A token therefore has two addresses:
//!
//! - `start`/`end` [`Location`]s, byte offsets into the raw source; these are
//!   what diagnostics point at and they never shift.
//! - a [`DecodedRange`] into the decoded buffer, which holds the literal's
//!   processed content (see [`Lexer::lexeme`]).
//!
//! Numeric and string literals are scanned by the sub-scanners in
//! [`super::literals`].

use std::collections::VecDeque;
use std::fmt;
use std::ops::Range;
use std::sync::LazyLock;

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::debug;

/// A position in the raw source text.
///
/// `line` is 1-based, `column` is the 0-based byte distance from the start of
/// the line and `offset` is the 0-based byte offset into the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Location {
    pub line: usize,
    pub column: usize,
    pub offset: usize,
}

impl Location {
    pub fn new(line: usize, column: usize, offset: usize) -> Self {
        Self {
            line,
            column,
            offset,
        }
    }
}

impl Default for Location {
    fn default() -> Self {
        Self::new(1, 0, 0)
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Half-open byte range into the lexer's decoded buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DecodedRange {
    pub start: usize,
    pub end: usize,
}

impl DecodedRange {
    pub fn range(self) -> Range<usize> {
        self.start..self.end
    }

    pub fn len(self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(self) -> bool {
        self.start == self.end
    }
}

/// Every kind of token the lexer can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Sentinels
    Error,
    Eot,
    Newline,
    Semicolon,
    Comment,

    // Keywords
    And,
    As,
    Assert,
    Break,
    Class,
    Continue,
    Del,
    Else,
    Except,
    False,
    Fn,
    For,
    From,
    Global,
    If,
    Import,
    In,
    Is,
    Lastly,
    None,
    NonLocal,
    Not,
    Or,
    Raise,
    Return,
    True,
    Try,
    While,
    With,
    Yield,

    // Structural symbols
    Comma,
    Colon,
    OpenBrace,
    CloseBrace,
    OpenParen,
    CloseParen,
    OpenBracket,
    CloseBracket,

    // Literals
    Identifier,
    String,
    Binary,
    Octal,
    Decimal,
    Hexadecimal,
    Floating,

    // Assignment
    Equal,        // =
    PlusEqual,    // +=
    MinusEqual,   // -=
    StarEqual,    // *=
    SlashEqual,   // /=
    PercentEqual, // %=
    AtEqual,      // @=
    BitAndEqual,  // &=
    BitOrEqual,   // |=
    XorEqual,     // ^=
    InvertEqual,  // ~=
    LshiftEqual,  // <<=
    RshiftEqual,  // >>=

    // Comparison
    NotEqual,     // !=
    EqualEqual,   // ==
    Less,         // <
    LessEqual,    // <=
    Greater,      // >
    GreaterEqual, // >=

    // Other operators
    Dot,     // .
    Plus,    // +
    Minus,   // -
    Star,    // *
    Slash,   // /
    Percent, // %
    At,      // @
    BitAnd,  // &
    BitOr,   // |
    Xor,     // ^
    Invert,  // ~
    Lshift,  // <<
    Rshift,  // >>
}

impl TokenKind {
    pub fn is_keyword(self) -> bool {
        matches!(
            self,
            TokenKind::And
                | TokenKind::As
                | TokenKind::Assert
                | TokenKind::Break
                | TokenKind::Class
                | TokenKind::Continue
                | TokenKind::Del
                | TokenKind::Else
                | TokenKind::Except
                | TokenKind::False
                | TokenKind::Fn
                | TokenKind::For
                | TokenKind::From
                | TokenKind::Global
                | TokenKind::If
                | TokenKind::Import
                | TokenKind::In
                | TokenKind::Is
                | TokenKind::Lastly
                | TokenKind::None
                | TokenKind::NonLocal
                | TokenKind::Not
                | TokenKind::Or
                | TokenKind::Raise
                | TokenKind::Return
                | TokenKind::True
                | TokenKind::Try
                | TokenKind::While
                | TokenKind::With
                | TokenKind::Yield
        )
    }

    /// Identifier, string and numeric literal kinds.
    pub fn is_literal(self) -> bool {
        matches!(
            self,
            TokenKind::Identifier
                | TokenKind::String
                | TokenKind::Binary
                | TokenKind::Octal
                | TokenKind::Decimal
                | TokenKind::Hexadecimal
                | TokenKind::Floating
        )
    }

    /// Plain `=` and the twelve compound assignment operators.
    pub fn is_assignment(self) -> bool {
        matches!(
            self,
            TokenKind::Equal
                | TokenKind::PlusEqual
                | TokenKind::MinusEqual
                | TokenKind::StarEqual
                | TokenKind::SlashEqual
                | TokenKind::PercentEqual
                | TokenKind::AtEqual
                | TokenKind::BitAndEqual
                | TokenKind::BitOrEqual
                | TokenKind::XorEqual
                | TokenKind::InvertEqual
                | TokenKind::LshiftEqual
                | TokenKind::RshiftEqual
        )
    }

    /// Kinds that end a simple statement.
    pub fn is_terminator(self) -> bool {
        matches!(
            self,
            TokenKind::Newline | TokenKind::Semicolon | TokenKind::Eot
        )
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A scanned token. Its text is not stored; recover it with
/// [`Lexer::raw`] or [`Lexer::lexeme`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub start: Location,
    pub end: Location,
    pub decoded: DecodedRange,
}

impl Token {
    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// Extends this token so that it also covers `other`, which must follow it.
    pub fn merge(mut self, other: &Token) -> Self {
        self.end = other.end;
        self.decoded.end = other.decoded.end;
        self
    }
}

static KEYWORDS: LazyLock<FxHashMap<&'static [u8], TokenKind>> =
    LazyLock::new(|| {
        [
            ("and", TokenKind::And),
            ("as", TokenKind::As),
            ("assert", TokenKind::Assert),
            ("break", TokenKind::Break),
            ("class", TokenKind::Class),
            ("continue", TokenKind::Continue),
            ("del", TokenKind::Del),
            ("else", TokenKind::Else),
            ("except", TokenKind::Except),
            ("False", TokenKind::False),
            ("fn", TokenKind::Fn),
            ("for", TokenKind::For),
            ("from", TokenKind::From),
            ("global", TokenKind::Global),
            ("if", TokenKind::If),
            ("import", TokenKind::Import),
            ("in", TokenKind::In),
            ("is", TokenKind::Is),
            ("lastly", TokenKind::Lastly),
            ("None", TokenKind::None),
            ("nonlocal", TokenKind::NonLocal),
            ("not", TokenKind::Not),
            ("or", TokenKind::Or),
            ("raise", TokenKind::Raise),
            ("return", TokenKind::Return),
            ("True", TokenKind::True),
            ("try", TokenKind::Try),
            ("while", TokenKind::While),
            ("with", TokenKind::With),
            ("yield", TokenKind::Yield),
        ]
        .into_iter()
        .map(|(word, kind)| (word.as_bytes(), kind))
        .collect()
    });

/// Looks up a keyword by its spelling.
pub fn keyword(word: &[u8]) -> Option<TokenKind> {
    KEYWORDS.get(word).copied()
}

/// Lexical faults. Each one is recorded and scanning continues.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum LexErrorKind {
    #[error("unrecognized character")]
    UnrecognizedCharacter,
    #[error("backslash at end of input")]
    UnterminatedEscapeSequence,
    #[error("backslash outside a string must be followed by a newline")]
    InvalidEscapeSequence,
    #[error("'!' must be followed by '='; did you mean 'not'?")]
    IncompleteNotEqualOperator,
    #[error("'\\x' must be followed by two hexadecimal digits")]
    InvalidEscapeHexSequence,
    #[error("input ends inside a '\\x' escape")]
    IncompleteEscapeHexSequence,
    #[error("unrecognized escape character")]
    UnrecognizedEscapeCharacter,
    #[error("single-line string is not terminated")]
    UnterminatedSingleLineString,
    #[error("multi-line string is not terminated")]
    UnterminatedMultiLineString,
    #[error("input ends inside an escape sequence")]
    UnterminatedEscapeInString,
    #[error("digit separators must not be repeated")]
    RepeatedNumericSeparator,
    #[error("digit separator must be followed by a digit")]
    TrailingNumericSeparator,
    #[error("expected at least one digit after the decimal point")]
    DanglingDecimalPoint,
    #[error("expected at least one digit in the exponent")]
    MissingExponentAfterE,
    #[error("decimal literals must not start with a zero")]
    LeadingZeroInDecimal,
    #[error("invalid character in hexadecimal literal")]
    InvalidHexCharacter,
    #[error("invalid character in octal literal")]
    InvalidOctCharacter,
    #[error("invalid character in decimal literal")]
    InvalidDecCharacter,
    #[error("invalid character in binary literal")]
    InvalidBinCharacter,
    #[error("expected at least one digit after '0x'")]
    EmptyHexLiteral,
    #[error("expected at least one digit after '0o'")]
    EmptyOctLiteral,
    #[error("expected at least one digit after '0b'")]
    EmptyBinLiteral,
}

impl LexErrorKind {
    /// The snake_case identifier of this kind, used by diagnostic dumps.
    pub fn name(self) -> &'static str {
        match self {
            LexErrorKind::UnrecognizedCharacter => "unrecognized_character",
            LexErrorKind::UnterminatedEscapeSequence => {
                "unterminated_escape_sequence"
            }
            LexErrorKind::InvalidEscapeSequence => "invalid_escape_sequence",
            LexErrorKind::IncompleteNotEqualOperator => {
                "incomplete_not_equal_operator"
            }
            LexErrorKind::InvalidEscapeHexSequence => {
                "invalid_escape_hex_sequence"
            }
            LexErrorKind::IncompleteEscapeHexSequence => {
                "incomplete_escape_hex_sequence"
            }
            LexErrorKind::UnrecognizedEscapeCharacter => {
                "unrecognized_escape_character"
            }
            LexErrorKind::UnterminatedSingleLineString => {
                "unterminated_single_line_string"
            }
            LexErrorKind::UnterminatedMultiLineString => {
                "unterminated_multi_line_string"
            }
            LexErrorKind::UnterminatedEscapeInString => {
                "unterminated_escape_in_string"
            }
            LexErrorKind::RepeatedNumericSeparator => {
                "repeated_numeric_separator"
            }
            LexErrorKind::TrailingNumericSeparator => {
                "trailing_numeric_separator"
            }
            LexErrorKind::DanglingDecimalPoint => "dangling_decimal_point",
            LexErrorKind::MissingExponentAfterE => "missing_exponent_after_e",
            LexErrorKind::LeadingZeroInDecimal => "leading_zero_in_decimal",
            LexErrorKind::InvalidHexCharacter => "invalid_hex_character",
            LexErrorKind::InvalidOctCharacter => "invalid_oct_character",
            LexErrorKind::InvalidDecCharacter => "invalid_dec_character",
            LexErrorKind::InvalidBinCharacter => "invalid_bin_character",
            LexErrorKind::EmptyHexLiteral => "empty_hex_literal",
            LexErrorKind::EmptyOctLiteral => "empty_oct_literal",
            LexErrorKind::EmptyBinLiteral => "empty_bin_literal",
        }
    }
}

/// A recorded lexical fault and the raw source span it covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{start}: {kind}")]
pub struct LexError {
    pub kind: LexErrorKind,
    pub start: Location,
    pub end: Location,
}

/// Scanner over a single in-memory source text.
///
/// The source is taken as bytes and need not be valid UTF-8: stray bytes
/// outside strings and comments are reported one at a time.
///
/// Cloning a lexer duplicates its buffers and cursor, so the clone can
/// continue independently from the same point.
#[derive(Debug, Clone, Default)]
pub struct Lexer {
    source: Vec<u8>,
    decoded: Vec<u8>,
    errors: VecDeque<LexError>,
    current: Location,
    lexeme_start: Location,
    decoded_start: usize,
}

impl Lexer {
    /// Create a new lexer for the given source text.
    pub fn new(source: impl Into<Vec<u8>>) -> Self {
        let source = source.into();
        Self {
            decoded: Vec::with_capacity(source.len()),
            source,
            ..Self::default()
        }
    }

    /// Replace the source text, clearing all scanning state and errors.
    /// Returns the previous source.
    pub fn reset(&mut self, source: impl Into<Vec<u8>>) -> Vec<u8> {
        let previous = std::mem::take(self);
        *self = Lexer::new(source);
        previous.source
    }

    /// Scan the next token. Returns [`TokenKind::Eot`] forever once the
    /// input is exhausted.
    pub fn scan(&mut self) -> Token {
        loop {
            self.skip_whitespace();

            let Some(byte) = self.peek() else {
                return self.make_token(TokenKind::Eot);
            };

            match byte {
                b'\\' => match self.peek_ahead(1) {
                    Some(b'\n') => {
                        // Line continuation
                        self.advance();
                        self.advance();
                        self.consume_lexeme();
                    }
                    Some(_) => {
                        self.advance();
                        self.advance();
                        return self.error_token(
                            LexErrorKind::InvalidEscapeSequence,
                        );
                    }
                    None => {
                        self.advance();
                        return self.error_token(
                            LexErrorKind::UnterminatedEscapeSequence,
                        );
                    }
                },
                b'#' => return self.comment(),
                b'\n' => return self.single(TokenKind::Newline),
                b';' => return self.single(TokenKind::Semicolon),
                b',' => return self.single(TokenKind::Comma),
                b':' => return self.single(TokenKind::Colon),
                b'.' => return self.single(TokenKind::Dot),
                b'(' => return self.single(TokenKind::OpenParen),
                b')' => return self.single(TokenKind::CloseParen),
                b'{' => return self.single(TokenKind::OpenBrace),
                b'}' => return self.single(TokenKind::CloseBrace),
                b'[' => return self.single(TokenKind::OpenBracket),
                b']' => return self.single(TokenKind::CloseBracket),
                b'=' => {
                    return self.operator(TokenKind::Equal, TokenKind::EqualEqual);
                }
                b'+' => {
                    return self.operator(TokenKind::Plus, TokenKind::PlusEqual);
                }
                b'-' => {
                    return self.operator(TokenKind::Minus, TokenKind::MinusEqual);
                }
                b'*' => {
                    return self.operator(TokenKind::Star, TokenKind::StarEqual);
                }
                b'/' => {
                    return self.operator(TokenKind::Slash, TokenKind::SlashEqual);
                }
                b'%' => {
                    return self
                        .operator(TokenKind::Percent, TokenKind::PercentEqual);
                }
                b'@' => return self.operator(TokenKind::At, TokenKind::AtEqual),
                b'&' => {
                    return self
                        .operator(TokenKind::BitAnd, TokenKind::BitAndEqual);
                }
                b'|' => {
                    return self.operator(TokenKind::BitOr, TokenKind::BitOrEqual);
                }
                b'^' => return self.operator(TokenKind::Xor, TokenKind::XorEqual),
                b'~' => {
                    return self
                        .operator(TokenKind::Invert, TokenKind::InvertEqual);
                }
                b'<' => {
                    return self.shift_or_compare(
                        b'<',
                        TokenKind::Lshift,
                        TokenKind::LshiftEqual,
                        TokenKind::Less,
                        TokenKind::LessEqual,
                    );
                }
                b'>' => {
                    return self.shift_or_compare(
                        b'>',
                        TokenKind::Rshift,
                        TokenKind::RshiftEqual,
                        TokenKind::Greater,
                        TokenKind::GreaterEqual,
                    );
                }
                b'!' => {
                    self.advance();
                    return if self.match_byte(b'=') {
                        self.make_token(TokenKind::NotEqual)
                    } else {
                        self.error_token(LexErrorKind::IncompleteNotEqualOperator)
                    };
                }
                b'\'' | b'"' => return self.string(byte),
                b'0'..=b'9' => return self.number(),
                _ if is_identifier_start(byte) => return self.identifier(),
                _ => {
                    self.advance();
                    return self.error_token(LexErrorKind::UnrecognizedCharacter);
                }
            }
        }
    }

    /// Scan the whole input, including the final [`TokenKind::Eot`].
    pub fn tokenize(&mut self) -> Vec<Token> {
        let mut tokens = Vec::new();
        loop {
            let token = self.scan();
            tokens.push(token);
            if token.kind == TokenKind::Eot {
                return tokens;
            }
        }
    }

    pub fn source(&self) -> &[u8] {
        &self.source
    }

    /// The decoded copy of everything scanned so far.
    pub fn decoded(&self) -> &[u8] {
        &self.decoded
    }

    /// Raw source bytes covered by `token`.
    pub fn raw(&self, token: &Token) -> &[u8] {
        &self.source[token.start.offset..token.end.offset]
    }

    /// Decoded bytes covered by `token`: escape sequences are resolved and
    /// digit separators removed.
    pub fn lexeme(&self, token: &Token) -> &[u8] {
        &self.decoded[token.decoded.range()]
    }

    /// Content of a terminated string token without its quote delimiters.
    pub fn string_content(&self, token: &Token) -> Option<&[u8]> {
        if token.kind != TokenKind::String {
            return None;
        }
        let raw = self.raw(token);
        let lexeme = self.lexeme(token);
        let delimiter = match raw {
            [a, b, c, ..] if a == b && b == c && raw.len() >= 6 => 3,
            _ => 1,
        };
        lexeme.get(delimiter..lexeme.len().checked_sub(delimiter)?)
    }

    pub fn errors(&self) -> &VecDeque<LexError> {
        &self.errors
    }

    /// Drain the error queue.
    pub fn take_errors(&mut self) -> VecDeque<LexError> {
        std::mem::take(&mut self.errors)
    }

    // ===== Scanners =====

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\r') = self.peek() {
            self.advance();
        }
        self.consume_lexeme();
    }

    /// `#` up to, but not including, the end of the line.
    fn comment(&mut self) -> Token {
        while let Some(byte) = self.peek() {
            if byte == b'\n' {
                break;
            }
            self.advance();
        }
        self.make_token(TokenKind::Comment)
    }

    fn identifier(&mut self) -> Token {
        while self.peek().is_some_and(is_identifier_char) {
            self.advance();
        }
        let word = &self.source
            [self.lexeme_start.offset..self.current.offset];
        let kind = keyword(word).unwrap_or(TokenKind::Identifier);
        self.make_token(kind)
    }

    fn single(&mut self, kind: TokenKind) -> Token {
        self.advance();
        self.make_token(kind)
    }

    /// `op` or `op=`.
    fn operator(&mut self, plain: TokenKind, with_equal: TokenKind) -> Token {
        self.advance();
        let kind = if self.match_byte(b'=') {
            with_equal
        } else {
            plain
        };
        self.make_token(kind)
    }

    /// `<`, `<=`, `<<`, `<<=` and their `>` counterparts.
    fn shift_or_compare(
        &mut self,
        ch: u8,
        shift: TokenKind,
        shift_equal: TokenKind,
        compare: TokenKind,
        compare_equal: TokenKind,
    ) -> Token {
        self.advance();
        let kind = if self.match_byte(ch) {
            if self.match_byte(b'=') {
                shift_equal
            } else {
                shift
            }
        } else if self.match_byte(b'=') {
            compare_equal
        } else {
            compare
        };
        self.make_token(kind)
    }

    // ===== Cursor =====

    pub(crate) fn peek(&self) -> Option<u8> {
        self.source.get(self.current.offset).copied()
    }

    pub(crate) fn peek_ahead(&self, n: usize) -> Option<u8> {
        self.source.get(self.current.offset + n).copied()
    }

    /// Consume one byte and copy it to the decoded buffer.
    pub(crate) fn advance(&mut self) -> Option<u8> {
        let byte = self.step()?;
        self.decoded.push(byte);
        Some(byte)
    }

    /// Consume one byte without copying it to the decoded buffer.
    pub(crate) fn skip(&mut self) -> Option<u8> {
        self.step()
    }

    /// Consume one byte and write `replacement` to the decoded buffer.
    pub(crate) fn advance_replace(&mut self, replacement: u8) {
        if self.step().is_some() {
            self.decoded.push(replacement);
        }
    }

    pub(crate) fn match_byte(&mut self, expected: u8) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn step(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.current.offset += 1;
        if byte == b'\n' {
            self.current.line += 1;
            self.current.column = 0;
        } else {
            self.current.column += 1;
        }
        Some(byte)
    }

    pub(crate) fn current_location(&self) -> Location {
        self.current
    }

    fn consume_lexeme(&mut self) {
        self.lexeme_start = self.current;
        self.decoded_start = self.decoded.len();
    }

    pub(crate) fn make_token(&mut self, kind: TokenKind) -> Token {
        let token = Token {
            kind,
            start: self.lexeme_start,
            end: self.current,
            decoded: DecodedRange {
                start: self.decoded_start,
                end: self.decoded.len(),
            },
        };
        self.consume_lexeme();
        token
    }

    /// Report `kind` over the current lexeme and return it as an error token.
    pub(crate) fn error_token(&mut self, kind: LexErrorKind) -> Token {
        self.report(kind);
        self.make_token(TokenKind::Error)
    }

    pub(crate) fn report(&mut self, kind: LexErrorKind) {
        self.report_span(kind, self.lexeme_start, self.current);
    }

    pub(crate) fn report_from(&mut self, kind: LexErrorKind, start: Location) {
        self.report_span(kind, start, self.current);
    }

    fn report_span(&mut self, kind: LexErrorKind, start: Location, end: Location) {
        debug!(error = kind.name(), %start, %end, "lexical error");
        self.errors.push_back(LexError { kind, start, end });
    }
}

pub(crate) fn is_identifier_start(byte: u8) -> bool {
    byte.is_ascii_alphabetic() || byte == b'_'
}

pub(crate) fn is_identifier_char(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_'
}
