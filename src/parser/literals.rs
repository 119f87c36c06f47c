//! Numeric and string literal sub-scanners
//!
//! # Numbers
//!
//! ```text
//! number  -> "0x" digits | "0o" digits | "0b" digits
//!          | decimal ( "." digits )? ( [eE] [+-]? digits )?
//! digits  -> digit ( "_"? digit )*
//! ```
//!
//! Base prefixes are lowercase only. A decimal literal may not start with `0`
//! unless it is the single digit `0`. Digit separators are excised from the
//! decoded text, so `1_000` decodes to `1000`.
//!
//! # Strings
//!
//! Single or double quoted, optionally tripled. Single-line strings stop at a
//! raw newline. Recognised escapes are `\n \t \r \f \v \\ \' \" \xHH` and
//! backslash-newline, which continues the string onto the next line without
//! contributing any text.

use super::lexer::{LexErrorKind, Lexer, Token, TokenKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Base {
    Binary,
    Octal,
    Decimal,
    Hexadecimal,
}

impl Base {
    fn accepts(self, byte: u8) -> bool {
        match self {
            Base::Binary => matches!(byte, b'0' | b'1'),
            Base::Octal => matches!(byte, b'0'..=b'7'),
            Base::Decimal => byte.is_ascii_digit(),
            Base::Hexadecimal => byte.is_ascii_hexdigit(),
        }
    }

    fn token_kind(self) -> TokenKind {
        match self {
            Base::Binary => TokenKind::Binary,
            Base::Octal => TokenKind::Octal,
            Base::Decimal => TokenKind::Decimal,
            Base::Hexadecimal => TokenKind::Hexadecimal,
        }
    }

    fn invalid_character(self) -> LexErrorKind {
        match self {
            Base::Binary => LexErrorKind::InvalidBinCharacter,
            Base::Octal => LexErrorKind::InvalidOctCharacter,
            Base::Decimal => LexErrorKind::InvalidDecCharacter,
            Base::Hexadecimal => LexErrorKind::InvalidHexCharacter,
        }
    }

    fn empty_literal(self) -> LexErrorKind {
        match self {
            Base::Binary => LexErrorKind::EmptyBinLiteral,
            Base::Octal => LexErrorKind::EmptyOctLiteral,
            _ => LexErrorKind::EmptyHexLiteral,
        }
    }

    fn from_prefix(byte: u8) -> Option<Self> {
        match byte {
            b'x' => Some(Base::Hexadecimal),
            b'o' => Some(Base::Octal),
            b'b' => Some(Base::Binary),
            _ => None,
        }
    }
}

/// Characters that end a digit run without being part of it.
fn ends_number(byte: u8) -> bool {
    matches!(
        byte,
        b' ' | b'\t'
            | b'\r'
            | b'\n'
            | b'\''
            | b'"'
            | b'\\'
            | b'#'
            | b','
            | b'{'
            | b'}'
            | b'('
            | b')'
            | b'['
            | b']'
            | b':'
            | b';'
            | b'.'
            | b'='
            | b'+'
            | b'-'
            | b'*'
            | b'/'
            | b'%'
            | b'<'
            | b'>'
            | b'!'
            | b'&'
            | b'|'
            | b'^'
            | b'~'
            | b'@'
    )
}

fn hex_value(byte: u8) -> u8 {
    match byte {
        b'0'..=b'9' => byte - b'0',
        b'a'..=b'f' => byte - b'a' + 10,
        b'A'..=b'F' => byte - b'A' + 10,
        _ => 0,
    }
}

impl Lexer {
    /// Scan a numeric literal. The cursor is on its first digit.
    pub(crate) fn number(&mut self) -> Token {
        let mut kind = TokenKind::Decimal;

        if self.peek() == Some(b'0') {
            self.advance();

            if let Some(base) = self.peek().and_then(Base::from_prefix) {
                self.advance();
                kind = base.token_kind();
                if self.digits(base, &mut kind) == 0 {
                    self.report(base.empty_literal());
                    kind = TokenKind::Error;
                }
                return self.make_token(kind);
            }

            if self.digits(Base::Decimal, &mut kind) > 0 {
                self.report(LexErrorKind::LeadingZeroInDecimal);
                kind = TokenKind::Error;
            }
        } else {
            self.digits(Base::Decimal, &mut kind);
        }

        let mut is_float = false;

        if self.peek() == Some(b'.') {
            is_float = true;
            let point = self.current_location();
            self.advance();
            if self.digits(Base::Decimal, &mut kind) == 0 {
                self.report_from(LexErrorKind::DanglingDecimalPoint, point);
                kind = TokenKind::Error;
            }
        }

        if let Some(b'e' | b'E') = self.peek() {
            is_float = true;
            let exponent = self.current_location();
            self.advance();
            if let Some(b'+' | b'-') = self.peek() {
                self.advance();
            }
            if self.exponent_digits(&mut kind) == 0 {
                self.report_from(LexErrorKind::MissingExponentAfterE, exponent);
                kind = TokenKind::Error;
            }
        }

        if is_float && kind != TokenKind::Error {
            kind = TokenKind::Floating;
        }
        self.make_token(kind)
    }

    /// Digit run for an integer or fraction part. Decimal runs stop at an
    /// exponent marker so the caller can pick it up.
    fn digits(&mut self, base: Base, kind: &mut TokenKind) -> usize {
        self.digit_run(base, base == Base::Decimal, kind)
    }

    fn exponent_digits(&mut self, kind: &mut TokenKind) -> usize {
        self.digit_run(Base::Decimal, false, kind)
    }

    /// Consume digits of `base` and separators, returning the number of
    /// digits seen. Any fault downgrades `kind` to [`TokenKind::Error`].
    fn digit_run(
        &mut self,
        base: Base,
        stop_at_exponent: bool,
        kind: &mut TokenKind,
    ) -> usize {
        let mut count = 0;

        while let Some(byte) = self.peek() {
            if base.accepts(byte) {
                self.advance();
                count += 1;
            } else if byte == b'_' {
                let separator = self.current_location();
                let next = self.peek_ahead(1);
                self.skip();
                match next {
                    Some(b'_') => {
                        self.report_from(
                            LexErrorKind::RepeatedNumericSeparator,
                            separator,
                        );
                        *kind = TokenKind::Error;
                    }
                    Some(next) if base.accepts(next) => {}
                    _ => {
                        self.report_from(
                            LexErrorKind::TrailingNumericSeparator,
                            separator,
                        );
                        *kind = TokenKind::Error;
                    }
                }
            } else if ends_number(byte)
                || (stop_at_exponent && matches!(byte, b'e' | b'E'))
            {
                break;
            } else {
                let at = self.current_location();
                self.advance();
                self.report_from(base.invalid_character(), at);
                *kind = TokenKind::Error;
            }
        }

        count
    }

    /// Scan a string literal. The cursor is on the opening quote.
    pub(crate) fn string(&mut self, quote: u8) -> Token {
        let triple = self.peek_ahead(1) == Some(quote)
            && self.peek_ahead(2) == Some(quote);
        let delimiter = if triple { 3 } else { 1 };
        for _ in 0..delimiter {
            self.advance();
        }

        let mut kind = TokenKind::String;
        loop {
            match self.peek() {
                None if triple => {
                    return self
                        .error_token(LexErrorKind::UnterminatedMultiLineString);
                }
                None | Some(b'\n') if !triple => {
                    return self
                        .error_token(LexErrorKind::UnterminatedSingleLineString);
                }
                Some(b'\\') => self.escape(&mut kind),
                Some(byte) if byte == quote => {
                    if !triple {
                        self.advance();
                        break;
                    }
                    if self.peek_ahead(1) == Some(quote)
                        && self.peek_ahead(2) == Some(quote)
                    {
                        for _ in 0..3 {
                            self.advance();
                        }
                        break;
                    }
                    self.advance();
                }
                _ => {
                    self.advance();
                }
            }
        }

        self.make_token(kind)
    }

    /// Decode one escape sequence. The cursor is on the backslash.
    fn escape(&mut self, kind: &mut TokenKind) {
        let start = self.current_location();

        let Some(selector) = self.peek_ahead(1) else {
            self.advance();
            self.report_from(LexErrorKind::UnterminatedEscapeInString, start);
            *kind = TokenKind::Error;
            return;
        };

        let decoded = match selector {
            b'n' => b'\n',
            b't' => b'\t',
            b'r' => b'\r',
            b'f' => 0x0c,
            b'v' => 0x0b,
            b'\\' => b'\\',
            b'\'' => b'\'',
            b'"' => b'"',
            b'\n' => {
                self.skip();
                self.skip();
                return;
            }
            b'x' => {
                self.hex_escape(kind);
                return;
            }
            _ => {
                self.advance();
                self.advance();
                self.report_from(LexErrorKind::UnrecognizedEscapeCharacter, start);
                *kind = TokenKind::Error;
                return;
            }
        };

        self.skip();
        self.advance_replace(decoded);
    }

    /// `\xHH`. The cursor is on the backslash.
    fn hex_escape(&mut self, kind: &mut TokenKind) {
        let start = self.current_location();

        match (self.peek_ahead(2), self.peek_ahead(3)) {
            (Some(high), Some(low))
                if high.is_ascii_hexdigit() && low.is_ascii_hexdigit() =>
            {
                self.skip();
                self.skip();
                self.skip();
                self.advance_replace(hex_value(high) << 4 | hex_value(low));
            }
            (Some(_), Some(_)) => {
                self.advance();
                self.advance();
                self.report_from(LexErrorKind::InvalidEscapeHexSequence, start);
                *kind = TokenKind::Error;
            }
            (high, _) => {
                self.advance();
                self.advance();
                if high.is_some_and(|byte| byte.is_ascii_hexdigit()) {
                    self.advance();
                }
                self.report_from(
                    LexErrorKind::IncompleteEscapeHexSequence,
                    start,
                );
                *kind = TokenKind::Error;
            }
        }
    }
}
