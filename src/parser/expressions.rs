//! Expression parsing
//!
//! A Pratt parser driven by [`rule`], which maps each token kind to an
//! optional prefix and an optional infix parse, each with its precedence.
//!
//! # Precedence (lowest to highest)
//!
//! 1. Error recovery
//! 2. `,`
//! 3. `:`
//! 4. `yield`
//! 5. `as`
//! 6. `x if c else y`
//! 7. `or`
//! 8. `and`
//! 9. `not` (prefix)
//! 10. `in`, `not in`, `is`, `is not`, `<`, `<=`, `>`, `>=`, `==`, `!=`
//! 11. `|`
//! 12. `^`
//! 13. `&`
//! 14. `<<`, `>>`
//! 15. `+`, `-`
//! 16. `*`, `/`, `%`, `@`
//! 17. Unary `+`, `-`, `~`
//! 18. `.`, calls, subscripts
//!
//! A prefix parse applies when its precedence is at least the caller's
//! threshold. The infix loop continues while the next operator binds strictly
//! tighter than the threshold, so operators of equal precedence associate to
//! the left.
//!
//! Each nested prefix parse counts towards the parser's recursion limit; a
//! construct past it becomes an `Invalid` unary node with no operand.

use crate::parser::ast::{BinaryOp, ContainerKind, Expression, Function, UnaryOp};
use crate::parser::lexer::{Token, TokenKind};
use crate::parser::parse::{Context, Nesting, ParseErrorKind, Parser};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Precedence {
    Lowest,
    Recovery,
    Comma,
    Colon,
    Yield,
    As,
    IfElse,
    Or,
    And,
    Not,
    Comparison,
    BitOr,
    Xor,
    BitAnd,
    Shift,
    Additive,
    Multiplicative,
    Unary,
    Access,
    Primary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Prefix {
    Literal,
    Operator(UnaryOp),
    Container(Nesting),
    Function,
    Separator,
    Recovery,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Infix {
    Operator(BinaryOp),
    /// `not in` and `is not`
    MultiKeyword,
    Call,
    Subscript,
    IfElse,
    Separator,
    Recovery,
}

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Rule {
    pub prefix: Option<(Precedence, Prefix)>,
    pub infix: Option<(Precedence, Infix)>,
}

impl Rule {
    fn prefix(precedence: Precedence, prefix: Prefix) -> Rule {
        Rule {
            prefix: Some((precedence, prefix)),
            infix: None,
        }
    }

    fn infix(precedence: Precedence, infix: Infix) -> Rule {
        Rule {
            prefix: None,
            infix: Some((precedence, infix)),
        }
    }

    fn with_infix(mut self, precedence: Precedence, infix: Infix) -> Rule {
        self.infix = Some((precedence, infix));
        self
    }

    fn binary(precedence: Precedence, op: BinaryOp) -> Rule {
        Rule::infix(precedence, Infix::Operator(op))
    }
}

/// Parse rules for a token kind.
pub(crate) fn rule(kind: TokenKind) -> Rule {
    use Precedence as P;

    match kind {
        TokenKind::Identifier
        | TokenKind::String
        | TokenKind::Binary
        | TokenKind::Octal
        | TokenKind::Decimal
        | TokenKind::Hexadecimal
        | TokenKind::Floating
        | TokenKind::True
        | TokenKind::False
        | TokenKind::None => Rule::prefix(P::Primary, Prefix::Literal),

        TokenKind::Error => Rule::prefix(P::Recovery, Prefix::Recovery)
            .with_infix(P::Recovery, Infix::Recovery),

        TokenKind::Comma => Rule::prefix(P::Comma, Prefix::Separator)
            .with_infix(P::Comma, Infix::Separator),
        TokenKind::Colon => Rule::prefix(P::Colon, Prefix::Separator)
            .with_infix(P::Colon, Infix::Separator),

        TokenKind::Yield => {
            Rule::prefix(P::Yield, Prefix::Operator(UnaryOp::Yield))
        }
        TokenKind::As => Rule::binary(P::As, BinaryOp::As),
        TokenKind::If => Rule::infix(P::IfElse, Infix::IfElse),
        TokenKind::Or => Rule::binary(P::Or, BinaryOp::Or),
        TokenKind::And => Rule::binary(P::And, BinaryOp::And),
        TokenKind::Not => Rule::prefix(P::Not, Prefix::Operator(UnaryOp::Not))
            .with_infix(P::Comparison, Infix::MultiKeyword),

        TokenKind::In => Rule::binary(P::Comparison, BinaryOp::In),
        TokenKind::Is => Rule::infix(P::Comparison, Infix::MultiKeyword),
        TokenKind::Less => Rule::binary(P::Comparison, BinaryOp::Less),
        TokenKind::LessEqual => Rule::binary(P::Comparison, BinaryOp::LessEqual),
        TokenKind::Greater => Rule::binary(P::Comparison, BinaryOp::Greater),
        TokenKind::GreaterEqual => {
            Rule::binary(P::Comparison, BinaryOp::GreaterEqual)
        }
        TokenKind::EqualEqual => Rule::binary(P::Comparison, BinaryOp::EqualEqual),
        TokenKind::NotEqual => Rule::binary(P::Comparison, BinaryOp::NotEqual),

        TokenKind::BitOr => Rule::binary(P::BitOr, BinaryOp::BitOr),
        TokenKind::Xor => Rule::binary(P::Xor, BinaryOp::Xor),
        TokenKind::BitAnd => Rule::binary(P::BitAnd, BinaryOp::BitAnd),
        TokenKind::Lshift => Rule::binary(P::Shift, BinaryOp::Lshift),
        TokenKind::Rshift => Rule::binary(P::Shift, BinaryOp::Rshift),

        TokenKind::Plus => Rule::prefix(P::Unary, Prefix::Operator(UnaryOp::Plus))
            .with_infix(P::Additive, Infix::Operator(BinaryOp::Plus)),
        TokenKind::Minus => {
            Rule::prefix(P::Unary, Prefix::Operator(UnaryOp::Minus))
                .with_infix(P::Additive, Infix::Operator(BinaryOp::Minus))
        }
        TokenKind::Star => Rule::binary(P::Multiplicative, BinaryOp::Star),
        TokenKind::Slash => Rule::binary(P::Multiplicative, BinaryOp::Slash),
        TokenKind::Percent => Rule::binary(P::Multiplicative, BinaryOp::Percent),
        TokenKind::At => Rule::binary(P::Multiplicative, BinaryOp::At),
        TokenKind::Invert => {
            Rule::prefix(P::Unary, Prefix::Operator(UnaryOp::Invert))
        }

        TokenKind::Dot => Rule::binary(P::Access, BinaryOp::Dot),
        TokenKind::OpenParen => {
            Rule::prefix(P::Primary, Prefix::Container(Nesting::Paren))
                .with_infix(P::Access, Infix::Call)
        }
        TokenKind::OpenBracket => {
            Rule::prefix(P::Primary, Prefix::Container(Nesting::Bracket))
                .with_infix(P::Access, Infix::Subscript)
        }
        TokenKind::OpenBrace => {
            Rule::prefix(P::Primary, Prefix::Container(Nesting::Brace))
        }
        TokenKind::Fn => Rule::prefix(P::Primary, Prefix::Function),

        _ => Rule::default(),
    }
}

impl Parser {
    /// Parse one expression under the default context. Returns `None`,
    /// consuming nothing, when the next token cannot start an expression.
    pub fn parse_expression(&mut self) -> Option<Expression> {
        let mut this = self.with_context(Context::DEFAULT);
        this.parse_precedence(Precedence::Lowest)
    }

    pub(crate) fn parse_precedence(
        &mut self,
        threshold: Precedence,
    ) -> Option<Expression> {
        let token = self.get();
        let Some((precedence, prefix)) = rule(token.kind)
            .prefix
            .filter(|(precedence, _)| *precedence >= threshold)
        else {
            self.unget(token);
            return None;
        };

        if self.too_deep() {
            self.skip_nested(&token);
            return Some(Expression::Unary {
                op: UnaryOp::Invalid,
                token,
                operand: None,
            });
        }

        let mut this = self.descend();
        let mut left = this.parse_prefix(prefix, precedence, token);

        loop {
            let token = this.get();
            match rule(token.kind).infix {
                Some((precedence, infix)) if precedence > threshold => {
                    left = this.parse_infix(infix, precedence, token, left);
                }
                _ => {
                    this.unget(token);
                    return Some(left);
                }
            }
        }
    }

    fn parse_prefix(
        &mut self,
        prefix: Prefix,
        precedence: Precedence,
        token: Token,
    ) -> Expression {
        match prefix {
            Prefix::Literal => literal(token),
            Prefix::Operator(UnaryOp::Yield) => {
                // A bare `yield` is allowed; its operand may be a tuple.
                let operand = self.parse_precedence(Precedence::Recovery);
                Expression::Unary {
                    op: UnaryOp::Yield,
                    token,
                    operand: operand.map(Box::new),
                }
            }
            Prefix::Operator(op) => {
                let operand = self.operand(precedence, &token);
                Expression::Unary {
                    op,
                    token,
                    operand: operand.map(Box::new),
                }
            }
            Prefix::Recovery => Expression::Unary {
                op: UnaryOp::Invalid,
                token,
                operand: self.parse_precedence(precedence).map(Box::new),
            },
            Prefix::Separator => Expression::Binary {
                op: BinaryOp::Separator,
                token,
                left: None,
                right: self.parse_precedence(precedence).map(Box::new),
            },
            Prefix::Container(nesting) => self.parse_container(token, nesting),
            Prefix::Function => {
                let function = self.parse_function(token, None);
                Expression::Fn(Box::new(function))
            }
        }
    }

    fn parse_infix(
        &mut self,
        infix: Infix,
        precedence: Precedence,
        token: Token,
        left: Expression,
    ) -> Expression {
        match infix {
            Infix::Operator(op) => {
                let right = self.operand(precedence, &token);
                binary(op, token, left, right)
            }
            Infix::Separator => {
                let right = self.parse_precedence(precedence);
                binary(BinaryOp::Separator, token, left, right)
            }
            Infix::Recovery => {
                let right = self.parse_precedence(precedence);
                binary(BinaryOp::Invalid, token, left, right)
            }
            Infix::MultiKeyword => self.parse_multi_keyword(precedence, token, left),
            Infix::Call => {
                let arguments = self.parse_delimited(&token, Nesting::Paren);
                binary(BinaryOp::Call, token, left, arguments)
            }
            Infix::Subscript => {
                let index = self.parse_delimited(&token, Nesting::Bracket);
                binary(BinaryOp::Subscript, token, left, index)
            }
            Infix::IfElse => self.parse_if_else(precedence, token, left),
        }
    }

    /// Operand of an operator, reporting if there is none.
    fn operand(&mut self, precedence: Precedence, operator: &Token) -> Option<Expression> {
        let operand = self.parse_precedence(precedence);
        if operand.is_none() {
            self.report(ParseErrorKind::ExpectedAnExpression, operator);
        }
        operand
    }

    /// `not in` and `is not`. Both keywords become a single operator token.
    fn parse_multi_keyword(
        &mut self,
        precedence: Precedence,
        first: Token,
        left: Expression,
    ) -> Expression {
        let second = self.get();

        let (op, token) = match (first.kind, second.kind) {
            (TokenKind::Not, TokenKind::In) => (BinaryOp::NotIn, first.merge(&second)),
            (TokenKind::Is, TokenKind::Not) => (BinaryOp::IsNot, first.merge(&second)),
            (TokenKind::Is, _) => {
                self.unget(second);
                (BinaryOp::Is, first)
            }
            _ => {
                self.unget(second);
                self.report(ParseErrorKind::IncompleteNotInOperator, &first);
                (BinaryOp::Invalid, first)
            }
        };

        let right = self.operand(precedence, &token);
        binary(op, token, left, right)
    }

    /// `value if condition else otherwise`
    fn parse_if_else(
        &mut self,
        precedence: Precedence,
        token: Token,
        value: Expression,
    ) -> Expression {
        let condition = self.operand(precedence, &token);

        let otherwise = match self.accept(TokenKind::Else) {
            // Nested conditionals in the else branch group to the right.
            Some(keyword) => self.operand(Precedence::As, &keyword),
            None => {
                self.report(ParseErrorKind::UnterminatedIfElse, &token);
                None
            }
        };

        Expression::IfElse {
            token,
            value: Box::new(value),
            condition: condition.map(Box::new),
            otherwise: otherwise.map(Box::new),
        }
    }

    /// Parenthesised, bracketed or braced literal.
    pub(crate) fn parse_container(&mut self, open: Token, nesting: Nesting) -> Expression {
        let entries = self.parse_delimited(&open, nesting);
        let kind = classify(nesting, entries.as_ref());
        Expression::Container {
            kind,
            token: open,
            entries: entries.map(Box::new),
        }
    }

    /// Contents up to the closing delimiter of `nesting`, with newlines and
    /// comments ignored. A missing close delimiter is reported at `open`.
    fn parse_delimited(&mut self, open: &Token, nesting: Nesting) -> Option<Expression> {
        let mut this = self.enter(nesting, Context::IGNORE_NLCOM);
        let entries = this.parse_precedence(Precedence::Lowest);
        if this.accept(nesting.close()).is_none() {
            this.report(nesting.unterminated(), open);
        }
        entries
    }

    /// Parameters and body after `fn` (and its name, for named functions).
    pub(crate) fn parse_function(&mut self, keyword: Token, name: Option<Token>) -> Function {
        let params = {
            let mut this = self.with_context(Context::IGNORE_NLCOM);
            this.accept(TokenKind::OpenParen)
                .map(|open| this.parse_container(open, Nesting::Paren))
        };
        let body = self.expect_block();
        Function {
            token: keyword,
            name,
            params,
            body,
        }
    }
}

fn literal(token: Token) -> Expression {
    match token.kind {
        TokenKind::Identifier => Expression::Identifier(token),
        TokenKind::String => Expression::String(token),
        TokenKind::True => Expression::True(token),
        TokenKind::False => Expression::False(token),
        TokenKind::None => Expression::None(token),
        _ => Expression::Number(token),
    }
}

fn binary(op: BinaryOp, token: Token, left: Expression, right: Option<Expression>) -> Expression {
    Expression::Binary {
        op,
        token,
        left: Some(Box::new(left)),
        right: right.map(Box::new),
    }
}

fn classify(nesting: Nesting, entries: Option<&Expression>) -> ContainerKind {
    match (nesting, entries) {
        (Nesting::Paren, Some(entries)) if !entries.is_comma() => ContainerKind::Group,
        (Nesting::Paren, _) => ContainerKind::Tuple,
        (Nesting::Bracket, _) => ContainerKind::List,
        (Nesting::Brace, None) => ContainerKind::Dict,
        (Nesting::Brace, Some(entries)) => {
            let first = entries.comma_items().first().copied();
            if first.is_some_and(Expression::is_colon) {
                ContainerKind::Dict
            } else {
                ContainerKind::Set
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse::MAX_DEPTH;

    fn parse(source: &str) -> (Option<Expression>, Parser) {
        let mut parser = Parser::new(source);
        let expr = parser.parse_expression();
        (expr, parser)
    }

    fn op_of(expr: &Expression) -> BinaryOp {
        match expr {
            Expression::Binary { op, .. } => *op,
            other => panic!("expected a binary expression, got {other:?}"),
        }
    }

    fn children(expr: &Expression) -> (&Expression, &Expression) {
        match expr {
            Expression::Binary {
                left: Some(left),
                right: Some(right),
                ..
            } => (left, right),
            other => panic!("expected both operands, got {other:?}"),
        }
    }

    #[test]
    fn test_precedence() {
        let (expr, parser) = parse("1 + 2 * 3");
        let expr = expr.unwrap();
        assert_eq!(op_of(&expr), BinaryOp::Plus);
        let (left, right) = children(&expr);
        assert!(matches!(left, Expression::Number(_)));
        assert_eq!(op_of(right), BinaryOp::Star);
        assert!(parser.errors().is_empty());
    }

    #[test]
    fn test_left_associativity() {
        let (expr, _) = parse("1 - 2 - 3");
        let expr = expr.unwrap();
        assert_eq!(op_of(&expr), BinaryOp::Minus);
        let (left, right) = children(&expr);
        assert_eq!(op_of(left), BinaryOp::Minus);
        assert!(matches!(right, Expression::Number(_)));
    }

    #[test]
    fn test_unary_binds_tighter_than_multiplication() {
        let (expr, _) = parse("-a * b");
        let expr = expr.unwrap();
        assert_eq!(op_of(&expr), BinaryOp::Star);
        let (left, _) = children(&expr);
        assert!(matches!(left, Expression::Unary { op: UnaryOp::Minus, .. }));
    }

    #[test]
    fn test_not_binds_looser_than_comparison() {
        let (expr, _) = parse("not a == b");
        match expr.unwrap() {
            Expression::Unary {
                op: UnaryOp::Not,
                operand: Some(operand),
                ..
            } => assert_eq!(op_of(&operand), BinaryOp::EqualEqual),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_not_in_and_is_not() {
        let (expr, parser) = parse("a not in b");
        let expr = expr.unwrap();
        assert_eq!(op_of(&expr), BinaryOp::NotIn);
        assert_eq!(parser.lexer().raw(expr.token()), b"not in");

        let (expr, parser) = parse("a is not b");
        let expr = expr.unwrap();
        assert_eq!(op_of(&expr), BinaryOp::IsNot);
        assert_eq!(parser.lexer().raw(expr.token()), b"is not");

        let (expr, _) = parse("a is b");
        assert_eq!(op_of(&expr.unwrap()), BinaryOp::Is);
    }

    #[test]
    fn test_incomplete_not_in() {
        let (expr, parser) = parse("a not b");
        assert_eq!(op_of(&expr.unwrap()), BinaryOp::Invalid);
        assert_eq!(parser.errors().len(), 1);
        assert_eq!(
            parser.errors()[0].kind,
            ParseErrorKind::IncompleteNotInOperator
        );
    }

    #[test]
    fn test_access_chain() {
        let (expr, parser) = parse("a.b(c)[d]");
        let expr = expr.unwrap();
        assert_eq!(op_of(&expr), BinaryOp::Subscript);
        let (call, _) = children(&expr);
        assert_eq!(op_of(call), BinaryOp::Call);
        let (dot, _) = children(call);
        assert_eq!(op_of(dot), BinaryOp::Dot);
        assert!(parser.errors().is_empty());
    }

    #[test]
    fn test_call_without_arguments() {
        let (expr, parser) = parse("f()");
        match expr.unwrap() {
            Expression::Binary {
                op: BinaryOp::Call,
                right: None,
                ..
            } => {}
            other => panic!("unexpected {other:?}"),
        }
        assert!(parser.errors().is_empty());
    }

    #[test]
    fn test_containers() {
        let kind = |source: &str| match parse(source).0.unwrap() {
            Expression::Container { kind, .. } => kind,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(kind("(a)"), ContainerKind::Group);
        assert_eq!(kind("()"), ContainerKind::Tuple);
        assert_eq!(kind("(a, b)"), ContainerKind::Tuple);
        assert_eq!(kind("[1, 2]"), ContainerKind::List);
        assert_eq!(kind("{}"), ContainerKind::Dict);
        assert_eq!(kind("{a: 1, b: 2}"), ContainerKind::Dict);
        assert_eq!(kind("{a, b}"), ContainerKind::Set);
    }

    #[test]
    fn test_newlines_inside_brackets() {
        let (expr, parser) = parse("[\n  1,\n  2,\n]");
        assert!(matches!(
            expr,
            Some(Expression::Container {
                kind: ContainerKind::List,
                ..
            })
        ));
        assert!(parser.errors().is_empty());
    }

    #[test]
    fn test_unterminated_paren() {
        let (_, parser) = parse("(a");
        assert_eq!(parser.errors().len(), 1);
        assert_eq!(parser.errors()[0].kind, ParseErrorKind::UnterminatedParen);
    }

    #[test]
    fn test_missing_operand() {
        let (expr, parser) = parse("a +");
        match expr.unwrap() {
            Expression::Binary {
                op: BinaryOp::Plus,
                right: None,
                ..
            } => {}
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(parser.errors()[0].kind, ParseErrorKind::ExpectedAnExpression);
    }

    #[test]
    fn test_if_else_expression() {
        let (expr, parser) = parse("a if c else b");
        assert!(matches!(
            expr,
            Some(Expression::IfElse {
                condition: Some(_),
                otherwise: Some(_),
                ..
            })
        ));
        assert!(parser.errors().is_empty());

        let (_, parser) = parse("a if c");
        assert_eq!(parser.errors()[0].kind, ParseErrorKind::UnterminatedIfElse);
    }

    #[test]
    fn test_slices_and_separators() {
        let (expr, parser) = parse("a[:n]");
        let expr = expr.unwrap();
        let (_, index) = children(&expr);
        assert!(matches!(
            index,
            Expression::Binary {
                op: BinaryOp::Separator,
                left: None,
                right: Some(_),
                ..
            }
        ));
        assert!(parser.errors().is_empty());
    }

    #[test]
    fn test_lambda() {
        let (expr, parser) = parse("fn (x) { return x }");
        match expr.unwrap() {
            Expression::Fn(function) => {
                assert!(function.name.is_none());
                assert!(function.params.is_some());
                assert_eq!(function.body.unwrap().statements.len(), 1);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(parser.errors().is_empty());
    }

    #[test]
    fn test_yield_takes_tuple_operand() {
        let (expr, parser) = parse("yield a, b");
        match expr.unwrap() {
            Expression::Unary {
                op: UnaryOp::Yield,
                operand: Some(operand),
                ..
            } => assert_eq!(op_of(&operand), BinaryOp::Separator),
            other => panic!("unexpected {other:?}"),
        }
        assert!(parser.errors().is_empty());
    }

    #[test]
    fn test_yield_without_operand() {
        let (expr, parser) = parse("yield");
        assert!(matches!(
            expr,
            Some(Expression::Unary {
                op: UnaryOp::Yield,
                operand: None,
                ..
            })
        ));
        assert!(parser.errors().is_empty());
    }

    #[test]
    fn test_deep_nesting_becomes_invalid_node() {
        let source = format!("{}x", "~".repeat(MAX_DEPTH + 10));
        let (expr, parser) = parse(&source);

        let mut node = &expr.unwrap();
        let mut levels = 0;
        while let Expression::Unary {
            op: UnaryOp::Invert,
            operand: Some(operand),
            ..
        } = node
        {
            node = &**operand;
            levels += 1;
        }
        assert_eq!(levels, MAX_DEPTH);
        assert!(matches!(
            node,
            Expression::Unary {
                op: UnaryOp::Invalid,
                operand: None,
                ..
            }
        ));
        assert_eq!(parser.errors().len(), 1);
        assert_eq!(parser.errors()[0].kind, ParseErrorKind::NestingTooDeep);
    }

    #[test]
    fn test_no_expression_consumes_nothing() {
        let (expr, mut parser) = parse("= 1");
        assert!(expr.is_none());
        assert_eq!(parser.get().kind, TokenKind::Equal);
        assert!(parser.errors().is_empty());
    }
}
