//! Statement parsing implementation
//!
//! This module handles parsing of all rattle statement types:
//!
//! - Compound statements: `if`, `while`, `for`, `try`, `with`, `class`, `fn`
//! - Simple statements: `return`, `raise`, `import`, `from`, `assert`,
//!   `global`, `nonlocal`, `del`, `break`, `continue`
//! - Blocks: `{ ... }`
//! - Expression statements and assignments
//!
//! # Grammar
//!
//! ```text
//! statement  ::= if_stmt | while_stmt | for_stmt | try_stmt | with_stmt
//!              | class_stmt | fn_stmt | simple_stmt | block | assign_or_expr
//! if_stmt    ::= "if" expr block ( "else" ( block | if_stmt ) )?
//! try_stmt   ::= "try" block except* ( "else" block )? ( "lastly" block )?
//! except     ::= "except" expr? block
//! class_stmt ::= "class" IDENT ( "(" expr? ")" )? block
//! fn_stmt    ::= "fn" IDENT ( "(" expr? ")" )? block
//! from_stmt  ::= "from" expr ( "import" expr )?
//! assign_or_expr ::= expr ( assign_op expr? )? EOS
//! block      ::= "{" statement* "}"
//! ```
//!
//! Simple statements end at a newline, a semicolon or the end of input. A
//! closing brace also ends one, without being consumed, so `{ return x }`
//! needs no separator.
//!
//! All parsing methods are implemented as `pub(crate)` methods on the [`Parser`] struct.

use tracing::{debug, trace};

use crate::parser::ast::*;
use crate::parser::lexer::{Token, TokenKind};
use crate::parser::parse::{Context, Nesting, ParseErrorKind, Parser};

impl Parser {
    /// Parse the next statement. Returns `None` only at the end of input.
    ///
    /// Stray separators, comments and error tokens are skipped, as is a
    /// closing delimiter that matches an open one.
    pub fn parse_statement(&mut self) -> Option<Statement> {
        loop {
            if let Some(statement) = self.statement_in_scope() {
                return Some(statement);
            }
            let token = self.get();
            if token.kind == TokenKind::Eot {
                return None;
            }
            debug!(kind = %token.kind, at = %token.start, "dropped close delimiter");
        }
    }

    /// Next statement of the enclosing block. Returns `None` at the end of
    /// input, or at a closing delimiter that belongs to an enclosing bracket,
    /// which is left in the stream for that bracket to consume.
    pub(crate) fn statement_in_scope(&mut self) -> Option<Statement> {
        let mut this = self.with_context(Context::DEFAULT);

        loop {
            let token = this.get();
            let statement = match token.kind {
                TokenKind::Semicolon
                | TokenKind::Newline
                | TokenKind::Comment
                | TokenKind::Error => continue,
                TokenKind::Eot => return None,
                TokenKind::CloseParen
                | TokenKind::CloseBracket
                | TokenKind::CloseBrace => {
                    let Some(nesting) = Nesting::closed_by(token.kind) else {
                        continue;
                    };
                    if this.depth(nesting) == 0 {
                        this.report(nesting.dangling(), &token);
                        continue;
                    }
                    this.unget(token);
                    return None;
                }
                TokenKind::OpenBrace => Statement::Block(this.parse_block(token)),
                TokenKind::If => this.parse_if(token),
                TokenKind::While => {
                    let (condition, body) = this.parse_header_and_block(&token);
                    Statement::While {
                        token,
                        condition,
                        body,
                    }
                }
                TokenKind::For => {
                    let (bindings, body) = this.parse_header_and_block(&token);
                    Statement::For {
                        token,
                        bindings,
                        body,
                    }
                }
                TokenKind::With => {
                    let (contexts, body) = this.parse_header_and_block(&token);
                    Statement::With {
                        token,
                        contexts,
                        body,
                    }
                }
                TokenKind::Try => this.parse_try(token),
                TokenKind::Except => Statement::Except(this.parse_except(token)),
                TokenKind::Else => Statement::Else(this.parse_else(token)),
                TokenKind::Lastly => Statement::Lastly(Lastly {
                    token,
                    body: this.expect_block(),
                }),
                TokenKind::Class => this.parse_class(token),
                TokenKind::Fn => this.parse_fn_statement(token),
                TokenKind::Return => Statement::Return {
                    token,
                    value: this.optional_expression_eos(),
                },
                TokenKind::Raise => Statement::Raise {
                    token,
                    value: this.optional_expression_eos(),
                },
                TokenKind::Import => Statement::Import(this.parse_import(token)),
                TokenKind::From => this.parse_from(token),
                TokenKind::Assert => Statement::Assert {
                    token,
                    condition: this.expression_eos(&token),
                },
                TokenKind::Global => Statement::Global {
                    token,
                    names: this.expression_eos(&token),
                },
                TokenKind::NonLocal => Statement::NonLocal {
                    token,
                    names: this.expression_eos(&token),
                },
                TokenKind::Del => Statement::Del {
                    token,
                    targets: this.expression_eos(&token),
                },
                TokenKind::Break => {
                    this.expect_eos();
                    Statement::Break(token)
                }
                TokenKind::Continue => {
                    this.expect_eos();
                    Statement::Continue(token)
                }
                _ => {
                    this.unget(token);
                    this.parse_assign_or_expression()
                }
            };
            trace!(statement = statement.type_name(), "parsed statement");
            return Some(statement);
        }
    }

    /// `{ statement* }`, after the opening brace.
    pub(crate) fn parse_block(&mut self, open: Token) -> Block {
        if self.too_deep() {
            let mut this = self.with_context(Context::IGNORE_EOSCOM);
            this.skip_nested(&open);
            return Block {
                token: open,
                statements: Vec::new(),
            };
        }

        let mut descended = self.descend();
        let mut this = descended.enter(Nesting::Brace, Context::IGNORE_EOSCOM);
        let mut statements = Vec::new();

        loop {
            if let Some(statement) = this.statement_in_scope() {
                statements.push(statement);
                continue;
            }

            let token = this.get();
            if token.kind != TokenKind::CloseBrace {
                debug!(kind = %token.kind, "block ended without its close brace");
                this.report(ParseErrorKind::UnterminatedBrace, &open);
                this.unget(token);
            }
            break;
        }

        Block {
            token: open,
            statements,
        }
    }

    /// A block that must follow a compound statement header. Reports and
    /// returns `None`, consuming nothing, if there is no opening brace.
    pub(crate) fn expect_block(&mut self) -> Option<Block> {
        let mut this = self.with_context(Context::IGNORE_NLCOM);
        let token = this.get();
        if token.kind == TokenKind::OpenBrace {
            return Some(this.parse_block(token));
        }
        this.report(ParseErrorKind::ExpectedOpeningBrace, &token);
        this.unget(token);
        None
    }

    /// Check the statement terminator and return the token found there. A
    /// closing brace or end of input is left in the stream; anything else but
    /// a newline or semicolon is reported and left for the next statement.
    pub(crate) fn expect_eos(&mut self) -> Token {
        let mut this = self.with_context(Context::DEFAULT);
        let token = this.get();
        match token.kind {
            TokenKind::Newline | TokenKind::Semicolon => {}
            TokenKind::CloseBrace | TokenKind::Eot => this.unget(token),
            _ => {
                this.report(ParseErrorKind::UnterminatedStatement, &token);
                this.unget(token);
            }
        }
        token
    }

    /// Expression required after `keyword`.
    fn required_expression(&mut self, keyword: &Token) -> Option<Expression> {
        let expr = self.parse_expression();
        if expr.is_none() {
            self.report(ParseErrorKind::ExpectedAnExpression, keyword);
        }
        expr
    }

    fn expression_eos(&mut self, keyword: &Token) -> Option<Expression> {
        let expr = self.required_expression(keyword);
        self.expect_eos();
        expr
    }

    fn optional_expression_eos(&mut self) -> Option<Expression> {
        let expr = self.parse_expression();
        self.expect_eos();
        expr
    }

    /// Expression or assignment. The first token is known not to start
    /// any other statement.
    fn parse_assign_or_expression(&mut self) -> Statement {
        let Some(target) = self.parse_expression() else {
            let token = self.get();
            self.report(ParseErrorKind::ExpectedAnExpression, &token);
            if token.kind == TokenKind::Eot {
                self.unget(token);
            }
            return Statement::Invalid(token);
        };

        let token = self.get();
        let Some(op) = AssignOp::from_token(token.kind) else {
            self.unget(token);
            return Statement::Expression {
                terminator: self.expect_eos(),
                expr: target,
            };
        };

        let value = self.required_expression(&token);
        self.expect_eos();
        Statement::Assign {
            op,
            token,
            target,
            value,
        }
    }

    /// Header expression and block shared by `while`, `for` and `with`.
    fn parse_header_and_block(
        &mut self,
        keyword: &Token,
    ) -> (Option<Expression>, Option<Block>) {
        let header = self.required_expression(keyword);
        let body = self.expect_block();
        (header, body)
    }

    /// Consume a trailing clause keyword on this or a following line.
    fn trailing_clause(&mut self, kind: TokenKind) -> Option<Token> {
        let mut this = self.with_context(Context::IGNORE_NLCOM);
        this.accept(kind)
    }

    fn parse_if(&mut self, token: Token) -> Statement {
        let (condition, body) = self.parse_header_and_block(&token);
        let else_branch = self
            .trailing_clause(TokenKind::Else)
            .map(|keyword| self.parse_else(keyword));
        Statement::If {
            token,
            condition,
            body,
            else_branch,
        }
    }

    /// `else` followed by a block or, for chains, another `if`.
    fn parse_else(&mut self, token: Token) -> Else {
        let chained = {
            let mut this = self.with_context(Context::IGNORE_NLCOM);
            this.accept(TokenKind::If)
        };
        let body = match chained {
            Some(keyword) if self.too_deep() => {
                self.skip_nested(&keyword);
                Some(Statement::Invalid(keyword))
            }
            Some(keyword) => Some(self.descend().parse_if(keyword)),
            None => self.expect_block().map(Statement::Block),
        };
        Else {
            token,
            body: body.map(Box::new),
        }
    }

    fn parse_try(&mut self, token: Token) -> Statement {
        let body = self.expect_block();

        let mut handlers = Vec::new();
        while let Some(keyword) = self.trailing_clause(TokenKind::Except) {
            handlers.push(self.parse_except(keyword));
        }

        let else_branch = self
            .trailing_clause(TokenKind::Else)
            .map(|keyword| self.parse_else(keyword));
        let lastly = self
            .trailing_clause(TokenKind::Lastly)
            .map(|keyword| Lastly {
                token: keyword,
                body: self.expect_block(),
            });

        Statement::Try {
            token,
            body,
            handlers,
            else_branch,
            lastly,
        }
    }

    /// `except` with an optional captured expression before its block.
    fn parse_except(&mut self, token: Token) -> Except {
        let captured = {
            let mut this = self.with_context(Context::IGNORE_NLCOM);
            if this.peek_kind() == TokenKind::OpenBrace {
                None
            } else {
                this.parse_expression()
            }
        };
        Except {
            token,
            captured,
            body: self.expect_block(),
        }
    }

    fn parse_class(&mut self, token: Token) -> Statement {
        let (name, bases) = {
            let mut this = self.with_context(Context::IGNORE_NLCOM);
            let name = this.accept(TokenKind::Identifier);
            if name.is_none() {
                let next = this.get();
                this.report(ParseErrorKind::ExpectedIdentifier, &next);
                this.unget(next);
            }
            let bases = this
                .accept(TokenKind::OpenParen)
                .map(|open| this.parse_container(open, Nesting::Paren));
            (name, bases)
        };
        Statement::Class {
            token,
            name,
            bases,
            body: self.expect_block(),
        }
    }

    /// `fn name(...) { ... }` is a declaration; any other `fn` starts an
    /// expression statement holding an anonymous function.
    fn parse_fn_statement(&mut self, keyword: Token) -> Statement {
        let name = {
            let mut this = self.with_context(Context::IGNORE_NLCOM);
            this.accept(TokenKind::Identifier)
        };
        match name {
            Some(name) => Statement::Fn(self.parse_function(keyword, Some(name))),
            None => {
                self.unget(keyword);
                self.parse_assign_or_expression()
            }
        }
    }

    fn parse_import(&mut self, token: Token) -> Import {
        Import {
            token,
            module: self.expression_eos(&token),
        }
    }

    fn parse_from(&mut self, token: Token) -> Statement {
        let package = self.required_expression(&token);
        let import = match self.accept(TokenKind::Import) {
            Some(keyword) => Some(self.parse_import(keyword)),
            None => {
                self.expect_eos();
                None
            }
        };
        Statement::From {
            token,
            package,
            import,
        }
    }
}
