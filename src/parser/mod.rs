//! rattle source code parser
//!
//! This module transforms rattle source text into an Abstract Syntax Tree (AST):
//! - [`lexer`]: Tokenization (source text → tokens), with [`literals`]
//!   scanning numbers and strings
//! - [`parse`]: The [`Parser`] and its token stream
//! - [`expressions`] and [`statements`]: the grammar, as `impl Parser` blocks
//! - [`ast`]: AST node definitions
//!
//! # Error recovery
//!
//! Neither stage stops at the first fault. The lexer turns bad input into
//! `Error` tokens and the parser builds partial nodes with missing children,
//! so a single pass reports every problem it can find. Faults are collected
//! in two queues: [`Lexer::errors`] and [`Parser::errors`].
//!
//! # Parser Implementation
//!
//! Hand-written recursive descent for statements and a Pratt parser for
//! expressions. No external parser generator dependencies.

pub mod ast;
pub mod expressions;
pub mod lexer;
pub mod literals;
pub mod parse;
pub mod statements;

pub use lexer::{LexError, LexErrorKind, Lexer, Location, Token, TokenKind};
pub use parse::{Context, ParseError, ParseErrorKind, Parser, MAX_DEPTH};
