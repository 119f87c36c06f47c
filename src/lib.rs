//! # Introduction
//!
//! rattle is the front end for a small dynamically typed, brace-delimited
//! scripting language. It turns source text into tokens and then into an
//! abstract syntax tree, reporting every lexical and syntactic fault it finds
//! along the way instead of stopping at the first.
//!
//! ## Pipeline
//!
//! ```text
//! Source → Lexer → Token stream → Parser → AST
//!                      ↓             ↓
//!                  LexErrors    ParseErrors
//! ```
//!
//! 1. [`parser::lexer`] scans bytes into tokens with line/column locations and
//!    decodes escape sequences into a side buffer.
//! 2. [`parser::parse`] wraps the lexer in a token stream with pushback and
//!    context-dependent skipping of comments and statement separators.
//! 3. [`parser::expressions`] and [`parser::statements`] build
//!    [`parser::ast`] nodes.
//!
//! ## Example
//!
//! ```
//! use rattle::parser::Parser;
//!
//! let mut parser = Parser::new("x = 1 + 2 * 3\n");
//! let program = parser.parse();
//! assert_eq!(program.len(), 1);
//! assert!(parser.errors().is_empty());
//! ```
//!
//! Logging goes through [`tracing`]; the library never installs a subscriber.

pub mod parser;
