// rattle: lex and parse rattle source files, reporting every fault found

use std::fmt::Display;
use std::fs;
use std::io::IsTerminal;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser as ClapParser, ValueEnum};
use crossterm::style::{Color, Stylize};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use rattle::parser::ast::{Block, Else, Expression, Function, Statement};
use rattle::parser::{Lexer, Location, Parser, Token, TokenKind};

/// Check rattle source files for lexical and syntax errors.
#[derive(ClapParser, Debug)]
#[command(name = "rattle", version, about)]
struct Args {
    /// Source files to check
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Print the token stream instead of parsing
    #[arg(long)]
    tokens: bool,

    /// Print the full syntax tree instead of one line per statement
    #[arg(long)]
    tree: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// When to colour diagnostics
    #[arg(long, value_enum, default_value_t = ColorChoice::Auto)]
    color: ColorChoice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ColorChoice {
    Auto,
    Always,
    Never,
}

fn main() -> Result<ExitCode> {
    let args = Args::parse();
    install_tracing(args.verbose);

    let color = match args.color {
        ColorChoice::Always => true,
        ColorChoice::Never => false,
        ColorChoice::Auto => std::io::stdout().is_terminal(),
    };

    let mut failed = false;
    for path in &args.files {
        match check_file(path, &args, color) {
            Ok(faults) => {
                info!(file = %path.display(), faults, "checked");
                failed |= faults > 0;
            }
            Err(err) => {
                error!("{err:#}");
                eprintln!("{}: {err:#}", paint("error", Color::Red, color));
                failed = true;
            }
        }
    }

    Ok(if failed {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn install_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Lex and parse one file, printing what was asked for. Returns the number
/// of faults found.
fn check_file(path: &Path, args: &Args, color: bool) -> Result<usize> {
    let source = fs::read(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    debug!(file = %path.display(), bytes = source.len(), "read source");
    let name = path.display();

    if args.tokens {
        let lexer = print_tokens(source, color);
        println!("{} error(s)", lexer.errors().len());
        for error in lexer.errors() {
            report(&name, error.start, error.end, error.kind.name(), &lexer, color);
        }
        return Ok(lexer.errors().len());
    }

    let mut parser = Parser::new(source);
    let program = parser.parse();
    let lexer = parser.lexer();

    for statement in &program {
        if args.tree {
            print_statement(lexer, statement, 0);
        } else {
            let start = statement.token().start;
            println!("{:>4}:{:<3} {}", start.line, start.column, statement.type_name());
        }
    }

    let faults = lexer.errors().len() + parser.errors().len();
    println!("{faults} error(s)");
    for error in lexer.errors() {
        report(&name, error.start, error.end, error.kind.name(), lexer, color);
    }
    for error in parser.errors() {
        report(&name, error.start, error.end, error.kind.name(), lexer, color);
    }

    Ok(faults)
}

fn report(
    file: &impl Display,
    start: Location,
    end: Location,
    kind: &str,
    lexer: &Lexer,
    color: bool,
) {
    let raw = lexer
        .source()
        .get(start.offset..end.offset)
        .unwrap_or_default();
    let text = String::from_utf8_lossy(raw);
    println!(
        "{}:{}: {} '{}'",
        file,
        start,
        paint(kind, Color::Red, color),
        text.escape_debug()
    );
}

fn paint(text: &str, color: Color, enabled: bool) -> String {
    if enabled {
        text.with(color).bold().to_string()
    } else {
        text.to_string()
    }
}

fn print_tokens(source: Vec<u8>, color: bool) -> Lexer {
    let mut lexer = Lexer::new(source);
    loop {
        let token = lexer.scan();
        let kind = token.kind.to_string();
        let kind = if token.is(TokenKind::Error) {
            paint(&kind, Color::Red, color)
        } else {
            paint(&kind, Color::Cyan, color)
        };
        println!(
            "{:>4}:{:<3} {} '{}'",
            token.start.line,
            token.start.column,
            kind,
            String::from_utf8_lossy(lexer.raw(&token)).escape_debug()
        );
        if token.is(TokenKind::Eot) {
            return lexer;
        }
    }
}

// ===== Tree dump =====

fn line(lexer: &Lexer, depth: usize, name: &str, token: Option<&Token>) {
    let text = token
        .map(|token| {
            String::from_utf8_lossy(lexer.raw(token))
                .escape_debug()
                .to_string()
        })
        .unwrap_or_default();
    println!("{:indent$}{} '{}'", "", name, text, indent = depth * 2);
}

fn print_statement(lexer: &Lexer, statement: &Statement, depth: usize) {
    line(lexer, depth, statement.type_name(), Some(statement.token()));
    let depth = depth + 1;

    match statement {
        Statement::Expression { expr, .. } => print_expression(lexer, expr, depth),
        Statement::Assign { target, value, .. } => {
            print_expression(lexer, target, depth);
            print_optional(lexer, value.as_ref(), depth);
        }
        Statement::Block(block) => print_block(lexer, Some(block), depth),
        Statement::If {
            condition,
            body,
            else_branch,
            ..
        } => {
            print_optional(lexer, condition.as_ref(), depth);
            print_block(lexer, body.as_ref(), depth);
            if let Some(branch) = else_branch {
                print_else(lexer, branch, depth);
            }
        }
        Statement::While {
            condition: header,
            body,
            ..
        }
        | Statement::For {
            bindings: header,
            body,
            ..
        }
        | Statement::With {
            contexts: header,
            body,
            ..
        } => {
            print_optional(lexer, header.as_ref(), depth);
            print_block(lexer, body.as_ref(), depth);
        }
        Statement::Try {
            body,
            handlers,
            else_branch,
            lastly,
            ..
        } => {
            print_block(lexer, body.as_ref(), depth);
            for handler in handlers {
                line(lexer, depth, "Except", Some(&handler.token));
                print_optional(lexer, handler.captured.as_ref(), depth + 1);
                print_block(lexer, handler.body.as_ref(), depth + 1);
            }
            if let Some(branch) = else_branch {
                print_else(lexer, branch, depth);
            }
            if let Some(lastly) = lastly {
                line(lexer, depth, "Lastly", Some(&lastly.token));
                print_block(lexer, lastly.body.as_ref(), depth + 1);
            }
        }
        Statement::Except(handler) => {
            print_optional(lexer, handler.captured.as_ref(), depth);
            print_block(lexer, handler.body.as_ref(), depth);
        }
        Statement::Else(branch) => {
            if let Some(body) = &branch.body {
                print_statement(lexer, body, depth);
            }
        }
        Statement::Lastly(lastly) => print_block(lexer, lastly.body.as_ref(), depth),
        Statement::Class {
            name, bases, body, ..
        } => {
            if let Some(name) = name {
                line(lexer, depth, "Name", Some(name));
            }
            print_optional(lexer, bases.as_ref(), depth);
            print_block(lexer, body.as_ref(), depth);
        }
        Statement::Fn(function) => print_function(lexer, function, depth),
        Statement::Import(import) => print_optional(lexer, import.module.as_ref(), depth),
        Statement::From {
            package, import, ..
        } => {
            print_optional(lexer, package.as_ref(), depth);
            if let Some(import) = import {
                line(lexer, depth, "Import", Some(&import.token));
                print_optional(lexer, import.module.as_ref(), depth + 1);
            }
        }
        Statement::Return { value, .. }
        | Statement::Raise { value, .. }
        | Statement::Assert {
            condition: value, ..
        }
        | Statement::Global { names: value, .. }
        | Statement::NonLocal { names: value, .. }
        | Statement::Del { targets: value, .. } => print_optional(lexer, value.as_ref(), depth),
        Statement::Break(_) | Statement::Continue(_) | Statement::Invalid(_) => {}
    }
}

fn print_else(lexer: &Lexer, branch: &Else, depth: usize) {
    line(lexer, depth, "Else", Some(&branch.token));
    if let Some(body) = &branch.body {
        print_statement(lexer, body, depth + 1);
    }
}

fn print_block(lexer: &Lexer, block: Option<&Block>, depth: usize) {
    match block {
        Some(block) => {
            line(lexer, depth, "Block", Some(&block.token));
            for statement in &block.statements {
                print_statement(lexer, statement, depth + 1);
            }
        }
        None => line(lexer, depth, "<missing block>", None),
    }
}

fn print_function(lexer: &Lexer, function: &Function, depth: usize) {
    if let Some(name) = &function.name {
        line(lexer, depth, "Name", Some(name));
    }
    print_optional(lexer, function.params.as_ref(), depth);
    print_block(lexer, function.body.as_ref(), depth);
}

fn print_optional(lexer: &Lexer, expr: Option<&Expression>, depth: usize) {
    if let Some(expr) = expr {
        print_expression(lexer, expr, depth);
    }
}

fn print_expression(lexer: &Lexer, expr: &Expression, depth: usize) {
    line(lexer, depth, expr.type_name(), Some(expr.token()));
    let depth = depth + 1;

    match expr {
        Expression::Unary { operand, .. } => print_optional(lexer, operand.as_deref(), depth),
        Expression::Binary { left, right, .. } => {
            print_optional(lexer, left.as_deref(), depth);
            print_optional(lexer, right.as_deref(), depth);
        }
        Expression::IfElse {
            value,
            condition,
            otherwise,
            ..
        } => {
            print_expression(lexer, value, depth);
            print_optional(lexer, condition.as_deref(), depth);
            print_optional(lexer, otherwise.as_deref(), depth);
        }
        Expression::Container { entries, .. } => {
            print_optional(lexer, entries.as_deref(), depth);
        }
        Expression::Fn(function) => print_function(lexer, function, depth),
        Expression::Number(_)
        | Expression::String(_)
        | Expression::Identifier(_)
        | Expression::True(_)
        | Expression::False(_)
        | Expression::None(_) => {}
    }
}
