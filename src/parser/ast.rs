// AST (Abstract Syntax Tree) definitions for rattle programs
//
// Every node owns its children exclusively. Children that may be missing
// because of a syntax error are `Option`s; a missing child never stops the
// parent from being built.

use crate::parser::lexer::{Token, TokenKind};

/// Prefix operators, plus the recovery form built around an error token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Plus,
    Minus,
    Invert,
    Not,
    Yield,
    Invalid,
}

/// Infix operators, including access forms and separators
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    // Arithmetic
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    At,
    // Bitwise
    Lshift,
    Rshift,
    BitAnd,
    BitOr,
    Xor,
    // Comparison
    Less,
    LessEqual,
    Greater,
    GreaterEqual,
    EqualEqual,
    NotEqual,
    In,
    NotIn,
    Is,
    IsNot,
    // Logical
    And,
    Or,
    // Access
    Dot,
    Call,
    Subscript,
    As,
    /// `,` or `:` between two (possibly absent) items
    Separator,
    /// Built around an error token or a malformed `not in`
    Invalid,
}

impl BinaryOp {
    pub fn name(self) -> &'static str {
        match self {
            BinaryOp::Plus => "Plus",
            BinaryOp::Minus => "Minus",
            BinaryOp::Star => "Star",
            BinaryOp::Slash => "Slash",
            BinaryOp::Percent => "Percent",
            BinaryOp::At => "At",
            BinaryOp::Lshift => "Lshift",
            BinaryOp::Rshift => "Rshift",
            BinaryOp::BitAnd => "BitAnd",
            BinaryOp::BitOr => "BitOr",
            BinaryOp::Xor => "Xor",
            BinaryOp::Less => "Less",
            BinaryOp::LessEqual => "LessEqual",
            BinaryOp::Greater => "Greater",
            BinaryOp::GreaterEqual => "GreaterEqual",
            BinaryOp::EqualEqual => "EqualEqual",
            BinaryOp::NotEqual => "NotEqual",
            BinaryOp::In => "In",
            BinaryOp::NotIn => "NotIn",
            BinaryOp::Is => "Is",
            BinaryOp::IsNot => "IsNot",
            BinaryOp::And => "And",
            BinaryOp::Or => "Or",
            BinaryOp::Dot => "Dot",
            BinaryOp::Call => "Call",
            BinaryOp::Subscript => "Subscript",
            BinaryOp::As => "As",
            BinaryOp::Separator => "Separator",
            BinaryOp::Invalid => "BinaryExpr",
        }
    }
}

/// Assignment operators: `=` and the twelve compound forms
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    At,
    BitAnd,
    BitOr,
    Xor,
    Invert,
    Lshift,
    Rshift,
}

impl AssignOp {
    pub fn from_token(kind: TokenKind) -> Option<Self> {
        let op = match kind {
            TokenKind::Equal => AssignOp::Assign,
            TokenKind::PlusEqual => AssignOp::Plus,
            TokenKind::MinusEqual => AssignOp::Minus,
            TokenKind::StarEqual => AssignOp::Star,
            TokenKind::SlashEqual => AssignOp::Slash,
            TokenKind::PercentEqual => AssignOp::Percent,
            TokenKind::AtEqual => AssignOp::At,
            TokenKind::BitAndEqual => AssignOp::BitAnd,
            TokenKind::BitOrEqual => AssignOp::BitOr,
            TokenKind::XorEqual => AssignOp::Xor,
            TokenKind::InvertEqual => AssignOp::Invert,
            TokenKind::LshiftEqual => AssignOp::Lshift,
            TokenKind::RshiftEqual => AssignOp::Rshift,
            _ => return None,
        };
        Some(op)
    }

    pub fn name(self) -> &'static str {
        match self {
            AssignOp::Assign => "Equal",
            AssignOp::Plus => "PlusEqual",
            AssignOp::Minus => "MinusEqual",
            AssignOp::Star => "StarEqual",
            AssignOp::Slash => "SlashEqual",
            AssignOp::Percent => "PercentEqual",
            AssignOp::At => "AtEqual",
            AssignOp::BitAnd => "BitAndEqual",
            AssignOp::BitOr => "BitOrEqual",
            AssignOp::Xor => "XorEqual",
            AssignOp::Invert => "InvertEqual",
            AssignOp::Lshift => "LshiftEqual",
            AssignOp::Rshift => "RshiftEqual",
        }
    }
}

/// Which literal a bracketed form turned out to be
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerKind {
    Group, // (x)
    Tuple, // (), (x,), (x, y)
    List,  // [...]
    Dict,  // {}, {k: v, ...}
    Set,   // {x, y}
}

/// Named or anonymous function: `fn name(params) { body }`
#[derive(Debug, Clone, PartialEq)]
pub struct Function {
    pub token: Token, // the `fn` keyword
    pub name: Option<Token>,
    pub params: Option<Expression>,
    pub body: Option<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Number(Token),
    String(Token),
    Identifier(Token),
    True(Token),
    False(Token),
    None(Token),
    Unary {
        op: UnaryOp,
        token: Token,
        operand: Option<Box<Expression>>,
    },
    Binary {
        op: BinaryOp,
        token: Token,
        left: Option<Box<Expression>>,
        right: Option<Box<Expression>>,
    },
    /// `value if condition else otherwise`
    IfElse {
        token: Token,
        value: Box<Expression>,
        condition: Option<Box<Expression>>,
        otherwise: Option<Box<Expression>>,
    },
    Container {
        kind: ContainerKind,
        token: Token,
        entries: Option<Box<Expression>>,
    },
    Fn(Box<Function>),
}

impl Expression {
    /// Token the node was built around
    pub fn token(&self) -> &Token {
        match self {
            Expression::Number(token)
            | Expression::String(token)
            | Expression::Identifier(token)
            | Expression::True(token)
            | Expression::False(token)
            | Expression::None(token)
            | Expression::Unary { token, .. }
            | Expression::Binary { token, .. }
            | Expression::IfElse { token, .. }
            | Expression::Container { token, .. } => token,
            Expression::Fn(function) => &function.token,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Expression::Number(_) => "Number",
            Expression::String(_) => "String",
            Expression::Identifier(_) => "Identifier",
            Expression::True(_) => "True",
            Expression::False(_) => "False",
            Expression::None(_) => "None",
            Expression::Unary { op, .. } => match op {
                UnaryOp::Plus => "UnaryPlus",
                UnaryOp::Minus => "UnaryMinus",
                UnaryOp::Invert => "Invert",
                UnaryOp::Not => "Not",
                UnaryOp::Yield => "Yield",
                UnaryOp::Invalid => "UnaryExpr",
            },
            Expression::Binary { op, .. } => op.name(),
            Expression::IfElse { .. } => "IfElse",
            Expression::Container { kind, .. } => match kind {
                ContainerKind::Group => "Group",
                ContainerKind::Tuple => "Tuple",
                ContainerKind::List => "List",
                ContainerKind::Dict => "Dict",
                ContainerKind::Set => "Set",
            },
            Expression::Fn(_) => "Fn",
        }
    }

    /// True for a `,` separator node
    pub fn is_comma(&self) -> bool {
        self.is_separator(TokenKind::Comma)
    }

    /// True for a `:` separator node
    pub fn is_colon(&self) -> bool {
        self.is_separator(TokenKind::Colon)
    }

    fn is_separator(&self, kind: TokenKind) -> bool {
        matches!(
            self,
            Expression::Binary { op: BinaryOp::Separator, token, .. } if token.kind == kind
        )
    }

    /// Items of a comma-separated list in source order. A non-comma node is
    /// a list of one; absent items are skipped.
    pub fn comma_items(&self) -> Vec<&Expression> {
        let mut items = Vec::new();
        collect_comma_items(self, &mut items);
        items
    }
}

fn collect_comma_items<'a>(expr: &'a Expression, items: &mut Vec<&'a Expression>) {
    match expr {
        Expression::Binary {
            op: BinaryOp::Separator,
            token,
            left,
            right,
        } if token.kind == TokenKind::Comma => {
            if let Some(left) = left {
                collect_comma_items(left, items);
            }
            if let Some(right) = right {
                collect_comma_items(right, items);
            }
        }
        _ => items.push(expr),
    }
}

/// `{ statements }`
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    pub token: Token, // the opening brace
    pub statements: Vec<Statement>,
}

/// `else` clause. The body is a block, or an `if` statement for `else if`.
#[derive(Debug, Clone, PartialEq)]
pub struct Else {
    pub token: Token,
    pub body: Option<Box<Statement>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Except {
    pub token: Token,
    pub captured: Option<Expression>,
    pub body: Option<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Lastly {
    pub token: Token,
    pub body: Option<Block>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Import {
    pub token: Token,
    pub module: Option<Expression>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// An expression used as a statement. `terminator` is the token that
    /// ended it (newline, `;`, `}` or end of input, or whatever was found
    /// instead); [`Statement::token`] is the expression's own token.
    Expression {
        terminator: Token,
        expr: Expression,
    },
    Assign {
        op: AssignOp,
        token: Token,
        target: Expression,
        value: Option<Expression>,
    },
    Block(Block),
    If {
        token: Token,
        condition: Option<Expression>,
        body: Option<Block>,
        else_branch: Option<Else>,
    },
    While {
        token: Token,
        condition: Option<Expression>,
        body: Option<Block>,
    },
    For {
        token: Token,
        bindings: Option<Expression>,
        body: Option<Block>,
    },
    Try {
        token: Token,
        body: Option<Block>,
        handlers: Vec<Except>,
        else_branch: Option<Else>,
        lastly: Option<Lastly>,
    },
    Except(Except),
    Else(Else),
    Lastly(Lastly),
    With {
        token: Token,
        contexts: Option<Expression>,
        body: Option<Block>,
    },
    Class {
        token: Token,
        name: Option<Token>,
        bases: Option<Expression>,
        body: Option<Block>,
    },
    Fn(Function),
    Return {
        token: Token,
        value: Option<Expression>,
    },
    Raise {
        token: Token,
        value: Option<Expression>,
    },
    Import(Import),
    From {
        token: Token,
        package: Option<Expression>,
        import: Option<Import>,
    },
    Assert {
        token: Token,
        condition: Option<Expression>,
    },
    Global {
        token: Token,
        names: Option<Expression>,
    },
    NonLocal {
        token: Token,
        names: Option<Expression>,
    },
    Del {
        token: Token,
        targets: Option<Expression>,
    },
    Break(Token),
    Continue(Token),
    /// A token no statement can start with
    Invalid(Token),
}

impl Statement {
    /// Token that introduced the statement
    pub fn token(&self) -> &Token {
        match self {
            Statement::Expression { expr, .. } => expr.token(),
            Statement::Assign { token, .. }
            | Statement::If { token, .. }
            | Statement::While { token, .. }
            | Statement::For { token, .. }
            | Statement::Try { token, .. }
            | Statement::With { token, .. }
            | Statement::Class { token, .. }
            | Statement::Return { token, .. }
            | Statement::Raise { token, .. }
            | Statement::From { token, .. }
            | Statement::Assert { token, .. }
            | Statement::Global { token, .. }
            | Statement::NonLocal { token, .. }
            | Statement::Del { token, .. } => token,
            Statement::Block(block) => &block.token,
            Statement::Except(except) => &except.token,
            Statement::Else(branch) => &branch.token,
            Statement::Lastly(lastly) => &lastly.token,
            Statement::Fn(function) => &function.token,
            Statement::Import(import) => &import.token,
            Statement::Break(token)
            | Statement::Continue(token)
            | Statement::Invalid(token) => token,
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Statement::Expression { .. } => "ExprStatement",
            Statement::Assign { op, .. } => op.name(),
            Statement::Block(_) => "Block",
            Statement::If { .. } => "If",
            Statement::While { .. } => "While",
            Statement::For { .. } => "For",
            Statement::Try { .. } => "Try",
            Statement::Except(_) => "Except",
            Statement::Else(_) => "Else",
            Statement::Lastly(_) => "Lastly",
            Statement::With { .. } => "With",
            Statement::Class { .. } => "Class",
            Statement::Fn(_) => "Fn",
            Statement::Return { .. } => "Return",
            Statement::Raise { .. } => "Raise",
            Statement::Import(_) => "Import",
            Statement::From { .. } => "From",
            Statement::Assert { .. } => "Assert",
            Statement::Global { .. } => "Global",
            Statement::NonLocal { .. } => "NonLocal",
            Statement::Del { .. } => "Del",
            Statement::Break(_) => "Break",
            Statement::Continue(_) => "Continue",
            Statement::Invalid(_) => "Invalid",
        }
    }
}
