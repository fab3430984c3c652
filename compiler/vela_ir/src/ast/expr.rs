//! Expressions, statements, and blocks.

use super::TypeExpr;
use crate::{Name, Span};

/// A braced statement sequence.
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub stmts: Vec<Stmt>,
    pub span: Span,
}

/// A statement.
#[derive(Clone, Debug, PartialEq)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

/// Kind of statement.
#[derive(Clone, Debug, PartialEq)]
pub enum StmtKind {
    /// `let [mut] name [: Type] = init`
    Let {
        name: Name,
        mutable: bool,
        ty: Option<TypeExpr>,
        init: Expr,
    },
    /// `return [expr]`
    Return(Option<Expr>),
    /// An expression evaluated for effect.
    Expr(Expr),
}

/// An expression.
#[derive(Clone, Debug, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

/// Kind of expression.
#[derive(Clone, Debug, PartialEq)]
pub enum ExprKind {
    Int(i64),
    Str(Name),
    Bool(bool),
    Ident(Name),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Field {
        receiver: Box<Expr>,
        field: Name,
    },
    Paren(Box<Expr>),
    If {
        cond: Box<Expr>,
        then_block: Block,
        else_block: Option<Block>,
    },
    Block(Block),
    /// `|params| body`. The discriminator distinguishes anonymous
    /// closures within their enclosing declaration context; closures in
    /// top-level code draw from the file-wide top-level context so that
    /// independently-resumed chunks never collide.
    Closure {
        params: Vec<ClosureParam>,
        body: Box<Expr>,
        discriminator: u32,
    },
}

/// A closure parameter (untyped).
#[derive(Clone, Debug, PartialEq)]
pub struct ClosureParam {
    pub name: Name,
    pub span: Span,
}

/// Unary operator.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Not,
}

/// Binary operator.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Eq,
    NotEq,
    Lt,
    Gt,
    And,
    Or,
}
