//! Owned abstract syntax tree for Vela source units.
//!
//! Declarations and expressions are plain owned values so that
//! lazily-materialized pieces (function bodies, member lists) can be
//! handed across the parser's checkpoint boundary without tying them to
//! an arena lifetime.

mod decl;
mod expr;

pub use decl::{
    Decl, DeclId, DeclKind, FieldDecl, FunctionBody, FunctionDecl, Members, Param, SourceUnit,
    TopLevelCodeDecl, TypeDecl,
};
pub use expr::{BinOp, Block, ClosureParam, Expr, ExprKind, Stmt, StmtKind, UnaryOp};

use super::{Name, Span};

/// A parsed type annotation.
#[derive(Clone, Debug, PartialEq)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

/// Kind of a parsed type annotation.
#[derive(Clone, Debug, PartialEq)]
pub enum TypeExprKind {
    /// A named type, e.g. `Int` or `Point`.
    Named(Name),
}
