//! Abstract syntax tree produced by [`crate::parser::Parser`].
//!
//! Split by tree level, the way the data model describes it: declarations,
//! statements, expressions, type nodes. Every `Expr`/`TypeNode` carries an
//! interior-mutable `resolved`/`resolved_type` slot the checker fills
//! exactly once; every other node is immutable once built.

pub mod decl;
pub mod expr;
pub mod stmt;
pub mod ty;

pub use decl::{Decl, ExternDeclaration, FunctionDeclaration, Parameter, StructDeclaration};
pub use expr::{BinaryOp, CallArgument, Expr, ExprKind, UnaryOp};
pub use stmt::{Block, Clause, Stmt, StmtKind};
pub use ty::{TypeNode, TypeNodeKind};

/// A parsed compilation unit: the ordered top-level declaration list.
#[derive(Debug, Default)]
pub struct Program {
    pub declarations: Vec<Decl>,
}
