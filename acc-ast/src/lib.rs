//! Abstract syntax tree node families: expressions, declarations, and
//! statements.
//!
//! The source grammar threads each of these through singly-linked
//! `next` chains; here every such chain is just a `Vec` at the position
//! where the chain would start (translation unit, block body, parameter
//! list). Nodes don't own their children's children across passes —
//! the analyzer mutates this tree in place (attaching resolved symbols
//! and inserting `Cast` nodes), so ownership stays a plain tree rather
//! than anything requiring interior mutability.

pub mod decl;
pub mod expr;
pub mod ops;
pub mod stmt;

pub use decl::{Decl, DeclBody, DeclKind};
pub use expr::{Expr, ExprKind, Primary, PrimaryKind};
pub use ops::{BinaryOp, PostfixOp, UnaryOp};
pub use stmt::{Stmt, StmtKind};

/// The root of one source file: an ordered list of top-level
/// declarations (object definitions, function definitions, and
/// prototypes).
#[derive(Debug, Clone, Default)]
pub struct TranslationUnit {
    pub decls: Vec<Decl>,
}

impl TranslationUnit {
    pub fn new(decls: Vec<Decl>) -> Self {
        Self { decls }
    }
}
