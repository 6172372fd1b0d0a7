use acc_source::Span;

use crate::decl::Decl;
use crate::expr::Expr;

#[derive(Debug, Clone)]
pub enum StmtKind {
    Decl(Decl),
    Expr(Expr),
    Block(Vec<Stmt>),
    While { cond: Expr, body: Box<Stmt> },
    If { cond: Expr, then_branch: Box<Stmt>, else_branch: Option<Box<Stmt>> },
    Return { value: Option<Expr> },
}

#[derive(Debug, Clone)]
pub struct Stmt {
    pub kind: StmtKind,
    pub span: Span,
}

impl Stmt {
    pub fn new(kind: StmtKind, span: Span) -> Self {
        Self { kind, span }
    }
}
