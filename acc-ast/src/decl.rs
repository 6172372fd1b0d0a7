use std::rc::Rc;

use acc_source::Span;
use acc_symbol::SymbolId;
use acc_types::CType;

use crate::expr::Expr;
use crate::stmt::Stmt;

/// Concrete declarators are tied to an identifier (`int a;`); abstract
/// declarators appear in casts and parameter lists (`void (int*)`) and
/// never bind a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclKind {
    Concrete,
    Abstract,
}

/// What follows a declarator: nothing, an initializer expression (for
/// an object), or a function body. A declaration can have only one of
/// these, mirroring the source AST's anonymous union of
/// `initializer`/`body`.
#[derive(Debug, Clone)]
pub enum DeclBody {
    None,
    Initializer(Expr),
    Body(Vec<Stmt>),
}

/// A single declarator. Comma-separated declarations (`int a = 1, *b;`)
/// are represented as siblings in the enclosing list (translation unit,
/// block, or parameter list) rather than as a `next` chain, since every
/// place the source threads declarations through `next` is already a
/// list in this tree.
#[derive(Debug, Clone)]
pub struct Decl {
    pub kind: DeclKind,
    pub ty: Rc<CType>,
    pub identifier: Option<String>,
    pub body: DeclBody,
    pub resolved_symbol: Option<SymbolId>,
    pub span: Span,
}

impl Decl {
    pub fn new(kind: DeclKind, ty: Rc<CType>, identifier: Option<String>, body: DeclBody, span: Span) -> Self {
        Self { kind, ty, identifier, body, resolved_symbol: None, span }
    }

    pub fn is_function(&self) -> bool {
        self.ty.is_function()
    }
}
