use std::rc::Rc;

use acc_source::Span;
use acc_symbol::SymbolId;
use acc_types::CType;

use crate::ops::{BinaryOp, PostfixOp, UnaryOp};

/// The three things a `Primary` can be before resolution, plus the
/// symbol it resolves to afterward. An identifier starts as
/// `Identifier` and keeps that shape; `resolved` is filled in alongside
/// it by the analyzer rather than replacing the node, since later
/// passes still want the source name for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimaryKind {
    Identifier(String),
    Constant(i64),
    StringLiteral(String),
}

#[derive(Debug, Clone)]
pub struct Primary {
    pub kind: PrimaryKind,
    pub resolved_symbol: Option<SymbolId>,
}

#[derive(Debug, Clone)]
pub enum ExprKind {
    Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
    Unary { op: UnaryOp, right: Box<Expr> },
    Postfix { op: PostfixOp, left: Box<Expr>, args: Vec<Expr>, index: Option<Box<Expr>> },
    Primary(Primary),
    Cast { to: Rc<CType>, right: Box<Expr> },
    Tertiary { cond: Box<Expr>, then_branch: Box<Expr>, else_branch: Box<Expr> },
    Assign { left: Box<Expr>, right: Box<Expr> },
}

/// An expression node. `ty` is `None` until the analyzer walks it;
/// every entry point into analysis fills it in with the expression's
/// resulting type before returning.
#[derive(Debug, Clone)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
    pub ty: Option<Rc<CType>>,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span, ty: None }
    }

    pub fn identifier(name: impl Into<String>, span: Span) -> Self {
        Self::new(
            ExprKind::Primary(Primary { kind: PrimaryKind::Identifier(name.into()), resolved_symbol: None }),
            span,
        )
    }

    pub fn constant(value: i64, span: Span) -> Self {
        Self::new(ExprKind::Primary(Primary { kind: PrimaryKind::Constant(value), resolved_symbol: None }), span)
    }

    pub fn string_literal(value: impl Into<String>, span: Span) -> Self {
        Self::new(
            ExprKind::Primary(Primary { kind: PrimaryKind::StringLiteral(value.into()), resolved_symbol: None }),
            span,
        )
    }

    /// Wrap this expression in an inserted `Cast` to `to`, at the same
    /// span — used by the analyzer to materialize promotions and
    /// conversions as real nodes rather than implicit annotations.
    pub fn wrap_in_cast(self, to: Rc<CType>) -> Self {
        let span = self.span;
        Expr::new(ExprKind::Cast { to, right: Box::new(self) }, span)
    }

    pub fn is_lvalue_candidate(&self) -> bool {
        !matches!(
            self.kind,
            ExprKind::Primary(Primary { kind: PrimaryKind::Constant(_) | PrimaryKind::StringLiteral(_), .. })
        )
    }
}
