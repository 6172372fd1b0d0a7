//! Context-sensitive analysis.
//!
//! Walks an AST built (and owned) elsewhere, resolving identifiers
//! against a [`SymbolTable`] it builds as it goes, checking lvalue and
//! operand requirements, inserting the `Cast` nodes that materialize
//! promotions/conversions/narrowing assignments, and allocating an
//! `Address` for every declared object. Diagnoses into an
//! `acc_diagnostics::Reporter` rather than failing fast, so one pass
//! reports every problem in the program.

mod allocator;
mod convert;
mod error;
mod operators;

use std::rc::Rc;

use acc_ast::{Decl, DeclBody, DeclKind, Expr, ExprKind, Primary, PrimaryKind, Stmt, StmtKind, TranslationUnit};
use acc_diagnostics::{Reporter, Stage};
use acc_symbol::{ScopeId, SymbolTable};
use acc_types::{BasicKind, CType, Target};

pub use allocator::Allocator;
pub use error::AnalysisError;
pub use operators::{find_row, OpRow, BINARY_OP_TABLE};

pub struct Analyzer {
    pub table: SymbolTable,
    pub reporter: Reporter,
    target: Target,
}

impl Analyzer {
    pub fn new(target: Target) -> Self {
        Self { table: SymbolTable::new(), reporter: Reporter::new(), target }
    }

    fn error(&mut self, span: acc_source::Span, error: AnalysisError) {
        self.reporter.report(Stage::Analysis, span, error.to_string(), None);
    }

    pub fn analyze(&mut self, unit: &mut TranslationUnit) {
        let root = self.table.root();
        let mut allocator = Allocator::translation_unit();
        for decl in &mut unit.decls {
            self.walk_decl(decl, root, &mut allocator);
        }
    }

    // --- Declarations -----------------------------------------------

    fn walk_decl(&mut self, decl: &mut Decl, scope: ScopeId, allocator: &mut Allocator) {
        let Some(name) = decl.identifier.clone() else {
            return;
        };

        if self.table.is_declared_locally(scope, &name) {
            self.error(decl.span, AnalysisError::PreviouslyDeclared { name });
            return;
        }

        let symbol = self.table.put(scope, name, decl.ty.clone());
        decl.resolved_symbol = Some(symbol);

        if decl.is_function() {
            self.walk_decl_function(decl, scope);
        } else {
            self.walk_decl_object(decl, scope, allocator, symbol);
        }
    }

    fn walk_decl_function(&mut self, decl: &mut Decl, scope: ScopeId) {
        if let DeclBody::Body(stmts) = &mut decl.body {
            let body_scope = self.table.push_scope(scope);
            let mut function_allocator = Allocator::function_body();
            for stmt in stmts {
                self.walk_stmt(stmt, body_scope, &mut function_allocator);
            }
        }
    }

    fn walk_decl_object(
        &mut self,
        decl: &mut Decl,
        scope: ScopeId,
        allocator: &mut Allocator,
        symbol: acc_symbol::SymbolId,
    ) {
        let address = allocator.allocate(&decl.ty, &self.target);
        self.table.set_address(symbol, address);

        if let DeclBody::Initializer(init) = &mut decl.body {
            let ty = self.walk_expr(init, scope, false);
            if let Some(ty) = ty {
                if !convert::assign_cast(init, &decl.ty, &ty) {
                    self.error(
                        decl.span,
                        AnalysisError::InvalidInitializer { right: ty.describe(), left: decl.ty.describe() },
                    );
                }
            }
        }
    }

    // --- Statements ---------------------------------------------------

    fn walk_stmt(&mut self, stmt: &mut Stmt, scope: ScopeId, allocator: &mut Allocator) {
        match &mut stmt.kind {
            StmtKind::Decl(decl) => self.walk_decl(decl, scope, allocator),
            StmtKind::Expr(expr) => {
                self.walk_expr(expr, scope, false);
            }
            StmtKind::Block(stmts) => {
                let block_scope = self.table.push_scope(scope);
                for s in stmts {
                    self.walk_stmt(s, block_scope, allocator);
                }
            }
            StmtKind::While { cond, body } => {
                self.walk_expr(cond, scope, false);
                self.walk_stmt(body, scope, allocator);
            }
            StmtKind::If { cond, then_branch, else_branch } => {
                self.walk_expr(cond, scope, false);
                self.walk_stmt(then_branch, scope, allocator);
                if let Some(else_branch) = else_branch {
                    self.walk_stmt(else_branch, scope, allocator);
                }
            }
            StmtKind::Return { value } => {
                if let Some(value) = value {
                    self.walk_expr(value, scope, false);
                }
            }
        }
    }

    // --- Expressions ----------------------------------------------------

    fn walk_expr(&mut self, expr: &mut Expr, scope: ScopeId, need_lvalue: bool) -> Option<Rc<CType>> {
        let ty = match &mut expr.kind {
            ExprKind::Primary(primary) => self.walk_primary(primary, scope, expr.span, need_lvalue),
            ExprKind::Assign { left, right } => self.walk_assign(left, right, scope, expr.span, need_lvalue),
            ExprKind::Unary { op, right } => self.walk_unary(*op, right, scope, expr.span),
            ExprKind::Postfix { op, left, args, index } => {
                self.walk_postfix(*op, left, args, index, scope, expr.span)
            }
            ExprKind::Binary { op, left, right } => self.walk_binary(*op, left, right, scope, expr.span, need_lvalue),
            ExprKind::Tertiary { cond, then_branch, else_branch } => {
                self.walk_tertiary(cond, then_branch, else_branch, scope, expr.span, need_lvalue)
            }
            ExprKind::Cast { to, right } => {
                if need_lvalue {
                    self.error(expr.span, AnalysisError::InvalidLvalue);
                }
                self.walk_expr(right, scope, false);
                Some(to.clone())
            }
        };
        expr.ty = ty.clone();
        ty
    }

    fn walk_primary(
        &mut self,
        primary: &mut Primary,
        scope: ScopeId,
        span: acc_source::Span,
        need_lvalue: bool,
    ) -> Option<Rc<CType>> {
        match &primary.kind {
            PrimaryKind::Constant(_) => {
                if need_lvalue {
                    self.error(span, AnalysisError::InvalidLvalue);
                }
                Some(Rc::new(CType::basic(BasicKind::SignedInt)))
            }
            PrimaryKind::StringLiteral(_) => {
                if need_lvalue {
                    self.error(span, AnalysisError::InvalidLvalue);
                }
                Some(Rc::new(CType::pointer_to(Rc::new(CType::basic(BasicKind::UnsignedChar)))))
            }
            PrimaryKind::Identifier(name) => match self.table.get(scope, name, true) {
                Some(symbol) => {
                    primary.resolved_symbol = Some(symbol);
                    Some(self.table.symbol(symbol).ty.clone())
                }
                None => {
                    self.error(span, AnalysisError::UndeclaredIdentifier { name: name.clone() });
                    None
                }
            },
        }
    }

    fn walk_assign(
        &mut self,
        left: &mut Expr,
        right: &mut Expr,
        scope: ScopeId,
        span: acc_source::Span,
        need_lvalue: bool,
    ) -> Option<Rc<CType>> {
        if need_lvalue {
            self.error(span, AnalysisError::InvalidLvalue);
        }
        let left_ty = self.walk_expr(left, scope, true);
        let right_ty = self.walk_expr(right, scope, false);
        let (left_ty, right_ty) = (left_ty?, right_ty?);

        if !convert::assign_cast(right, &left_ty, &right_ty) {
            self.error(
                span,
                AnalysisError::IncompatibleAssignment { right: right_ty.describe(), left: left_ty.describe() },
            );
        }
        Some(left_ty)
    }

    fn walk_unary(
        &mut self,
        op: acc_ast::UnaryOp,
        right: &mut Expr,
        scope: ScopeId,
        span: acc_source::Span,
    ) -> Option<Rc<CType>> {
        use acc_ast::UnaryOp::*;

        let ty = self.walk_expr(right, scope, false)?;
        match op {
            Deref => match &ty.shape {
                acc_types::Shape::Pointer(child) => Some(child.clone()),
                _ => {
                    self.error(span, AnalysisError::InvalidPointerDereference);
                    None
                }
            },
            AddressOf => Some(Rc::new(CType::pointer_to(ty))),
            Plus | Neg | BitNot | LogicalNot => {
                if !ty.is_arithmetic() {
                    self.error(span, AnalysisError::InvalidUnaryOperand { op: op.spelling() });
                }
                Some(ty)
            }
        }
    }

    fn walk_postfix(
        &mut self,
        op: acc_ast::PostfixOp,
        left: &mut Expr,
        args: &mut [Expr],
        index: &mut Option<Box<Expr>>,
        scope: ScopeId,
        span: acc_source::Span,
    ) -> Option<Rc<CType>> {
        use acc_ast::PostfixOp::*;

        let callee_ty = self.walk_expr(left, scope, false)?;
        match op {
            Call => match &callee_ty.shape {
                acc_types::Shape::Function(ret, params) => {
                    let params = params.clone();
                    let ret = ret.clone();
                    self.walk_argument_list(&params, args, scope, span);
                    Some(ret)
                }
                _ => {
                    self.error(span, AnalysisError::NotAFunction);
                    None
                }
            },
            Index => {
                let index_expr = index.as_mut()?;
                let index_ty = self.walk_expr(index_expr, scope, false)?;
                match &callee_ty.shape {
                    acc_types::Shape::Pointer(child) | acc_types::Shape::Array(child, _)
                        if index_ty.is_arithmetic() =>
                    {
                        Some(child.clone())
                    }
                    _ => {
                        self.error(span, AnalysisError::InvalidSubscriptOperand);
                        None
                    }
                }
            }
        }
    }

    fn walk_argument_list(
        &mut self,
        params: &[acc_types::Param],
        args: &mut [Expr],
        scope: ScopeId,
        span: acc_source::Span,
    ) {
        for (param, arg) in params.iter().zip(args.iter_mut()) {
            if let Some(arg_ty) = self.walk_expr(arg, scope, false) {
                if !convert::assign_cast(arg, &param.ty, &arg_ty) {
                    self.error(
                        span,
                        AnalysisError::IncompatibleArgument { arg: arg_ty.describe(), param: param.ty.describe() },
                    );
                }
            }
        }

        if params.len() != args.len() {
            self.error(span, AnalysisError::ArityMismatch { expected: params.len(), got: args.len() });
        }
    }

    fn walk_binary(
        &mut self,
        op: acc_ast::BinaryOp,
        left: &mut Expr,
        right: &mut Expr,
        scope: ScopeId,
        span: acc_source::Span,
        need_lvalue: bool,
    ) -> Option<Rc<CType>> {
        if need_lvalue {
            self.error(span, AnalysisError::InvalidLvalue);
        }

        let mut left_ty = self.walk_expr(left, scope, false)?;
        let mut right_ty = self.walk_expr(right, scope, false)?;

        if !left_ty.is_scalar() || !right_ty.is_scalar() {
            self.error(span, AnalysisError::InvalidBinaryOperand { op: op.spelling() });
            return None;
        }

        let Some(row) = find_row(op, left_ty.is_basic(), right_ty.is_basic()) else {
            self.error(span, AnalysisError::InvalidBinaryOperand { op: op.spelling() });
            return None;
        };

        if row.left_basic && row.right_basic {
            if row.compatible {
                left_ty = convert::integer_promote(left, left_ty);
                right_ty = convert::integer_promote(right, right_ty);
                let common = convert::usual_arithmetic_conversion(left, left_ty, right, right_ty);
                return Some(row.fixed.map(|k| Rc::new(CType::basic(k))).unwrap_or(common));
            }
            return Some(row.fixed.map(|k| Rc::new(CType::basic(k))).unwrap_or(left_ty));
        }

        if !row.left_basic && !row.right_basic {
            if row.compatible && !CType::pointers_compatible(&left_ty, &right_ty) {
                self.error(span, AnalysisError::InvalidBinaryOperand { op: op.spelling() });
                return None;
            }
            return row.fixed.map(|k| Rc::new(CType::basic(k)));
        }

        // Mixed: exactly one side is basic, the other a pointer.
        Some(row.fixed.map(|k| Rc::new(CType::basic(k))).unwrap_or_else(|| {
            if row.left_basic {
                right_ty.clone()
            } else {
                left_ty.clone()
            }
        }))
    }

    fn walk_tertiary(
        &mut self,
        cond: &mut Expr,
        then_branch: &mut Expr,
        else_branch: &mut Expr,
        scope: ScopeId,
        span: acc_source::Span,
        need_lvalue: bool,
    ) -> Option<Rc<CType>> {
        if need_lvalue {
            self.error(span, AnalysisError::InvalidLvalue);
        }
        self.walk_expr(cond, scope, false)?;
        let then_ty = self.walk_expr(then_branch, scope, false)?;
        let else_ty = self.walk_expr(else_branch, scope, false)?;

        if (then_ty.is_basic() && else_ty.is_basic()) || (then_ty.is_pointer() && else_ty.is_pointer()) {
            Some(then_ty)
        } else {
            self.error(span, AnalysisError::InvalidTertiaryTypes);
            None
        }
    }
}
