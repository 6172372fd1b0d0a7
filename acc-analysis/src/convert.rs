use std::rc::Rc;

use acc_ast::Expr;
use acc_types::{BasicKind, CType, Shape};

fn signed_int_rank() -> u8 {
    BasicKind::SignedInt.rank().expect("signed int always has a rank")
}

/// Integer promotion (ISO C 6.3.1.1p2): any basic operand ranked below
/// `signed int` is widened to `signed int`, materialized as an inserted
/// `Cast` node. `int`, `long`, and `void` are left untouched.
pub fn integer_promote(expr: &mut Expr, ty: Rc<CType>) -> Rc<CType> {
    if !matches!(ty.shape, Shape::Basic(_)) {
        return ty;
    }
    match ty.rank() {
        Some(rank) if rank < signed_int_rank() => {
            let target = Rc::new(CType::basic(BasicKind::SignedInt));
            take_and_wrap_in_cast(expr, target.clone());
            target
        }
        _ => ty,
    }
}

/// The usual arithmetic conversions (ISO C 6.3.1.8), restricted to the
/// two basic operands already promoted by [`integer_promote`]. Equal
/// types need no conversion; otherwise the lower-ranked side is cast up
/// to the higher-ranked type.
pub fn usual_arithmetic_conversion(
    left_expr: &mut Expr,
    left: Rc<CType>,
    right_expr: &mut Expr,
    right: Rc<CType>,
) -> Rc<CType> {
    if left == right {
        return left;
    }
    let left_rank = left.rank().unwrap_or(0);
    let right_rank = right.rank().unwrap_or(0);
    if left_rank < right_rank {
        take_and_wrap_in_cast(left_expr, right.clone());
        right
    } else {
        take_and_wrap_in_cast(right_expr, left.clone());
        left
    }
}

/// Whether `right` can be assigned to a location of type `left`,
/// inserting a narrowing cast node on `right_expr` where the source
/// compiler would (different basic specifiers under equal pointer
/// depth). Function types succeed unconditionally (prototype
/// equivalence is assumed, not checked); anything that isn't basic or
/// function on both sides after unwinding shared pointer depth fails.
pub fn assign_cast(right_expr: &mut Expr, left: &Rc<CType>, right: &Rc<CType>) -> bool {
    let mut l = left.clone();
    let mut r = right.clone();
    loop {
        match (&l.shape, &r.shape) {
            (Shape::Pointer(lc), Shape::Pointer(rc)) => {
                l = lc.clone();
                r = rc.clone();
            }
            _ => break,
        }
    }

    match (&l.shape, &r.shape) {
        (Shape::Basic(lk), Shape::Basic(rk)) => {
            if lk != rk {
                take_and_wrap_in_cast(right_expr, left.clone());
            }
            true
        }
        (Shape::Function(..), Shape::Function(..)) => true,
        _ => false,
    }
}

/// Swap `expr` out for a placeholder, then wrap the original in a cast
/// to `target` and write it back — the borrow-checker-friendly way to
/// turn `*expr = expr.take().wrap_in_cast(target)` into one statement
/// without requiring `Expr: Default`.
fn take_and_wrap_in_cast(expr: &mut Expr, target: Rc<CType>) {
    let placeholder = Expr::constant(0, expr.span);
    let original = std::mem::replace(expr, placeholder);
    *expr = original.wrap_in_cast(target);
}

#[cfg(test)]
mod tests {
    use acc_source::{Position, Span};
    use acc_types::Param;

    use super::*;

    fn span() -> Span {
        Span::new(Position::new(1, 1))
    }

    #[test]
    fn promotes_short_to_int_but_not_int_or_long() {
        let mut e = Expr::identifier("x", span());
        let short_ty = Rc::new(CType::basic(BasicKind::SignedShortInt));
        let promoted = integer_promote(&mut e, short_ty);
        assert_eq!(promoted, Rc::new(CType::basic(BasicKind::SignedInt)));
        assert!(matches!(e.kind, acc_ast::ExprKind::Cast { .. }));

        let mut e2 = Expr::identifier("y", span());
        let long_ty = Rc::new(CType::basic(BasicKind::SignedLongInt));
        let unchanged = integer_promote(&mut e2, long_ty.clone());
        assert_eq!(unchanged, long_ty);
        assert!(matches!(e2.kind, acc_ast::ExprKind::Primary(_)));
    }

    #[test]
    fn usual_conversion_casts_lower_rank_side() {
        let mut l = Expr::identifier("a", span());
        let mut r = Expr::identifier("b", span());
        let int_ty = Rc::new(CType::basic(BasicKind::SignedInt));
        let long_ty = Rc::new(CType::basic(BasicKind::SignedLongInt));

        let common = usual_arithmetic_conversion(&mut l, int_ty, &mut r, long_ty.clone());
        assert_eq!(common, long_ty);
        assert!(matches!(l.kind, acc_ast::ExprKind::Cast { .. }));
        assert!(matches!(r.kind, acc_ast::ExprKind::Primary(_)));
    }

    #[test]
    fn assign_cast_inserts_cast_for_differing_basic_specifiers() {
        let mut right_expr = Expr::identifier("x", span());
        let left = Rc::new(CType::basic(BasicKind::SignedLongInt));
        let right = Rc::new(CType::basic(BasicKind::SignedInt));
        assert!(assign_cast(&mut right_expr, &left, &right));
        assert!(matches!(right_expr.kind, acc_ast::ExprKind::Cast { .. }));
    }

    #[test]
    fn assign_cast_accepts_matching_function_prototypes() {
        let mut right_expr = Expr::identifier("f", span());
        let int_ty = Rc::new(CType::basic(BasicKind::SignedInt));
        let left = Rc::new(CType::function_of(int_ty.clone(), vec![Param::new(None, int_ty.clone())]).unwrap());
        let right = Rc::new(CType::function_of(int_ty.clone(), vec![Param::new(Some("n".into()), int_ty)]).unwrap());
        assert!(assign_cast(&mut right_expr, &left, &right));
    }

    #[test]
    fn assign_cast_rejects_pointer_to_basic() {
        let mut right_expr = Expr::identifier("x", span());
        let int_ty = Rc::new(CType::basic(BasicKind::SignedInt));
        let left = Rc::new(CType::pointer_to(int_ty.clone()));
        assert!(!assign_cast(&mut right_expr, &left, &int_ty));
    }
}
