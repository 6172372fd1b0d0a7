use acc_ast::BinaryOp;
use acc_types::BasicKind;

/// One row of the binary-operator constraint table: for a given
/// operator, whether each side must be a basic type, whether compatible
/// operands are required, and the fixed result type when the operator
/// forces one (comparisons always yield `signed int` regardless of
/// operand type).
///
/// Rows are searched in order and the first whose `left_basic`/
/// `right_basic` flags are satisfied by the actual operands wins — this
/// is how `+`/`-` encode "both arithmetic" and "exactly one pointer" as
/// two ordered alternatives instead of one conditional.
#[derive(Debug, Clone, Copy)]
pub struct OpRow {
    pub op: BinaryOp,
    pub left_basic: bool,
    pub right_basic: bool,
    pub compatible: bool,
    pub fixed: Option<BasicKind>,
}

const fn row(op: BinaryOp, left_basic: bool, right_basic: bool, compatible: bool, fixed: Option<BasicKind>) -> OpRow {
    OpRow { op, left_basic, right_basic, compatible, fixed }
}

/// `signed int`, the fixed result type of every comparison and logical
/// operator.
const SIGNED_INT: Option<BasicKind> = Some(BasicKind::SignedInt);

pub static BINARY_OP_TABLE: &[OpRow] = &[
    // `+`: both arithmetic, or exactly one side pointer (mixed rows
    // yield the pointer operand's type — see `OpRow::fixed == None`
    // handling in the caller).
    row(BinaryOp::Add, true, true, true, None),
    row(BinaryOp::Add, true, false, false, None),
    row(BinaryOp::Add, false, true, false, None),
    // `-`: both arithmetic, pointer-basic, or pointer-pointer (requires
    // compatibility, handled by the caller for the all-pointer row).
    row(BinaryOp::Sub, true, true, true, None),
    row(BinaryOp::Sub, false, true, false, None),
    row(BinaryOp::Sub, false, false, true, None),
    row(BinaryOp::Mul, true, true, true, None),
    row(BinaryOp::Div, true, true, true, None),
    row(BinaryOp::Mod, true, true, true, None),
    row(BinaryOp::Lt, true, true, true, SIGNED_INT),
    row(BinaryOp::Lt, false, false, true, SIGNED_INT),
    row(BinaryOp::Le, true, true, true, SIGNED_INT),
    row(BinaryOp::Le, false, false, true, SIGNED_INT),
    row(BinaryOp::Gt, true, true, true, SIGNED_INT),
    row(BinaryOp::Gt, false, false, true, SIGNED_INT),
    row(BinaryOp::Ge, true, true, true, SIGNED_INT),
    row(BinaryOp::Ge, false, false, true, SIGNED_INT),
    // `==`/`!=`: both basic, or both pointers to compatible types.
    row(BinaryOp::Eq, true, true, true, SIGNED_INT),
    row(BinaryOp::Eq, false, false, true, SIGNED_INT),
    row(BinaryOp::Ne, true, true, true, SIGNED_INT),
    row(BinaryOp::Ne, false, false, true, SIGNED_INT),
    row(BinaryOp::BitAnd, true, true, true, None),
    row(BinaryOp::BitOr, true, true, true, None),
    row(BinaryOp::BitXor, true, true, true, None),
    // `&&`/`||`: any scalar pair, no conversion performed.
    row(BinaryOp::LogicalAnd, true, true, false, SIGNED_INT),
    row(BinaryOp::LogicalAnd, true, false, false, SIGNED_INT),
    row(BinaryOp::LogicalAnd, false, true, false, SIGNED_INT),
    row(BinaryOp::LogicalAnd, false, false, false, SIGNED_INT),
    row(BinaryOp::LogicalOr, true, true, false, SIGNED_INT),
    row(BinaryOp::LogicalOr, true, false, false, SIGNED_INT),
    row(BinaryOp::LogicalOr, false, true, false, SIGNED_INT),
    row(BinaryOp::LogicalOr, false, false, false, SIGNED_INT),
];

/// Find the first row for `op` whose basic-ness requirements are met by
/// the actual operands.
pub fn find_row(op: BinaryOp, left_is_basic: bool, right_is_basic: bool) -> Option<&'static OpRow> {
    BINARY_OP_TABLE.iter().find(|row| {
        row.op == op
            && (!row.left_basic || left_is_basic)
            && (!row.right_basic || right_is_basic)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_prefers_both_arithmetic_row_when_both_basic() {
        let row = find_row(BinaryOp::Add, true, true).unwrap();
        assert!(row.left_basic && row.right_basic);
    }

    #[test]
    fn add_falls_back_to_mixed_row_when_right_is_pointer() {
        let row = find_row(BinaryOp::Add, true, false).unwrap();
        assert!(row.left_basic && !row.right_basic);
    }

    #[test]
    fn unknown_operator_combination_has_no_row() {
        assert!(find_row(BinaryOp::Mul, false, false).is_none());
    }
}
