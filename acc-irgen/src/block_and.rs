use acc_ir::BasicBlockId;

/// A value paired with the basic block lowering it left off in.
/// Lowering an expression or statement can open new blocks (a
/// tertiary's arms, a while loop's header/body/exit); every lowering
/// method hands its caller back the block it should keep emitting
/// into, not just the value, so control never silently resumes in a
/// stale block.
#[derive(Debug, Clone, Copy)]
pub struct BlockAnd<T>(pub BasicBlockId, pub T);

pub trait BlockAndExtend {
    fn and<T>(self, value: T) -> BlockAnd<T>;
    fn unit(self) -> BlockAnd<()>;
}

impl BlockAndExtend for BasicBlockId {
    fn and<T>(self, value: T) -> BlockAnd<T> {
        BlockAnd(self, value)
    }

    fn unit(self) -> BlockAnd<()> {
        BlockAnd(self, ())
    }
}

/// Extracts the block half of a `BlockAnd`, reassigning it to `$block`,
/// and evaluates to the value half. Mirrors reassigning "current block"
/// after any lowering step that might have opened new blocks.
macro_rules! unpack {
    ($block:ident = $expr:expr) => {{
        let block_and = $expr;
        $block = block_and.0;
        block_and.1
    }};
    ($expr:expr) => {{
        let block_and = $expr;
        block_and.0
    }};
}

pub(crate) use unpack;
