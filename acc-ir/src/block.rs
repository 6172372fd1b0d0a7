use index_vec::define_index_type;
use smallvec::SmallVec;

use crate::instruction::Instruction;
use crate::regset::RegisterSet;

define_index_type! {
    /// Index into a [`crate::Function`]'s block list.
    pub struct BasicBlockId = u32;

    MAX_INDEX = i32::max_value() as usize;
    DISABLE_MAX_INDEX_CHECK = cfg!(not(debug_assertions));
}

/// A straight-line run of instructions with at most two control
/// successors. Instructions are a `Vec` rather than the source's
/// intrusive doubly-linked list — splicing during lowering is just
/// `Vec::insert`/`push`, and nothing here needs O(1) removal from the
/// middle of a block.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub label: String,
    pub instructions: Vec<Instruction>,
    pub successors: SmallVec<[BasicBlockId; 2]>,
    pub predecessors: Vec<BasicBlockId>,
    pub live_entry: Option<RegisterSet>,
    pub live_exit: Option<RegisterSet>,
}

impl BasicBlock {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            instructions: Vec::new(),
            successors: SmallVec::new(),
            predecessors: Vec::new(),
            live_entry: None,
            live_exit: None,
        }
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    pub fn is_terminated(&self) -> bool {
        self.instructions.last().is_some_and(|i| i.op.is_terminator())
    }
}
