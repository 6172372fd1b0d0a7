use index_vec::IndexVec;

use crate::block::{BasicBlock, BasicBlockId};
use crate::object::{Object, ObjectId};
use crate::register::{Register, RegisterId};

/// One function: its locals, its blocks in emission order (block 0 is
/// always the entry), and its register pool.
#[derive(Debug, Clone)]
pub struct Function {
    pub name: String,
    pub locals: IndexVec<ObjectId, Object>,
    pub blocks: IndexVec<BasicBlockId, BasicBlock>,
    pub registers: IndexVec<RegisterId, Register>,
    pub stack_size: u32,
}

impl Function {
    pub fn new(name: impl Into<String>) -> Self {
        let mut blocks = IndexVec::new();
        blocks.push(BasicBlock::new("entry"));
        Self { name: name.into(), locals: IndexVec::new(), blocks, registers: IndexVec::new(), stack_size: 0 }
    }

    pub fn entry(&self) -> BasicBlockId {
        BasicBlockId::new(0)
    }

    pub fn new_block(&mut self, label: impl Into<String>) -> BasicBlockId {
        self.blocks.push(BasicBlock::new(label))
    }

    pub fn new_register(&mut self, kind: crate::register::RegisterKind) -> RegisterId {
        self.registers.push(Register::new(kind))
    }

    pub fn add_local(&mut self, object: Object) -> ObjectId {
        self.locals.push(object)
    }

    /// Link `from -> to` as a control-flow edge, updating both blocks'
    /// successor/predecessor lists.
    pub fn link(&mut self, from: BasicBlockId, to: BasicBlockId) {
        self.blocks[from].successors.push(to);
        self.blocks[to].predecessors.push(from);
    }
}
