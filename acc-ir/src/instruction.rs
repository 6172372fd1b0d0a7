use crate::block::BasicBlockId;
use crate::object::ObjectId;
use crate::opcode::Opcode;
use crate::register::RegisterId;

/// One IR instruction: an opcode, up to three register operands, and
/// whichever of the opcode-specific payloads (`value`, `object`, or the
/// control successors) it actually uses. Every field besides `op` is
/// optional since no single opcode uses all of them; callers are
/// expected to populate only what that opcode reads.
#[derive(Debug, Clone)]
pub struct Instruction {
    pub op: Opcode,
    pub dest: Option<RegisterId>,
    pub left: Option<RegisterId>,
    pub right: Option<RegisterId>,
    pub value: Option<i64>,
    pub object: Option<ObjectId>,
    pub jump_true: Option<BasicBlockId>,
    pub jump_false: Option<BasicBlockId>,
    pub callee: Option<String>,
}

impl Instruction {
    pub fn new(op: Opcode) -> Self {
        Self {
            op,
            dest: None,
            left: None,
            right: None,
            value: None,
            object: None,
            jump_true: None,
            jump_false: None,
            callee: None,
        }
    }

    pub fn binary(op: Opcode, dest: RegisterId, left: RegisterId, right: RegisterId) -> Self {
        Self { left: Some(left), right: Some(right), ..Self::new(op).with_dest(dest) }
    }

    pub fn with_dest(mut self, dest: RegisterId) -> Self {
        self.dest = Some(dest);
        self
    }

    pub fn with_left(mut self, left: RegisterId) -> Self {
        self.left = Some(left);
        self
    }

    pub fn with_right(mut self, right: RegisterId) -> Self {
        self.right = Some(right);
        self
    }

    pub fn with_value(mut self, value: i64) -> Self {
        self.value = Some(value);
        self
    }

    pub fn with_object(mut self, object: ObjectId) -> Self {
        self.object = Some(object);
        self
    }

    pub fn with_jump_true(mut self, target: BasicBlockId) -> Self {
        self.jump_true = Some(target);
        self
    }

    pub fn with_jump_false(mut self, target: BasicBlockId) -> Self {
        self.jump_false = Some(target);
        self
    }

    pub fn with_callee(mut self, callee: impl Into<String>) -> Self {
        self.callee = Some(callee.into());
        self
    }

    /// Every register this instruction reads from — everything but
    /// `dest`. Liveness walks these to grow `live_entry`.
    pub fn sources(&self) -> impl Iterator<Item = RegisterId> {
        [self.left, self.right].into_iter().flatten()
    }
}
