//! Linear-scan register allocation over a liveness-annotated function,
//! followed by the fixup rewrite that makes every spilled operand
//! concrete.
//!
//! The allocation sweep, free stack, and active set mirror the source
//! compiler's `regalloc.c`. One deliberate correction: that file's
//! `active_get` initializes its "soonest" tracker to `-1` and compares
//! `finish < soonest`, a condition no non-negative finish position can
//! ever satisfy, so the function always returns nothing and every
//! registerless moment falls straight to spilling the register being
//! processed rather than ever stealing from an active one. This
//! allocator instead steals from the active register with the largest
//! `finish`, spilling it only when that is longer-lived than the
//! register under consideration.

use acc_ir::{Function, Instruction, Opcode, RegisterId, RegisterKind};

/// Number of machine register indices reserved for spill-fixup scratch:
/// one address holder plus three operand holders (dest source, left
/// destination, right destination), sized for the three-operand
/// instruction shape.
pub const REGS_SPILL: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegallocError {
    TooFewRegisters { available: usize, required: usize },
}

impl std::fmt::Display for RegallocError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegallocError::TooFewRegisters { available, required } => {
                write!(f, "register pool has {available} indices, but at least {required} are required for spill scratch")
            }
        }
    }
}

impl std::error::Error for RegallocError {}

/// The machine register indices available to the allocator: the first
/// [`REGS_SPILL`] entries are reserved as fixup scratch and never
/// handed out by the allocation sweep; the rest form the free pool.
#[derive(Debug, Clone)]
pub struct RegisterPool {
    spill: [u32; REGS_SPILL],
    free: Vec<u32>,
}

impl RegisterPool {
    /// Builds a pool from an ordered list of machine register indices
    /// (the caller strips the sentinel before calling this). Rejects a
    /// list too short to carve out the reserved spill prefix.
    pub fn new(machine_indices: &[u32]) -> Result<Self, RegallocError> {
        if machine_indices.len() < REGS_SPILL {
            return Err(RegallocError::TooFewRegisters { available: machine_indices.len(), required: REGS_SPILL });
        }
        let mut spill = [0u32; REGS_SPILL];
        spill.copy_from_slice(&machine_indices[..REGS_SPILL]);
        Ok(Self { spill, free: machine_indices[REGS_SPILL..].to_vec() })
    }

    pub fn spill_scratch(&self) -> [u32; REGS_SPILL] {
        self.spill
    }

    pub fn allocatable_count(&self) -> usize {
        self.free.len()
    }
}

pub fn allocate_program(program: &mut acc_ir::Program, pool: &RegisterPool) {
    for function in &mut program.functions {
        allocate_function(function, pool);
    }
}

pub fn allocate_function(function: &mut Function, pool: &RegisterPool) {
    linear_scan(function, pool);
    fixup(function, pool);
}

/// Holds a register's position in the allocation sweep: its id plus
/// whatever was already written to `live` by the liveness pass.
fn linear_scan(function: &mut Function, pool: &RegisterPool) {
    let mut order: Vec<RegisterId> =
        function.registers.indices().filter(|&r| function.registers[r].kind == RegisterKind::Any).collect();
    order.sort_by_key(|&r| function.registers[r].live.start.unwrap_or(0));

    let mut free: Vec<u32> = pool.free.clone();
    let mut active: Vec<RegisterId> = Vec::new();

    for reg_id in order {
        let start = function.registers[reg_id].live.start.unwrap_or(0);
        expire_active(function, &mut active, &mut free, start);

        if let Some(index) = free.pop() {
            function.registers[reg_id].assigned_index = Some(index);
            active.push(reg_id);
            log::trace!("regalloc: {reg_id:?} took free register {index}");
            continue;
        }

        let reg_finish = function.registers[reg_id].live.finish.unwrap_or(start);
        let replace = active_get(function, &active);

        match replace {
            Some(replace) if function.registers[replace].live.finish.unwrap_or(0) > reg_finish => {
                let stolen = function.registers[replace].assigned_index;
                function.registers[reg_id].assigned_index = stolen;
                spill_register(function, replace);
                active.retain(|&r| r != replace);
                active.push(reg_id);
                log::debug!("regalloc: {reg_id:?} steals a register from {replace:?}, which spills instead");
            }
            _ => {
                spill_register(function, reg_id);
                log::debug!("regalloc: {reg_id:?} spills to the stack");
            }
        }
    }
}

/// Remove and free every active register whose live range ended before
/// `position` starts.
fn expire_active(function: &mut Function, active: &mut Vec<RegisterId>, free: &mut Vec<u32>, position: u32) {
    let mut i = 0;
    while i < active.len() {
        let reg_id = active[i];
        let finish = function.registers[reg_id].live.finish.unwrap_or(position);
        if finish < position {
            if let Some(index) = function.registers[reg_id].assigned_index {
                free.push(index);
            }
            active.remove(i);
        } else {
            i += 1;
        }
    }
}

/// The active register with the furthest-out live range, i.e. the one
/// whose eviction frees up a register for the longest remaining
/// stretch of the function.
fn active_get(function: &Function, active: &[RegisterId]) -> Option<RegisterId> {
    active.iter().copied().max_by_key(|&r| function.registers[r].live.finish.unwrap_or(0))
}

fn spill_register(function: &mut Function, reg_id: RegisterId) {
    let offset = function.stack_size;
    function.stack_size += 4;
    function.registers[reg_id].kind = RegisterKind::Spill;
    function.registers[reg_id].spill_offset = Some(offset);
    function.registers[reg_id].assigned_index = None;
}

/// The four scratch registers fixup rewrites bind directly to the
/// reserved machine indices rather than handing them through
/// allocation.
struct SpillScratch {
    address: RegisterId,
    store_source: RegisterId,
    load_left: RegisterId,
    load_right: RegisterId,
}

fn install_spill_scratch(function: &mut Function, pool: &RegisterPool) -> SpillScratch {
    let indices = pool.spill_scratch();
    let mut bind = |machine_index: u32| {
        let id = function.new_register(RegisterKind::Any);
        function.registers[id].assigned_index = Some(machine_index);
        id
    };
    SpillScratch { address: bind(indices[0]), store_source: bind(indices[1]), load_left: bind(indices[2]), load_right: bind(indices[3]) }
}

/// Rewrites every instruction referencing a spilled operand into a
/// materialize-before/write-back-after sequence against the scratch
/// registers, so no `Spill`-kind register remains observable once this
/// returns.
fn fixup(function: &mut Function, pool: &RegisterPool) {
    let scratch = install_spill_scratch(function, pool);
    let is_spilled = |function: &Function, reg: Option<RegisterId>| reg.is_some_and(|r| function.registers[r].kind == RegisterKind::Spill);

    for block_id in function.blocks.indices().collect::<Vec<_>>() {
        let original = std::mem::take(&mut function.blocks[block_id].instructions);
        let mut rewritten = Vec::with_capacity(original.len());

        for mut instr in original {
            let dest_spilled = is_spilled(function, instr.dest);
            let left_spilled = is_spilled(function, instr.left);
            let right_spilled = is_spilled(function, instr.right);

            if left_spilled {
                let offset = function.registers[instr.left.unwrap()].spill_offset.unwrap();
                rewritten.push(Instruction::new(Opcode::LoadSo).with_dest(scratch.address).with_value(offset as i64));
                rewritten.push(Instruction::new(Opcode::Load32).with_dest(scratch.load_left).with_left(scratch.address));
                instr.left = Some(scratch.load_left);
            }
            if right_spilled {
                let offset = function.registers[instr.right.unwrap()].spill_offset.unwrap();
                rewritten.push(Instruction::new(Opcode::LoadSo).with_dest(scratch.address).with_value(offset as i64));
                rewritten.push(Instruction::new(Opcode::Load32).with_dest(scratch.load_right).with_left(scratch.address));
                instr.right = Some(scratch.load_right);
            }

            let dest_offset = dest_spilled.then(|| function.registers[instr.dest.unwrap()].spill_offset.unwrap());
            if dest_spilled {
                instr.dest = Some(scratch.store_source);
            }

            rewritten.push(instr);

            if let Some(offset) = dest_offset {
                rewritten.push(Instruction::new(Opcode::LoadSo).with_dest(scratch.address).with_value(offset as i64));
                rewritten.push(Instruction::new(Opcode::Store32).with_left(scratch.address).with_right(scratch.store_source));
            }
        }

        function.blocks[block_id].instructions = rewritten;
    }
}
