//! Backward data-flow liveness analysis over a lowered [`acc_ir::Function`].
//!
//! Position numbering and the entry/exit fixed point mirror the source
//! compiler's `liveness.c` (`function_begin`/`basic_block`/`function_end`),
//! rendered over [`acc_ir::RegisterSet`] bitsets instead of raw byte
//! arrays and `Vec`-based predecessor lists instead of the two-slot
//! `cfg_entry` array.

use acc_ir::{BasicBlockId, Function, RegisterSet};

/// Run liveness analysis over every function in `program`, populating
/// each block's `live_entry`/`live_exit` and every register's
/// `live` range in place.
pub fn analyze_program(program: &mut acc_ir::Program) {
    for function in &mut program.functions {
        analyze_function(function);
    }
}

pub fn analyze_function(function: &mut Function) {
    let positions = assign_positions(function);

    let register_count = function.registers.len();
    for block in &mut function.blocks {
        block.live_entry = Some(RegisterSet::empty(register_count));
        block.live_exit = Some(RegisterSet::empty(register_count));
    }

    let mut changed = true;
    while changed {
        changed = false;
        let block_ids: Vec<BasicBlockId> = function.blocks.indices().collect();
        for block_id in block_ids {
            changed |= propagate_block(function, block_id, &positions[block_id.index()]);
        }
    }

    extend_pass_through_ranges(function, &positions);
}

/// Assign a monotonically increasing position to every instruction in
/// block order. Positions are global across the function (not reset
/// per block), matching the source's single running `instr_index`.
fn assign_positions(function: &Function) -> Vec<Vec<u32>> {
    let mut position = 0u32;
    let mut positions = Vec::with_capacity(function.blocks.len());
    for block in &function.blocks {
        let mut block_positions = Vec::with_capacity(block.instructions.len());
        for _ in &block.instructions {
            block_positions.push(position);
            position += 1;
        }
        positions.push(block_positions);
    }
    positions
}

/// Recompute one block's entry set from its exit set and instructions,
/// then push any resulting growth into each predecessor's exit set.
/// Returns whether any predecessor's exit set changed.
fn propagate_block(function: &mut Function, block_id: BasicBlockId, block_positions: &[u32]) -> bool {
    let register_count = function.registers.len();

    let mut entry = function.blocks[block_id].live_exit.clone().unwrap_or(RegisterSet::empty(register_count));

    for (instr, &position) in function.blocks[block_id].instructions.iter().zip(block_positions.iter()).rev() {
        for reg in instr.sources() {
            entry.insert(reg.index());
            function.registers[reg].live.extend(position);
        }
        if let Some(dest) = instr.dest {
            entry.remove(dest.index());
            function.registers[dest].live.extend(position);
        }
    }

    function.blocks[block_id].live_entry = Some(entry.clone());

    let predecessors = function.blocks[block_id].predecessors.clone();
    let mut changed = false;
    for predecessor in predecessors {
        let grew = function.blocks[predecessor]
            .live_exit
            .get_or_insert_with(|| RegisterSet::empty(register_count))
            .union_with(&entry);
        if grew {
            log::trace!("liveness: block {:?} exit grew from successor {:?}", predecessor, block_id);
        }
        changed |= grew;
    }
    changed
}

/// A register live in both a block's entry and exit set is live
/// throughout the block even if the instruction sweep never recorded
/// an explicit use inside it — extend its range to cover the block's
/// first and last instruction positions.
fn extend_pass_through_ranges(function: &mut Function, positions: &[Vec<u32>]) {
    for (block_id, block) in function.blocks.iter_enumerated() {
        let (Some(entry), Some(exit)) = (&block.live_entry, &block.live_exit) else { continue };
        let block_positions = &positions[block_id.index()];
        let (Some(&first), Some(&last)) = (block_positions.first(), block_positions.last()) else { continue };

        for register_index in 0..function.registers.len() {
            if entry.contains(register_index) && exit.contains(register_index) {
                let register = &mut function.registers[acc_ir::RegisterId::new(register_index)];
                register.live.extend(first);
                register.live.extend(last);
            }
        }
    }
}
