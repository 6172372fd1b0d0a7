//! Textual IR dump, in the `.fun name:` / `.block label:` format the
//! source compiler's `Ir_to_str` produces, extended with one line per
//! instruction (the source left `Ir_to_str_instruction` unimplemented).

use std::fmt;

use index_vec::Idx;

use crate::block::BasicBlock;
use crate::function::Function;
use crate::instruction::Instruction;
use crate::program::Program;
use crate::register::RegisterId;

/// Wraps an IR item so it can be [`fmt::Display`]ed without baking
/// dump-format logic into the core entities themselves.
pub struct ForFormatting<'ir, T> {
    pub item: T,
    pub program: &'ir Program,
}

pub trait WriteIr: Sized {
    fn for_fmt(self, program: &Program) -> ForFormatting<'_, Self> {
        ForFormatting { item: self, program }
    }
}

impl WriteIr for &Program {}
impl WriteIr for &Function {}
impl<'a> WriteIr for (&'a BasicBlock, &'a Function) {}
impl WriteIr for &Instruction {}

fn reg(id: RegisterId) -> String {
    format!("r{}", id.index())
}

impl fmt::Display for ForFormatting<'_, &Program> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for global in self.item.globals.iter() {
            writeln!(f, ".{}:{},{}", global.name, global.size, global.alignment)?;
        }
        for function in &self.item.functions {
            write!(f, "{}", function.for_fmt(self.program))?;
        }
        Ok(())
    }
}

impl fmt::Display for ForFormatting<'_, &Function> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let function = self.item;
        writeln!(f, ".fun {}:", function.name)?;
        for local in function.locals.iter() {
            writeln!(f, "  .{}:{},{}", local.name, local.size, local.alignment)?;
        }
        for block in function.blocks.iter() {
            write!(f, "{}", (block, function).for_fmt(self.program))?;
        }
        Ok(())
    }
}

impl fmt::Display for ForFormatting<'_, (&BasicBlock, &Function)> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (block, _function) = self.item;
        writeln!(f, ".block {}:", block.label)?;
        for instruction in &block.instructions {
            writeln!(f, "    {}", instruction.for_fmt(self.program))?;
        }
        Ok(())
    }
}

impl fmt::Display for ForFormatting<'_, &Instruction> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let instr = self.item;
        if let Some(dest) = instr.dest {
            write!(f, "{} = ", reg(dest))?;
        }
        write!(f, "{}", instr.op.mnemonic())?;
        if let Some(left) = instr.left {
            write!(f, " {}", reg(left))?;
        }
        if let Some(right) = instr.right {
            write!(f, ", {}", reg(right))?;
        }
        if let Some(value) = instr.value {
            write!(f, " {value}")?;
        }
        if let Some(object) = instr.object {
            write!(f, " obj#{}", object.index())?;
        }
        if let Some(callee) = &instr.callee {
            write!(f, " {callee}")?;
        }
        match (instr.jump_true, instr.jump_false) {
            (Some(t), Some(e)) => write!(f, " -> block#{}, block#{}", t.index(), e.index())?,
            (Some(t), None) => write!(f, " -> block#{}", t.index())?,
            _ => {}
        }
        Ok(())
    }
}
