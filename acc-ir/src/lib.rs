//! The three-address IR: registers, objects, instructions, basic
//! blocks, functions, and the program they belong to.
//!
//! This crate only models the IR's shape. Lowering an AST into it
//! lives in `acc-irgen`; annotating registers with live ranges lives in
//! `acc-liveness`; assigning machine indices lives in `acc-regalloc`.

pub mod block;
pub mod function;
pub mod instruction;
pub mod object;
pub mod opcode;
pub mod program;
pub mod register;
pub mod regset;
pub mod write;

pub use block::{BasicBlock, BasicBlockId};
pub use function::Function;
pub use instruction::Instruction;
pub use object::{Object, ObjectId, ObjectStorage};
pub use opcode::Opcode;
pub use program::Program;
pub use register::{LiveRange, Register, RegisterId, RegisterKind};
pub use regset::RegisterSet;
pub use write::WriteIr;
