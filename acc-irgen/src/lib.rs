//! Lowers an analyzed [`acc_ast::TranslationUnit`] into the three-address
//! IR modeled by `acc-ir`.
//!
//! The analyzer has already resolved every identifier to a symbol and
//! annotated every expression with its type; this crate's only job is
//! picking concrete opcodes and register/object placement for that
//! already-checked tree. It performs no further type checking.

mod block_and;
mod builder;

pub use builder::IrGen;
