//! # Intermediate Representation (IR) consumed by the back end
//!
//! The front end hands over a linear three-address listing: `MOV`, `ADD`,
//! `SUB`, `MUL` and one terminal `RET`, with operands already resolved to
//! named variables or 32-bit immediates.
//!
//! ## Module Structure
//!
//! ```text
//! ir/
//! ├── mod.rs          # This file - module definition and re-exports
//! ├── instruction.rs  # IrVar, IrValue, BinaryOp, IrInstruction
//! ├── program.rs      # IrProgram (ordered instruction list)
//! └── reader.rs       # Textual `(OP, dst, a, b)` listing reader
//! ```

mod instruction;
mod program;
mod reader;

// Re-export all public types
pub use instruction::{BinaryOp, IrInstruction, IrValue, IrVar};
pub use program::IrProgram;
