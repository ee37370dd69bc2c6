//! # tacrv - Three-Address Code to RISC-V
//!
//! Back end of a small expression/assignment language compiler. It takes a
//! finished linear three-address IR (`MOV`, `ADD`, `SUB`, `MUL`, `RET`) and
//! produces an RV32IM assembly listing for a target with a small fixed
//! register file and a stack frame for spills.
//!
//! ## Features
//!
//! - **IR normalization** - constant folding, immediate canonicalization,
//!   immediate materialization, dead-tail elimination
//! - **Usage analysis** - remaining-read counts drive register reuse
//! - **Online LRU allocation** - single pass, spill-to-stack and reload,
//!   dead stack slots recycled
//! - **Deterministic output** - the same IR always yields the same text
//!
//! ## Quick Start
//!
//! ```rust
//! use tacrv::{Compiler, CompileOptions};
//!
//! # fn main() -> tacrv::Result<()> {
//! let source = "(MOV, x, 1)\n(ADD, y, x, 2)\n(RET, y)\n";
//! let result = Compiler::new(CompileOptions::default()).compile_text(source)?;
//!
//! assert_eq!(
//!     result.listing.dump(),
//!     ".text\n    li t0, 1        #  (MOV, x, 1)\n    addi t1, t0, 2        #  (ADD, y, x, 2)\n    mv a0, t1        #  (RET, y)"
//! );
//! # Ok(())
//! # }
//! ```
//!
//! Programs can also be built directly:
//!
//! ```rust
//! use tacrv::{Compiler, IrInstruction, IrProgram, IrValue};
//!
//! # fn main() -> tacrv::Result<()> {
//! let program = IrProgram::from_instructions(vec![
//!     IrInstruction::mov("a", 6),
//!     IrInstruction::mul("b", IrValue::var("a"), 7),
//!     IrInstruction::ret(IrValue::var("b")),
//! ]);
//! let result = Compiler::default().compile(&program)?;
//! assert_eq!(result.stats.frame_size, 0);
//! # Ok(())
//! # }
//! ```
//!
//! ## Logging
//!
//! The crate logs through `tracing` and installs no subscriber. Phase
//! boundaries log at `debug`, every register decision at `trace`, and
//! compile warnings at `warn`.
//!
//! ## License
//!
//! Licensed under the [MIT License](https://opensource.org/licenses/MIT).

/// Version of the tacrv back end
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod compiler;
pub mod error;

pub use compiler::{
    AllocationStats, AsmListing, CompileOptions, CompileResult, Compiler, IrInstruction,
    IrProgram, IrValue, IrVar,
};
pub use error::{Error, Result};
