//! # tacrv Compiler - Three-Address IR to RISC-V Assembly
//!
//! This module lowers a linear three-address IR program into an RV32IM
//! assembly listing using a fixed register pool and a stack spill area.
//!
//! ## Architecture
//!
//! ```text
//! IR → Normalize → Usage Counts → Allocate + Emit → Frame → Listing
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! use tacrv::compiler::{Compiler, CompileOptions};
//!
//! let source = "(MOV, x, 1)\n(ADD, y, x, 2)\n(RET, y)";
//! let compiler = Compiler::new(CompileOptions::default());
//! let result = compiler.compile_text(source)?;
//! println!("{}", result.listing);
//! ```

pub mod bimap;
pub mod codegen;
pub mod debug;
pub mod ir;
pub mod normalizer;
pub mod regalloc;
pub mod riscv;
pub mod usage;

pub use bimap::BiMap;
pub use codegen::{CodegenOutput, RiscvCodegen};
pub use debug::{dump_ir, dump_listing, format_ir};
pub use ir::{BinaryOp, IrInstruction, IrProgram, IrValue, IrVar};
pub use normalizer::Normalizer;
pub use regalloc::{AllocationStats, RegisterAllocator};
pub use riscv::{AsmLine, AsmListing, PoolReg, RiscvInstruction, RiscvReg, POOL_NAMES};
pub use usage::UsageTable;

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Fewest registers that can hold the three operands of one instruction
pub const MIN_POOL_SIZE: usize = 3;

/// Compilation options
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Number of allocatable registers (`t0..t6`, then `s1..s11`)
    pub register_pool_size: usize,
    /// Register that receives the `RET` value
    pub return_register: String,
    /// Bytes per spill slot
    pub spill_slot_size: u32,
    /// Alignment of the spill frame in bytes
    pub stack_alignment: u32,
    /// Section directive opening the listing
    pub section_directive: String,
    /// Materialize `addi` immediates outside the 12-bit signed range
    pub legalize_immediates: bool,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            register_pool_size: 7,
            return_register: "a0".to_string(),
            spill_slot_size: 4,
            stack_alignment: 4,
            section_directive: ".text".to_string(),
            legalize_immediates: true,
        }
    }
}

impl CompileOptions {
    /// Load options from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidOptions(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Check the options describe a target the back end can drive
    pub fn validate(&self) -> Result<()> {
        if !(MIN_POOL_SIZE..=POOL_NAMES.len()).contains(&self.register_pool_size) {
            return Err(Error::InvalidOptions(format!(
                "register_pool_size must be in {}..={}, got {}",
                MIN_POOL_SIZE,
                POOL_NAMES.len(),
                self.register_pool_size
            )));
        }
        if self.spill_slot_size == 0 || self.spill_slot_size % 4 != 0 {
            return Err(Error::InvalidOptions(format!(
                "spill_slot_size must be a non-zero multiple of 4, got {}",
                self.spill_slot_size
            )));
        }
        if !self.stack_alignment.is_power_of_two()
            || self.stack_alignment % self.spill_slot_size != 0
        {
            return Err(Error::InvalidOptions(format!(
                "stack_alignment must be a power of two and a multiple of {}, got {}",
                self.spill_slot_size, self.stack_alignment
            )));
        }
        if POOL_NAMES.contains(&self.return_register.as_str()) {
            return Err(Error::InvalidOptions(format!(
                "return_register {} overlaps the allocatable pool",
                self.return_register
            )));
        }
        Ok(())
    }
}

/// Compilation result with metadata
#[derive(Debug, Clone)]
pub struct CompileResult {
    /// Assembly listing (ready to write out)
    pub listing: AsmListing,
    /// IR after normalization
    pub normalized: IrProgram,
    /// Spill/reload counters and frame size
    pub stats: AllocationStats,
    /// Number of input IR instructions
    pub ir_instruction_count: usize,
    /// Number of IR instructions after normalization
    pub normalized_instruction_count: usize,
    /// Number of emitted machine instructions, frame and spill code included
    pub asm_instruction_count: usize,
    /// Warnings generated during compilation
    pub warnings: Vec<String>,
}

/// Three-address IR to RISC-V compiler
pub struct Compiler {
    options: CompileOptions,
}

impl Compiler {
    /// Create a new compiler with options
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// Options this compiler runs with
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile textual IR (one `(OP, ...)` instruction per line)
    pub fn compile_text(&self, source: &str) -> Result<CompileResult> {
        let program = IrProgram::parse(source)?;
        self.compile(&program)
    }

    /// Compile an IR program to an assembly listing
    pub fn compile(&self, program: &IrProgram) -> Result<CompileResult> {
        self.options.validate()?;

        let mut codegen = RiscvCodegen::new(self.options.clone());
        let output = codegen.generate(program)?;

        let mut warnings = Vec::new();
        if output.discarded > 0 {
            warnings.push(format!(
                "{} unreachable instruction(s) after RET discarded",
                output.discarded
            ));
        }
        for var in &output.never_read {
            warnings.push(format!("value of {} is never read", var));
        }
        for warning in &warnings {
            tracing::warn!("{}", warning);
        }

        Ok(CompileResult {
            ir_instruction_count: program.len(),
            normalized_instruction_count: output.normalized.len(),
            asm_instruction_count: output.listing.instructions().count(),
            listing: output.listing,
            normalized: output.normalized,
            stats: output.stats,
            warnings,
        })
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new(CompileOptions::default())
    }
}
