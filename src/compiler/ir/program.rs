//! IR program definition

use super::instruction::{IrInstruction, IrVar};
use crate::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Complete IR program: one straight-line block ending in `RET`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IrProgram {
    /// All instructions in program order
    pub instructions: Vec<IrInstruction>,
}

impl IrProgram {
    /// Create a new empty IR program
    pub fn new() -> Self {
        Self {
            instructions: Vec::new(),
        }
    }

    /// Wrap an existing instruction list
    pub fn from_instructions(instructions: Vec<IrInstruction>) -> Self {
        Self { instructions }
    }

    /// Read the textual `(OP, dst, a, b)` form, one instruction per line
    pub fn parse(source: &str) -> Result<Self> {
        super::reader::parse_program(source)
    }

    /// Append an instruction
    pub fn push(&mut self, instr: IrInstruction) {
        self.instructions.push(instr);
    }

    /// Number of instructions
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// True when the program holds no instructions
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Every variable named anywhere in the program, defined or read
    pub fn variables(&self) -> BTreeSet<&IrVar> {
        let mut vars = BTreeSet::new();
        for instr in &self.instructions {
            if let Some(dst) = instr.dst() {
                vars.insert(dst);
            }
            vars.extend(instr.uses());
        }
        vars
    }
}

impl fmt::Display for IrProgram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for instr in &self.instructions {
            writeln!(f, "{}", instr)?;
        }
        Ok(())
    }
}
