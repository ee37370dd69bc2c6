//! Remaining-use counts for IR variables
//!
//! Counted once over the normalized program, then decremented by the emitter
//! as each operand is consumed. A variable at zero has no future reads, so a
//! register holding it can be reused without a spill store.

use super::ir::{IrProgram, IrVar};
use crate::{Error, Result};
use std::collections::HashMap;

/// Variable -> number of reads still ahead of the emission cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageTable {
    counts: HashMap<IrVar, usize>,
}

impl UsageTable {
    /// Count every operand read in `program`
    ///
    /// Destinations get an entry too (starting at zero), so a definition that
    /// is never read is known to be dead rather than unknown.
    pub fn analyze(program: &IrProgram) -> Self {
        let mut counts: HashMap<IrVar, usize> = HashMap::new();
        for instr in &program.instructions {
            if let Some(dst) = instr.dst() {
                counts.entry(dst.clone()).or_insert(0);
            }
            for var in instr.uses() {
                *counts.entry(var.clone()).or_insert(0) += 1;
            }
        }
        Self { counts }
    }

    /// Reads still pending for `var`
    pub fn remaining(&self, var: &IrVar) -> Result<usize> {
        self.counts
            .get(var)
            .copied()
            .ok_or_else(|| Error::unknown_usage(var.name()))
    }

    /// True once `var` has no pending reads
    pub fn is_dead(&self, var: &IrVar) -> Result<bool> {
        Ok(self.remaining(var)? == 0)
    }

    /// Record one read of `var`
    pub fn consume(&mut self, var: &IrVar) -> Result<()> {
        match self.counts.get_mut(var) {
            Some(count) if *count > 0 => {
                *count -= 1;
                Ok(())
            }
            _ => Err(Error::unknown_usage(var.name())),
        }
    }

    /// Variables defined or read but never read, sorted by name
    pub fn never_read(&self) -> Vec<&IrVar> {
        let mut vars: Vec<&IrVar> = self
            .counts
            .iter()
            .filter(|(_, count)| **count == 0)
            .map(|(var, _)| var)
            .collect();
        vars.sort();
        vars
    }

    /// Number of tracked variables
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// True when no variable is tracked
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

impl FromIterator<(IrVar, usize)> for UsageTable {
    fn from_iter<I: IntoIterator<Item = (IrVar, usize)>>(iter: I) -> Self {
        Self {
            counts: iter.into_iter().collect(),
        }
    }
}
