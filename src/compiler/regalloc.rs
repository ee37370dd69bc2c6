//! # Online LRU Register Allocator
//!
//! Binds IR variables to a fixed pool of physical registers while the
//! emitter walks the program, spilling to 4-byte stack slots when the pool
//! runs out. Acquisition policy, tried in order:
//! 1. Resident: the variable already sits in a register
//! 2. Free: an unbound register exists
//! 3. Retired: a register holds a variable with no pending reads
//! 4. Forced: evict the least-recently-used register outside the exclusion
//!    set, storing its occupant to a stack slot first
//!
//! Steps 2-4 reload the variable from its slot when it has one. The
//! variable <-> register and variable <-> slot tables are bijections, so no
//! register ever holds two variables and no variable lives in two registers.

use super::bimap::BiMap;
use super::ir::IrVar;
use super::riscv::{PoolReg, RiscvInstruction, POOL_NAMES};
use super::usage::UsageTable;
use crate::{Error, Result};
use lru::LruCache;
use std::collections::BTreeSet;

/// Spill/reload counters for one run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllocationStats {
    /// Number of `sw` spill stores emitted
    pub stores: usize,
    /// Number of `lw` reloads emitted
    pub reloads: usize,
    /// Distinct variables that were ever stored to the stack
    pub spilled: BTreeSet<IrVar>,
    /// Spill area size in bytes, rounded up to the stack alignment
    pub frame_size: u32,
}

/// Register allocator state for one compilation run
pub struct RegisterAllocator {
    /// Number of allocatable registers
    pool_size: usize,
    /// Bytes per spill slot
    slot_size: u32,
    /// Alignment of the whole spill area
    stack_alignment: u32,
    /// Remaining reads per variable
    usage: UsageTable,
    /// Variable <-> register
    registers: BiMap<IrVar, PoolReg>,
    /// Variable <-> stack slot offset
    slots: BiMap<IrVar, u32>,
    /// Register recency; least recently used comes out of `iter().rev()` first
    recency: LruCache<PoolReg, ()>,
    /// Bytes of spill area handed out so far
    depth: u32,
    /// Spill/reload code produced since the last `take_spill_code`
    pending: Vec<RiscvInstruction>,
    stats: AllocationStats,
}

impl RegisterAllocator {
    /// Create an allocator over `pool_size` registers with `slot_size`-byte slots
    pub fn new(pool_size: usize, slot_size: u32, usage: UsageTable) -> Result<Self> {
        if pool_size == 0 || pool_size > POOL_NAMES.len() {
            return Err(Error::InvalidOptions(format!(
                "register pool size must be between 1 and {}, got {}",
                POOL_NAMES.len(),
                pool_size
            )));
        }
        if slot_size == 0 {
            return Err(Error::InvalidOptions("spill slot size must be non-zero".into()));
        }

        // Initial recency is ascending index, so ties go to the lowest register
        let mut recency = LruCache::unbounded();
        for idx in 0..pool_size {
            recency.put(PoolReg(idx as u8), ());
        }

        Ok(Self {
            pool_size,
            slot_size,
            stack_alignment: slot_size,
            usage,
            registers: BiMap::new(),
            slots: BiMap::new(),
            recency,
            depth: 0,
            pending: Vec::new(),
            stats: AllocationStats::default(),
        })
    }

    /// Round the reported frame size up to `alignment` bytes
    pub fn with_alignment(mut self, alignment: u32) -> Self {
        self.stack_alignment = alignment.max(1);
        self
    }

    /// Return a register holding `var`, never one listed in `excluded`
    /// unless `var` already lives there
    ///
    /// Spill and reload instructions needed to make room are queued and must
    /// be collected with [`take_spill_code`](Self::take_spill_code) before the
    /// instruction that uses the register is emitted.
    pub fn acquire(&mut self, var: &IrVar, excluded: &[PoolReg]) -> Result<PoolReg> {
        // 1. Already resident
        if let Some(&reg) = self.registers.get_by_key(var) {
            self.recency.promote(&reg);
            tracing::trace!(var = %var, reg = %reg, "resident");
            return Ok(reg);
        }

        let order = self.lru_order();

        // 2. Free register
        if let Some(&reg) = order
            .iter()
            .find(|reg| !self.registers.contains_value(reg) && !excluded.contains(reg))
        {
            tracing::trace!(var = %var, reg = %reg, "free register");
            self.bind(var, reg);
            return Ok(reg);
        }

        // 3. Retired register: occupant has no pending reads, drop it silently
        for &reg in &order {
            if excluded.contains(&reg) {
                continue;
            }
            let retired = match self.registers.get_by_value(&reg) {
                Some(occupant) => self.usage.is_dead(occupant)?,
                None => false,
            };
            if retired {
                tracing::trace!(var = %var, reg = %reg, "reusing retired register");
                self.bind(var, reg);
                return Ok(reg);
            }
        }

        // 4. Forced eviction of the least recently used usable register
        let reg = order
            .iter()
            .copied()
            .find(|reg| !excluded.contains(reg))
            .ok_or_else(|| Error::NoEvictableRegister {
                pool_size: self.pool_size,
                excluded: excluded.iter().map(|r| r.to_string()).collect(),
            })?;

        if let Some(occupant) = self.registers.get_by_value(&reg).cloned() {
            let offset = self.slot_for(&occupant)?;
            tracing::debug!(var = %occupant, reg = %reg, offset, "spill");
            self.pending.push(RiscvInstruction::spill(reg, offset));
            self.slots.insert(occupant.clone(), offset);
            self.stats.stores += 1;
            self.stats.spilled.insert(occupant);
        }

        self.bind(var, reg);
        Ok(reg)
    }

    /// Record one read of `var`
    pub fn consume(&mut self, var: &IrVar) -> Result<()> {
        self.usage.consume(var)
    }

    /// Spill/reload instructions queued by the last acquisitions, in order
    pub fn take_spill_code(&mut self) -> Vec<RiscvInstruction> {
        std::mem::take(&mut self.pending)
    }

    /// Register currently holding `var`
    pub fn register_of(&self, var: &IrVar) -> Option<PoolReg> {
        self.registers.get_by_key(var).copied()
    }

    /// Variable currently held by `reg`
    pub fn occupant(&self, reg: PoolReg) -> Option<&IrVar> {
        self.registers.get_by_value(&reg)
    }

    /// Stack slot recorded for `var`
    pub fn slot_of(&self, var: &IrVar) -> Option<u32> {
        self.slots.get_by_key(var).copied()
    }

    /// Remaining reads per variable
    pub fn usage(&self) -> &UsageTable {
        &self.usage
    }

    /// Number of allocatable registers
    pub fn pool_size(&self) -> usize {
        self.pool_size
    }

    /// Spill area size in bytes, rounded up to the stack alignment
    pub fn frame_size(&self) -> u32 {
        let align = self.stack_alignment;
        self.depth.div_ceil(align) * align
    }

    /// Counters for the run so far
    pub fn stats(&self) -> AllocationStats {
        AllocationStats {
            frame_size: self.frame_size(),
            ..self.stats.clone()
        }
    }

    /// Pool registers from least to most recently used
    fn lru_order(&self) -> Vec<PoolReg> {
        self.recency.iter().rev().map(|(reg, _)| *reg).collect()
    }

    /// Bind `var` to `reg`, mark it most recently used, reload if spilled
    fn bind(&mut self, var: &IrVar, reg: PoolReg) {
        self.registers.insert(var.clone(), reg);
        self.recency.promote(&reg);
        if let Some(&offset) = self.slots.get_by_key(var) {
            tracing::debug!(var = %var, reg = %reg, offset, "reload");
            self.pending.push(RiscvInstruction::reload(reg, offset));
            self.stats.reloads += 1;
        }
    }

    /// Slot to store `occupant` into: its own, a dead one, or a new one
    fn slot_for(&mut self, occupant: &IrVar) -> Result<u32> {
        if let Some(&offset) = self.slots.get_by_key(occupant) {
            return Ok(offset);
        }

        let mut offset = 0;
        while offset < self.depth {
            let reusable = match self.slots.get_by_value(&offset) {
                Some(holder) => self.usage.is_dead(holder)?,
                None => true,
            };
            if reusable {
                return Ok(offset);
            }
            offset += self.slot_size;
        }

        self.depth += self.slot_size;
        Ok(offset)
    }
}
