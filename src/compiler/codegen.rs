//! # RISC-V Code Generator
//!
//! Lowers IR into an RV32IM assembly listing in one linear pass:
//! 1. Normalize the program (folding, immediate placement, dead tail)
//! 2. Count remaining reads per variable
//! 3. Walk the normalized instructions, asking the allocator for registers
//!    and emitting spill/reload code ahead of each instruction that needs it
//! 4. Wrap the body with stack frame setup and teardown if anything spilled
//!
//! Every emitted instruction line carries the IR instruction it implements
//! as a trailing comment; spill, reload and frame lines do not.

use super::ir::{BinaryOp, IrInstruction, IrProgram, IrValue, IrVar};
use super::normalizer::Normalizer;
use super::regalloc::{AllocationStats, RegisterAllocator};
use super::riscv::{AsmLine, AsmListing, PoolReg, RiscvInstruction, RiscvReg};
use super::usage::UsageTable;
use super::CompileOptions;
use crate::{Error, Result};

/// Everything one run of the code generator produces
#[derive(Debug, Clone)]
pub struct CodegenOutput {
    /// Final assembly listing
    pub listing: AsmListing,
    /// Program after normalization, as it was lowered
    pub normalized: IrProgram,
    /// Spill/reload counters and frame size
    pub stats: AllocationStats,
    /// Instructions dropped after the first `RET`
    pub discarded: usize,
    /// Variables defined but never read
    pub never_read: Vec<IrVar>,
}

/// RISC-V code generator
pub struct RiscvCodegen {
    options: CompileOptions,
    /// Listing under construction
    listing: AsmListing,
}

impl RiscvCodegen {
    /// Create a code generator for the given options
    pub fn new(options: CompileOptions) -> Self {
        Self {
            options,
            listing: AsmListing::new(),
        }
    }

    /// Normalize and lower a program
    pub fn generate(&mut self, program: &IrProgram) -> Result<CodegenOutput> {
        let mut normalizer =
            Normalizer::new().with_legalization(self.options.legalize_immediates);
        let normalized = normalizer.normalize(program)?;
        tracing::debug!(
            input = program.len(),
            output = normalized.len(),
            discarded = normalizer.discarded(),
            "normalized IR"
        );

        let usage = UsageTable::analyze(&normalized);
        let never_read = usage.never_read().into_iter().cloned().collect();

        let (listing, stats) = self.lower_with(&normalized, usage)?;

        Ok(CodegenOutput {
            listing,
            normalized,
            stats,
            discarded: normalizer.discarded(),
            never_read,
        })
    }

    /// Lower an already-normalized program
    ///
    /// Fails with [`Error::MalformedInstruction`] when an operand sits where
    /// the target has no immediate form (left operand, or either side of a
    /// multiply).
    pub fn lower(&mut self, normalized: &IrProgram) -> Result<(AsmListing, AllocationStats)> {
        let usage = UsageTable::analyze(normalized);
        self.lower_with(normalized, usage)
    }

    fn lower_with(
        &mut self,
        normalized: &IrProgram,
        usage: UsageTable,
    ) -> Result<(AsmListing, AllocationStats)> {
        tracing::debug!(variables = usage.len(), "usage counted");

        let mut alloc = RegisterAllocator::new(
            self.options.register_pool_size,
            self.options.spill_slot_size,
            usage,
        )?
        .with_alignment(self.options.stack_alignment);

        self.listing = AsmListing::new();
        self.listing
            .push(AsmLine::Section(self.options.section_directive.clone()));

        for (index, instr) in normalized.instructions.iter().enumerate() {
            self.gen_instruction(index, instr, &mut alloc)?;
        }

        let frame = alloc.frame_size();
        if frame > 0 {
            let frame = frame as i32;
            self.listing
                .insert(1, AsmLine::plain(RiscvInstruction::adjust_sp(-frame)));
            let teardown = AsmLine::plain(RiscvInstruction::adjust_sp(frame));
            let returns = normalized
                .instructions
                .last()
                .map_or(false, IrInstruction::is_return);
            if returns {
                // teardown sits right before the return-register line
                let last = self.listing.len() - 1;
                self.listing.insert(last, teardown);
            } else {
                self.listing.push(teardown);
            }
        }

        let stats = alloc.stats();
        tracing::debug!(
            lines = self.listing.len(),
            stores = stats.stores,
            reloads = stats.reloads,
            frame = stats.frame_size,
            "emitted listing"
        );

        Ok((std::mem::take(&mut self.listing), stats))
    }

    fn gen_instruction(
        &mut self,
        index: usize,
        ir: &IrInstruction,
        alloc: &mut RegisterAllocator,
    ) -> Result<()> {
        match ir {
            IrInstruction::Ret(IrValue::Imm(value)) => {
                let instr = RiscvInstruction::Li(self.ret_reg(), *value);
                self.emit(alloc, instr, ir);
            }

            IrInstruction::Ret(IrValue::Var(var)) => {
                let src = alloc.acquire(var, &[])?;
                alloc.consume(var)?;
                let instr = RiscvInstruction::Mv(self.ret_reg(), src.into());
                self.emit(alloc, instr, ir);
            }

            IrInstruction::Mov {
                dst,
                src: IrValue::Imm(value),
            } => {
                let rd = alloc.acquire(dst, &[])?;
                self.emit(alloc, RiscvInstruction::Li(rd.into(), *value), ir);
            }

            IrInstruction::Mov {
                dst,
                src: IrValue::Var(src),
            } => {
                let rs = alloc.acquire(src, &[])?;
                // src is still pending within this instruction
                let rd = alloc.acquire(dst, &[rs])?;
                alloc.consume(src)?;
                self.emit(alloc, RiscvInstruction::Mv(rd.into(), rs.into()), ir);
            }

            IrInstruction::Binary { op, dst, lhs, rhs } => {
                let lhs = lhs.as_var().ok_or_else(|| {
                    Error::malformed(index, format!("immediate left operand in {}", ir))
                })?;

                match rhs {
                    IrValue::Imm(_) if *op == BinaryOp::Mul => {
                        return Err(Error::malformed(
                            index,
                            format!("immediate multiply operand in {}", ir),
                        ));
                    }
                    IrValue::Imm(imm) => {
                        let rl = alloc.acquire(lhs, &[])?;
                        let rd = alloc.acquire(dst, &[rl])?;
                        alloc.consume(lhs)?;
                        let imm = match op {
                            BinaryOp::Sub => imm.wrapping_neg(),
                            _ => *imm,
                        };
                        let instr = RiscvInstruction::Addi(rd.into(), rl.into(), imm);
                        self.emit(alloc, instr, ir);
                    }
                    IrValue::Var(rhs) => {
                        let rl = alloc.acquire(lhs, &[])?;
                        let rr = alloc.acquire(rhs, &[rl])?;
                        let rd = alloc.acquire(dst, &[rl, rr])?;
                        alloc.consume(lhs)?;
                        alloc.consume(rhs)?;
                        let instr = three_register(*op, rd, rl, rr);
                        self.emit(alloc, instr, ir);
                    }
                }
            }
        }
        Ok(())
    }

    /// Flush pending spill code, then append the instruction tagged with `ir`
    fn emit(&mut self, alloc: &mut RegisterAllocator, instr: RiscvInstruction, ir: &IrInstruction) {
        for spill in alloc.take_spill_code() {
            self.listing.push(AsmLine::plain(spill));
        }
        self.listing.push(AsmLine::commented(instr, ir.to_string()));
    }

    fn ret_reg(&self) -> RiscvReg {
        RiscvReg::Ret(self.options.return_register.clone())
    }
}

fn three_register(op: BinaryOp, rd: PoolReg, rl: PoolReg, rr: PoolReg) -> RiscvInstruction {
    let (rd, rl, rr): (RiscvReg, RiscvReg, RiscvReg) = (rd.into(), rl.into(), rr.into());
    match op {
        BinaryOp::Add => RiscvInstruction::Add(rd, rl, rr),
        BinaryOp::Sub => RiscvInstruction::Sub(rd, rl, rr),
        BinaryOp::Mul => RiscvInstruction::Mul(rd, rl, rr),
    }
}
