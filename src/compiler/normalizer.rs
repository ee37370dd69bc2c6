//! # IR Normalizer
//!
//! Rewrites the front end's listing into the shape the RISC-V emitter maps
//! one-to-one onto target instructions:
//! - Constant folding of binary instructions with two immediates
//! - Immediate canonicalization (`ADD` swaps a left immediate to the right)
//! - Immediate materialization through fresh temporaries where the target
//!   has no immediate form (`SUB`/`MUL` left immediate, `MUL` right immediate)
//! - Legalization of `addi` immediates outside the 12-bit signed range
//! - Dead-tail elimination after the first `RET`
//!
//! The pass builds a fresh instruction list; the input is never mutated.

use super::ir::{BinaryOp, IrInstruction, IrProgram, IrValue, IrVar};
use crate::Result;
use std::collections::HashSet;

/// Smallest immediate `addi` can encode
pub const ADDI_MIN: i32 = -2048;
/// Largest immediate `addi` can encode
pub const ADDI_MAX: i32 = 2047;

/// Single-pass IR normalizer
pub struct Normalizer {
    /// Names already used by the program or handed out as temporaries
    taken: HashSet<String>,
    /// Next candidate suffix for `$N` temporaries
    next_temp: usize,
    /// Materialize `addi` immediates the target cannot encode
    legalize_immediates: bool,
    /// Instructions dropped after the first `RET` in the last run
    discarded: usize,
}

impl Normalizer {
    /// Create a normalizer with immediate legalization enabled
    pub fn new() -> Self {
        Self {
            taken: HashSet::new(),
            next_temp: 0,
            legalize_immediates: true,
            discarded: 0,
        }
    }

    /// Enable or disable `addi` immediate legalization
    pub fn with_legalization(mut self, enabled: bool) -> Self {
        self.legalize_immediates = enabled;
        self
    }

    /// Number of instructions dropped after the first `RET` in the last run
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Normalize a program into a new one
    pub fn normalize(&mut self, program: &IrProgram) -> Result<IrProgram> {
        self.taken = program
            .variables()
            .into_iter()
            .map(|v| v.name().to_string())
            .collect();
        self.next_temp = 0;
        self.discarded = 0;

        let mut out = IrProgram::new();

        for (idx, instr) in program.instructions.iter().enumerate() {
            match instr {
                IrInstruction::Ret(_) => {
                    out.push(instr.clone());
                    self.discarded = program.len() - idx - 1;
                    break;
                }
                IrInstruction::Mov { .. } => out.push(instr.clone()),
                IrInstruction::Binary { op, dst, lhs, rhs } => {
                    self.normalize_binary(*op, dst, lhs, rhs, &mut out);
                }
            }
        }

        Ok(out)
    }

    fn normalize_binary(
        &mut self,
        op: BinaryOp,
        dst: &IrVar,
        lhs: &IrValue,
        rhs: &IrValue,
        out: &mut IrProgram,
    ) {
        match (lhs, rhs) {
            // Fold: both operands known at compile time
            (IrValue::Imm(a), IrValue::Imm(b)) => {
                out.push(IrInstruction::Mov {
                    dst: dst.clone(),
                    src: IrValue::Imm(op.eval(*a, *b)),
                });
            }

            // a + x = x + a
            (IrValue::Imm(_), IrValue::Var(_)) if op == BinaryOp::Add => {
                self.push_immediate_form(op, dst, rhs.clone(), lhs.clone(), out);
            }

            // imm - x, imm * x: no immediate form with a left immediate
            (IrValue::Imm(_), IrValue::Var(_)) => {
                let tmp = self.materialize(lhs.clone(), out);
                out.push(IrInstruction::Binary {
                    op,
                    dst: dst.clone(),
                    lhs: tmp,
                    rhs: rhs.clone(),
                });
            }

            // x * imm: no immediate multiply on the target
            (IrValue::Var(_), IrValue::Imm(_)) if op == BinaryOp::Mul => {
                let tmp = self.materialize(rhs.clone(), out);
                out.push(IrInstruction::Binary {
                    op,
                    dst: dst.clone(),
                    lhs: lhs.clone(),
                    rhs: tmp,
                });
            }

            (IrValue::Var(_), IrValue::Imm(_)) => {
                self.push_immediate_form(op, dst, lhs.clone(), rhs.clone(), out);
            }

            (IrValue::Var(_), IrValue::Var(_)) => {
                out.push(IrInstruction::Binary {
                    op,
                    dst: dst.clone(),
                    lhs: lhs.clone(),
                    rhs: rhs.clone(),
                });
            }
        }
    }

    /// Emit `op dst, var, imm`, materializing `imm` when `addi` cannot hold it
    fn push_immediate_form(
        &mut self,
        op: BinaryOp,
        dst: &IrVar,
        var: IrValue,
        imm: IrValue,
        out: &mut IrProgram,
    ) {
        let encodable = match (op, imm.as_imm()) {
            (BinaryOp::Add, Some(v)) => (ADDI_MIN..=ADDI_MAX).contains(&v),
            // sub becomes addi with the negated literal
            (BinaryOp::Sub, Some(v)) => {
                let negated = -(v as i64);
                (ADDI_MIN as i64..=ADDI_MAX as i64).contains(&negated)
            }
            _ => false,
        };

        let rhs = if encodable || !self.legalize_immediates {
            imm
        } else {
            self.materialize(imm, out)
        };

        out.push(IrInstruction::Binary {
            op,
            dst: dst.clone(),
            lhs: var,
            rhs,
        });
    }

    /// Emit `MOV tmp, value` and return `tmp` as an operand
    fn materialize(&mut self, value: IrValue, out: &mut IrProgram) -> IrValue {
        let tmp = self.fresh_temp();
        out.push(IrInstruction::Mov {
            dst: tmp.clone(),
            src: value,
        });
        IrValue::Var(tmp)
    }

    /// Lowest-numbered `$N` name not used anywhere in the program
    fn fresh_temp(&mut self) -> IrVar {
        loop {
            let name = format!("${}", self.next_temp);
            self.next_temp += 1;
            if self.taken.insert(name.clone()) {
                return IrVar::new(name);
            }
        }
    }
}

impl Default for Normalizer {
    fn default() -> Self {
        Self::new()
    }
}
