//! IR instruction definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Named IR variable (identity by name, unbounded lifetime within the block)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IrVar(pub String);

impl IrVar {
    /// Creates a variable with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Variable name
    pub fn name(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IrVar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Instruction operand: a variable or a 32-bit immediate
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IrValue {
    /// Variable operand, materialized in a register or a stack slot
    Var(IrVar),
    /// Immediate constant, no storage
    Imm(i32),
}

impl IrValue {
    /// Variable operand with the given name
    pub fn var(name: impl Into<String>) -> Self {
        IrValue::Var(IrVar::new(name))
    }

    /// Immediate operand
    pub fn imm(value: i32) -> Self {
        IrValue::Imm(value)
    }

    /// True for immediates
    pub fn is_immediate(&self) -> bool {
        matches!(self, IrValue::Imm(_))
    }

    /// The variable, if this operand is one
    pub fn as_var(&self) -> Option<&IrVar> {
        match self {
            IrValue::Var(var) => Some(var),
            IrValue::Imm(_) => None,
        }
    }

    /// The immediate, if this operand is one
    pub fn as_imm(&self) -> Option<i32> {
        match self {
            IrValue::Imm(value) => Some(*value),
            IrValue::Var(_) => None,
        }
    }
}

impl From<IrVar> for IrValue {
    fn from(var: IrVar) -> Self {
        IrValue::Var(var)
    }
}

impl From<i32> for IrValue {
    fn from(value: i32) -> Self {
        IrValue::Imm(value)
    }
}

impl fmt::Display for IrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrValue::Var(var) => write!(f, "{}", var),
            IrValue::Imm(value) => write!(f, "{}", value),
        }
    }
}

/// Binary arithmetic operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    /// dst = lhs + rhs
    Add,
    /// dst = lhs - rhs
    Sub,
    /// dst = lhs * rhs
    Mul,
}

impl BinaryOp {
    /// Evaluate with 32-bit wrapping semantics
    pub fn eval(self, lhs: i32, rhs: i32) -> i32 {
        match self {
            BinaryOp::Add => lhs.wrapping_add(rhs),
            BinaryOp::Sub => lhs.wrapping_sub(rhs),
            BinaryOp::Mul => lhs.wrapping_mul(rhs),
        }
    }

    /// Opcode as written in the textual IR
    pub fn opcode(self) -> &'static str {
        match self {
            BinaryOp::Add => "ADD",
            BinaryOp::Sub => "SUB",
            BinaryOp::Mul => "MUL",
        }
    }
}

/// IR instruction (three-address code, straight-line)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum IrInstruction {
    /// Copy: dst = src
    Mov {
        /// Destination variable
        dst: IrVar,
        /// Source operand
        src: IrValue,
    },
    /// Arithmetic: dst = lhs op rhs
    Binary {
        /// Operator
        op: BinaryOp,
        /// Destination variable
        dst: IrVar,
        /// Left operand
        lhs: IrValue,
        /// Right operand
        rhs: IrValue,
    },
    /// Terminal return; ends the stream
    Ret(IrValue),
}

impl IrInstruction {
    /// `MOV dst, src`
    pub fn mov(dst: impl Into<String>, src: impl Into<IrValue>) -> Self {
        IrInstruction::Mov {
            dst: IrVar::new(dst),
            src: src.into(),
        }
    }

    /// `op dst, lhs, rhs`
    pub fn binary(
        op: BinaryOp,
        dst: impl Into<String>,
        lhs: impl Into<IrValue>,
        rhs: impl Into<IrValue>,
    ) -> Self {
        IrInstruction::Binary {
            op,
            dst: IrVar::new(dst),
            lhs: lhs.into(),
            rhs: rhs.into(),
        }
    }

    /// `ADD dst, lhs, rhs`
    pub fn add(dst: impl Into<String>, lhs: impl Into<IrValue>, rhs: impl Into<IrValue>) -> Self {
        Self::binary(BinaryOp::Add, dst, lhs, rhs)
    }

    /// `SUB dst, lhs, rhs`
    pub fn sub(dst: impl Into<String>, lhs: impl Into<IrValue>, rhs: impl Into<IrValue>) -> Self {
        Self::binary(BinaryOp::Sub, dst, lhs, rhs)
    }

    /// `MUL dst, lhs, rhs`
    pub fn mul(dst: impl Into<String>, lhs: impl Into<IrValue>, rhs: impl Into<IrValue>) -> Self {
        Self::binary(BinaryOp::Mul, dst, lhs, rhs)
    }

    /// `RET value`
    pub fn ret(value: impl Into<IrValue>) -> Self {
        IrInstruction::Ret(value.into())
    }

    /// Defined variable, if any
    pub fn dst(&self) -> Option<&IrVar> {
        match self {
            IrInstruction::Mov { dst, .. } | IrInstruction::Binary { dst, .. } => Some(dst),
            IrInstruction::Ret(_) => None,
        }
    }

    /// Operands read by this instruction, in evaluation order
    pub fn operands(&self) -> Vec<&IrValue> {
        match self {
            IrInstruction::Mov { src, .. } => vec![src],
            IrInstruction::Binary { lhs, rhs, .. } => vec![lhs, rhs],
            IrInstruction::Ret(value) => vec![value],
        }
    }

    /// Variables read by this instruction (one entry per read)
    pub fn uses(&self) -> impl Iterator<Item = &IrVar> {
        self.operands().into_iter().filter_map(IrValue::as_var)
    }

    /// True for `RET`
    pub fn is_return(&self) -> bool {
        matches!(self, IrInstruction::Ret(_))
    }
}

impl fmt::Display for IrInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrInstruction::Mov { dst, src } => write!(f, "(MOV, {}, {})", dst, src),
            IrInstruction::Binary { op, dst, lhs, rhs } => {
                write!(f, "({}, {}, {}, {})", op.opcode(), dst, lhs, rhs)
            }
            IrInstruction::Ret(value) => write!(f, "(RET, {})", value),
        }
    }
}
