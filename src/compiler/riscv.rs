//! # RISC-V target model
//!
//! Registers, instructions and the assembly listing the emitter produces.
//! Only the RV32IM subset a straight-line arithmetic block needs is modeled.

use std::fmt;

// =============================================================================
// REGISTERS
// =============================================================================

/// Names of the allocatable integer registers, in pool order
pub const POOL_NAMES: [&str; 18] = [
    "t0", "t1", "t2", "t3", "t4", "t5", "t6", "s1", "s2", "s3", "s4", "s5", "s6", "s7", "s8",
    "s9", "s10", "s11",
];

/// Register of the allocatable pool, by pool index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolReg(pub u8);

impl PoolReg {
    /// Pool index
    pub fn index(self) -> usize {
        self.0 as usize
    }

    /// Assembly name (`t0`..`t6`, then `s1`..`s11`)
    pub fn name(self) -> &'static str {
        POOL_NAMES[self.index()]
    }
}

impl fmt::Display for PoolReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Register operand of an emitted instruction
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RiscvReg {
    /// Stack pointer
    Sp,
    /// Dedicated return-value register (named by the compile options)
    Ret(String),
    /// Allocatable pool register
    Pool(PoolReg),
}

impl From<PoolReg> for RiscvReg {
    fn from(reg: PoolReg) -> Self {
        RiscvReg::Pool(reg)
    }
}

impl fmt::Display for RiscvReg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiscvReg::Sp => f.write_str("sp"),
            RiscvReg::Ret(name) => f.write_str(name),
            RiscvReg::Pool(reg) => write!(f, "{}", reg),
        }
    }
}

// =============================================================================
// INSTRUCTIONS
// =============================================================================

/// Emitted RISC-V instruction (pseudo-instructions `li` and `mv` included)
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RiscvInstruction {
    /// li rd, imm
    Li(RiscvReg, i32),
    /// mv rd, rs
    Mv(RiscvReg, RiscvReg),
    /// addi rd, rs1, imm12
    Addi(RiscvReg, RiscvReg, i32),
    /// add rd, rs1, rs2
    Add(RiscvReg, RiscvReg, RiscvReg),
    /// sub rd, rs1, rs2
    Sub(RiscvReg, RiscvReg, RiscvReg),
    /// mul rd, rs1, rs2
    Mul(RiscvReg, RiscvReg, RiscvReg),
    /// lw rd, offset(base)
    Lw(RiscvReg, u32, RiscvReg),
    /// sw rs, offset(base)
    Sw(RiscvReg, u32, RiscvReg),
}

impl RiscvInstruction {
    /// Reload a spilled value: `lw reg, offset(sp)`
    pub fn reload(reg: PoolReg, offset: u32) -> Self {
        RiscvInstruction::Lw(reg.into(), offset, RiscvReg::Sp)
    }

    /// Spill a register: `sw reg, offset(sp)`
    pub fn spill(reg: PoolReg, offset: u32) -> Self {
        RiscvInstruction::Sw(reg.into(), offset, RiscvReg::Sp)
    }

    /// Move the stack pointer by `delta` bytes
    pub fn adjust_sp(delta: i32) -> Self {
        RiscvInstruction::Addi(RiscvReg::Sp, RiscvReg::Sp, delta)
    }

    /// Three-register instructions never carry a literal
    pub fn is_three_register(&self) -> bool {
        matches!(
            self,
            RiscvInstruction::Add(..) | RiscvInstruction::Sub(..) | RiscvInstruction::Mul(..)
        )
    }
}

impl fmt::Display for RiscvInstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiscvInstruction::Li(rd, imm) => write!(f, "li {}, {}", rd, imm),
            RiscvInstruction::Mv(rd, rs) => write!(f, "mv {}, {}", rd, rs),
            RiscvInstruction::Addi(rd, rs, imm) => write!(f, "addi {}, {}, {}", rd, rs, imm),
            RiscvInstruction::Add(rd, r1, r2) => write!(f, "add {}, {}, {}", rd, r1, r2),
            RiscvInstruction::Sub(rd, r1, r2) => write!(f, "sub {}, {}, {}", rd, r1, r2),
            RiscvInstruction::Mul(rd, r1, r2) => write!(f, "mul {}, {}, {}", rd, r1, r2),
            RiscvInstruction::Lw(rd, offset, base) => write!(f, "lw {}, {}({})", rd, offset, base),
            RiscvInstruction::Sw(rs, offset, base) => write!(f, "sw {}, {}({})", rs, offset, base),
        }
    }
}

// =============================================================================
// LISTING
// =============================================================================

/// One line of the assembly listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AsmLine {
    /// Section directive such as `.text`
    Section(String),
    /// Instruction, optionally echoing the IR instruction it implements
    Instr {
        /// Emitted instruction
        instr: RiscvInstruction,
        /// Source IR instruction text
        comment: Option<String>,
    },
}

impl AsmLine {
    /// Instruction line without a comment (spill, reload, frame code)
    pub fn plain(instr: RiscvInstruction) -> Self {
        AsmLine::Instr {
            instr,
            comment: None,
        }
    }

    /// Instruction line tagged with its IR instruction
    pub fn commented(instr: RiscvInstruction, comment: impl Into<String>) -> Self {
        AsmLine::Instr {
            instr,
            comment: Some(comment.into()),
        }
    }

    /// The instruction, unless this is a directive
    pub fn instruction(&self) -> Option<&RiscvInstruction> {
        match self {
            AsmLine::Instr { instr, .. } => Some(instr),
            AsmLine::Section(_) => None,
        }
    }
}

impl fmt::Display for AsmLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsmLine::Section(name) => f.write_str(name),
            AsmLine::Instr {
                instr,
                comment: Some(comment),
            } => write!(f, "    {}        #  {}", instr, comment),
            AsmLine::Instr {
                instr,
                comment: None,
            } => write!(f, "    {}", instr),
        }
    }
}

/// Ordered assembly listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AsmListing {
    lines: Vec<AsmLine>,
}

impl AsmListing {
    /// Create an empty listing
    pub fn new() -> Self {
        Self { lines: Vec::new() }
    }

    /// Append a line
    pub fn push(&mut self, line: AsmLine) {
        self.lines.push(line);
    }

    /// Insert a line before position `index`
    pub fn insert(&mut self, index: usize, line: AsmLine) {
        self.lines.insert(index, line);
    }

    /// All lines in order
    pub fn lines(&self) -> &[AsmLine] {
        &self.lines
    }

    /// Number of lines, directives included
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// True when nothing was emitted
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Instructions only, directives skipped
    pub fn instructions(&self) -> impl Iterator<Item = &RiscvInstruction> {
        self.lines.iter().filter_map(AsmLine::instruction)
    }

    /// Render as text, one line per entry, no trailing newline
    pub fn dump(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.to_string())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for AsmListing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.dump())
    }
}
