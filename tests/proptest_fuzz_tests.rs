//! Property-based fuzzing tests for the tacrv back end
//!
//! These tests use proptest to generate random straight-line programs and
//! verify that:
//! 1. The same program always compiles to the same text
//! 2. Running the emitted RISC-V computes what the IR computes
//! 3. Frame setup and teardown are balanced
//! 4. No three-register instruction or multiply carries a literal
//! 5. Anything after the first RET has no effect on the output
//! 6. The textual reader never panics on arbitrary input
//! 7. The allocator keeps variable <-> register exclusive and never hands
//!    a live variable's stack slot to another variable

use proptest::prelude::*;
use std::collections::HashMap;
use tacrv::compiler::{PoolReg, RegisterAllocator, RiscvInstruction, RiscvReg, UsageTable};
use tacrv::{AsmListing, CompileOptions, Compiler, IrInstruction, IrProgram, IrValue, IrVar};

// =============================================================================
// STRATEGY GENERATORS
// =============================================================================

#[derive(Debug, Clone)]
enum Operand {
    /// Index into the variables defined so far
    Var(usize),
    Imm(i32),
}

type Step = (u8, usize, Operand, Operand);

fn operand() -> impl Strategy<Value = Operand> {
    prop_oneof![
        3 => (0usize..64).prop_map(Operand::Var),
        1 => (-3000i32..3000).prop_map(Operand::Imm),
        1 => any::<i32>().prop_map(Operand::Imm),
    ]
}

fn step() -> impl Strategy<Value = Step> {
    (0u8..4, 0usize..12, operand(), operand())
}

/// Program that only reads variables it already defined, with its dead tail
/// and without it
fn program_pair() -> impl Strategy<Value = (IrProgram, IrProgram)> {
    (
        prop::collection::vec(step(), 0..40),
        operand(),
        prop::collection::vec(step(), 0..6),
    )
        .prop_map(|(body, ret, tail)| {
            let mut defined: Vec<String> = Vec::new();
            let mut program = IrProgram::new();
            for s in &body {
                program.push(build_step(s, &mut defined));
            }
            program.push(IrInstruction::ret(resolve(&ret, &defined)));

            let trimmed = program.clone();
            for s in &tail {
                program.push(build_step(s, &mut defined));
            }
            (program, trimmed)
        })
}

fn resolve(op: &Operand, defined: &[String]) -> IrValue {
    match op {
        Operand::Var(i) if !defined.is_empty() => IrValue::var(defined[i % defined.len()].clone()),
        Operand::Var(i) => IrValue::imm(*i as i32),
        Operand::Imm(v) => IrValue::imm(*v),
    }
}

fn build_step((kind, dst, lhs, rhs): &Step, defined: &mut Vec<String>) -> IrInstruction {
    let lhs = resolve(lhs, defined);
    let rhs = resolve(rhs, defined);
    let name = format!("v{}", dst);
    let instr = match kind {
        0 => IrInstruction::mov(name.clone(), lhs),
        1 => IrInstruction::add(name.clone(), lhs, rhs),
        2 => IrInstruction::sub(name.clone(), lhs, rhs),
        _ => IrInstruction::mul(name.clone(), lhs, rhs),
    };
    if !defined.contains(&name) {
        defined.push(name);
    }
    instr
}

/// Variables the allocator-level properties juggle
const ALLOC_VARS: usize = 10;

#[derive(Debug, Clone)]
enum AllocStep {
    /// Acquire `var` while the registers of `pins` stay pending
    Acquire { var: usize, pins: Vec<usize> },
    Consume(usize),
}

fn alloc_step() -> impl Strategy<Value = AllocStep> {
    prop_oneof![
        3 => (0..ALLOC_VARS, prop::collection::vec(0..ALLOC_VARS, 0..3))
            .prop_map(|(var, pins)| AllocStep::Acquire { var, pins }),
        2 => (0..ALLOC_VARS).prop_map(AllocStep::Consume),
    ]
}

fn options(pool: usize) -> CompileOptions {
    CompileOptions {
        register_pool_size: pool,
        ..CompileOptions::default()
    }
}

// =============================================================================
// REFERENCE SEMANTICS
// =============================================================================

/// Value the IR returns, with wrapping 32-bit arithmetic
fn eval_ir(program: &IrProgram) -> Option<i32> {
    let mut env: HashMap<String, i32> = HashMap::new();
    let value = |v: &IrValue, env: &HashMap<String, i32>| match v {
        IrValue::Imm(k) => Some(*k),
        IrValue::Var(var) => env.get(var.name()).copied(),
    };
    for instr in &program.instructions {
        match instr {
            IrInstruction::Mov { dst, src } => {
                let v = value(src, &env)?;
                env.insert(dst.name().to_string(), v);
            }
            IrInstruction::Binary { op, dst, lhs, rhs } => {
                let v = op.eval(value(lhs, &env)?, value(rhs, &env)?);
                env.insert(dst.name().to_string(), v);
            }
            IrInstruction::Ret(v) => return value(v, &env),
        }
    }
    None
}

/// Execute a listing on a tiny RV32IM model and return `a0`
fn run_listing(listing: &AsmListing) -> Option<i32> {
    let mut regs: HashMap<RiscvReg, i32> = HashMap::new();
    let mut memory: HashMap<i64, i32> = HashMap::new();
    let mut sp: i64 = 0x10000;

    for instr in listing.instructions() {
        match instr {
            RiscvInstruction::Li(rd, imm) => {
                regs.insert(rd.clone(), *imm);
            }
            RiscvInstruction::Mv(rd, rs) => {
                let v = *regs.get(rs)?;
                regs.insert(rd.clone(), v);
            }
            RiscvInstruction::Addi(RiscvReg::Sp, RiscvReg::Sp, imm) => {
                sp += *imm as i64;
            }
            RiscvInstruction::Addi(rd, rs, imm) => {
                let v = regs.get(rs)?.wrapping_add(*imm);
                regs.insert(rd.clone(), v);
            }
            RiscvInstruction::Add(rd, a, b) => {
                let v = regs.get(a)?.wrapping_add(*regs.get(b)?);
                regs.insert(rd.clone(), v);
            }
            RiscvInstruction::Sub(rd, a, b) => {
                let v = regs.get(a)?.wrapping_sub(*regs.get(b)?);
                regs.insert(rd.clone(), v);
            }
            RiscvInstruction::Mul(rd, a, b) => {
                let v = regs.get(a)?.wrapping_mul(*regs.get(b)?);
                regs.insert(rd.clone(), v);
            }
            RiscvInstruction::Sw(rs, offset, RiscvReg::Sp) => {
                let v = *regs.get(rs)?;
                memory.insert(sp + *offset as i64, v);
            }
            RiscvInstruction::Lw(rd, offset, RiscvReg::Sp) => {
                let v = *memory.get(&(sp + *offset as i64))?;
                regs.insert(rd.clone(), v);
            }
            _ => return None,
        }
    }

    if sp != 0x10000 {
        return None;
    }
    regs.get(&RiscvReg::Ret("a0".to_string())).copied()
}

fn is_register(text: &str) -> bool {
    text.starts_with(|c: char| c.is_ascii_alphabetic())
}

// =============================================================================
// PROPERTIES
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Compiling twice yields identical text
    #[test]
    fn fuzz_deterministic((program, _) in program_pair(), pool in 3usize..=8) {
        let compiler = Compiler::new(options(pool));
        let first = compiler.compile(&program).unwrap();
        let second = compiler.compile(&program).unwrap();
        prop_assert_eq!(first.listing.dump(), second.listing.dump());
    }

    /// The emitted code returns the value the IR returns
    #[test]
    fn fuzz_listing_matches_ir((program, _) in program_pair(), pool in 3usize..=8) {
        let result = Compiler::new(options(pool)).compile(&program).unwrap();
        let expected = eval_ir(&program);
        prop_assert!(expected.is_some());
        prop_assert_eq!(run_listing(&result.listing), expected);
    }

    /// Frame lines appear in a matched pair, or not at all
    #[test]
    fn fuzz_frame_balance((program, _) in program_pair(), pool in 3usize..=8) {
        let result = Compiler::new(options(pool)).compile(&program).unwrap();
        let lines: Vec<String> = result.listing.lines().iter().map(|l| l.to_string()).collect();
        let frame = result.stats.frame_size;
        let frame_lines = lines.iter().filter(|l| l.contains("addi sp, sp,")).count();

        if frame > 0 {
            prop_assert_eq!(frame_lines, 2);
            prop_assert_eq!(&lines[1], &format!("    addi sp, sp, -{}", frame));
            prop_assert_eq!(&lines[lines.len() - 2], &format!("    addi sp, sp, {}", frame));
            prop_assert_eq!(frame % 4, 0);
        } else {
            prop_assert_eq!(frame_lines, 0);
            prop_assert_eq!(result.stats.stores, 0);
        }
    }

    /// Three-register instructions and multiplies name registers only
    #[test]
    fn fuzz_no_literal_in_register_forms((program, _) in program_pair(), pool in 3usize..=8) {
        let result = Compiler::new(options(pool)).compile(&program).unwrap();
        for instr in result.listing.instructions() {
            let text = instr.to_string();
            if instr.is_three_register() {
                let operands: Vec<&str> = text
                    .split_once(' ')
                    .map_or("", |(_, rest)| rest)
                    .split(',')
                    .map(str::trim)
                    .collect();
                prop_assert_eq!(operands.len(), 3);
                prop_assert!(operands.iter().all(|o| is_register(o)), "literal in `{}`", text);
            } else {
                prop_assert!(!text.starts_with("mul"), "multiply outside register form: `{}`", text);
            }
        }
        for instr in result.normalized.instructions.iter() {
            if let IrInstruction::Binary { op, lhs, rhs, .. } = instr {
                prop_assert!(!lhs.is_immediate());
                if *op == tacrv::compiler::BinaryOp::Mul {
                    prop_assert!(!rhs.is_immediate());
                }
            }
        }
    }

    /// Anything after the first RET is dropped without a trace
    #[test]
    fn fuzz_dead_tail_ignored((program, trimmed) in program_pair(), pool in 3usize..=8) {
        let compiler = Compiler::new(options(pool));
        let full = compiler.compile(&program).unwrap();
        let cut = compiler.compile(&trimmed).unwrap();
        prop_assert_eq!(full.listing.dump(), cut.listing.dump());
        let returns = full.normalized.instructions.iter().filter(|i| i.is_return()).count();
        prop_assert_eq!(returns, 1);
        prop_assert!(full.normalized.instructions.last().map(|i| i.is_return()).unwrap_or(false));
    }

    /// The reader never panics on arbitrary input
    #[test]
    fn fuzz_reader_no_panic(source in prop::string::string_regex(r"[\x00-\x7F]{0,200}").unwrap()) {
        let _ = IrProgram::parse(&source);
    }

    /// Rendered programs read back unchanged
    #[test]
    fn fuzz_reader_accepts_rendered_programs((program, _) in program_pair()) {
        let parsed = IrProgram::parse(&program.to_string()).unwrap();
        prop_assert_eq!(parsed, program);
    }

    /// Bindings stay one-to-one and live slots are never reassigned
    #[test]
    fn fuzz_allocator_exclusivity(
        counts in prop::collection::vec(0usize..5, ALLOC_VARS),
        steps in prop::collection::vec(alloc_step(), 1..80),
        pool in 3usize..=6,
    ) {
        let vars: Vec<IrVar> = (0..ALLOC_VARS).map(|i| IrVar::new(format!("v{}", i))).collect();
        let usage: UsageTable = vars.iter().cloned().zip(counts).collect();
        let mut alloc = RegisterAllocator::new(pool, 4, usage).unwrap();
        prop_assert_eq!(alloc.pool_size(), pool);

        for step in &steps {
            match step {
                AllocStep::Consume(i) => {
                    if alloc.usage().remaining(&vars[*i]).unwrap() > 0 {
                        alloc.consume(&vars[*i]).unwrap();
                    }
                }
                AllocStep::Acquire { var, pins } => {
                    let var = &vars[*var];

                    // operands still pending within the same instruction
                    let mut pinned: Vec<(IrVar, PoolReg)> = Vec::new();
                    for p in pins {
                        let other = &vars[*p];
                        if other == var || alloc.usage().remaining(other).unwrap() == 0 {
                            continue;
                        }
                        if let Some(reg) = alloc.register_of(other) {
                            if pinned.iter().all(|(_, r)| *r != reg) {
                                pinned.push((other.clone(), reg));
                            }
                        }
                    }
                    let excluded: Vec<PoolReg> = pinned.iter().map(|(_, r)| *r).collect();

                    let live_slots: Vec<(IrVar, u32)> = vars
                        .iter()
                        .filter(|v| alloc.usage().remaining(v).unwrap() > 0)
                        .filter_map(|v| alloc.slot_of(v).map(|slot| (v.clone(), slot)))
                        .collect();
                    let before = alloc.register_of(var);

                    let reg = alloc.acquire(var, &excluded).unwrap();
                    alloc.take_spill_code();

                    prop_assert_eq!(alloc.register_of(var), Some(reg));
                    match before {
                        Some(resident) => prop_assert_eq!(resident, reg),
                        None => prop_assert!(!excluded.contains(&reg)),
                    }
                    for (other, r) in &pinned {
                        prop_assert_eq!(alloc.occupant(*r), Some(other));
                    }

                    for v in &vars {
                        if let Some(r) = alloc.register_of(v) {
                            prop_assert_eq!(alloc.occupant(r), Some(v));
                        }
                    }
                    for idx in 0..alloc.pool_size() {
                        let r = PoolReg(idx as u8);
                        if let Some(v) = alloc.occupant(r) {
                            prop_assert_eq!(alloc.register_of(v), Some(r));
                        }
                    }

                    for (v, slot) in &live_slots {
                        prop_assert_eq!(alloc.slot_of(v), Some(*slot));
                    }
                }
            }
        }
    }
}
