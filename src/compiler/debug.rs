//! Debug utilities for IR→RISC-V compilation
//!
//! Tools for inspecting IR, listings and allocation counters.

use super::ir::{BinaryOp, IrInstruction, IrProgram};
use super::regalloc::AllocationStats;
use super::riscv::AsmListing;

/// Print IR program in human-readable format
pub fn dump_ir(program: &IrProgram) {
    println!("═══════════════════════════════════════════════════════════");
    println!("                    IR DUMP");
    println!("═══════════════════════════════════════════════════════════");
    let vars: Vec<String> = program.variables().iter().map(|v| v.to_string()).collect();
    println!("Variables: {}", vars.join(", "));
    println!("───────────────────────────────────────────────────────────");
    print!("{}", format_ir(program));
    println!("═══════════════════════════════════════════════════════════\n");
}

/// Numbered listing of an IR program, one instruction per line
pub fn format_ir(program: &IrProgram) -> String {
    program
        .instructions
        .iter()
        .enumerate()
        .map(|(i, instr)| format!("{:04}: {}\n", i, format_ir_instr(instr)))
        .collect()
}

/// Format a single IR instruction in infix form
pub fn format_ir_instr(instr: &IrInstruction) -> String {
    match instr {
        IrInstruction::Mov { dst, src } => format!("{} = {}", dst, src),
        IrInstruction::Binary { op, dst, lhs, rhs } => {
            let sym = match op {
                BinaryOp::Add => "+",
                BinaryOp::Sub => "-",
                BinaryOp::Mul => "*",
            };
            format!("{} = {} {} {}", dst, lhs, sym, rhs)
        }
        IrInstruction::Ret(value) => format!("return {}", value),
    }
}

/// Print an assembly listing followed by its allocation counters
pub fn dump_listing(listing: &AsmListing, stats: &AllocationStats) {
    println!("═══════════════════════════════════════════════════════════");
    println!("                  ASSEMBLY LISTING");
    println!("═══════════════════════════════════════════════════════════");
    println!("{}", listing);
    println!("───────────────────────────────────────────────────────────");
    println!(
        "Stores: {}  Reloads: {}  Frame: {} bytes",
        stats.stores, stats.reloads, stats.frame_size
    );
    if !stats.spilled.is_empty() {
        let spilled: Vec<String> = stats.spilled.iter().map(|v| v.to_string()).collect();
        println!("Spilled: {}", spilled.join(", "));
    }
    println!("═══════════════════════════════════════════════════════════\n");
}
