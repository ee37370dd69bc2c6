//! Reader for the textual IR listing written by the front end
//!
//! Each non-blank line holds one instruction:
//!
//! ```text
//! (MOV, a, 8)
//! (ADD, $0, a, 2)
//! (RET, $0)
//! ```

use super::instruction::{BinaryOp, IrInstruction, IrValue, IrVar};
use super::program::IrProgram;
use crate::{Error, Result};

/// Parse a whole listing
pub fn parse_program(source: &str) -> Result<IrProgram> {
    let mut program = IrProgram::new();
    for (idx, raw) in source.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let index = program.len();
        program.push(parse_instruction(line, idx + 1, index)?);
    }
    Ok(program)
}

/// Parse one `(OP, ...)` line; `line` is 1-based, `index` the instruction position
fn parse_instruction(text: &str, line: usize, index: usize) -> Result<IrInstruction> {
    let inner = text
        .strip_prefix('(')
        .and_then(|rest| rest.strip_suffix(')'))
        .ok_or_else(|| Error::parse(line, format!("expected `(OP, ...)`, got `{}`", text)))?;

    let fields: Vec<&str> = inner.split(',').map(str::trim).collect();
    let (opcode, operands) = fields
        .split_first()
        .ok_or_else(|| Error::parse(line, "empty instruction"))?;

    let expect_arity = |n: usize| -> Result<()> {
        if operands.len() == n {
            Ok(())
        } else {
            Err(Error::parse(
                line,
                format!(
                    "{} takes {} operand(s), got {}",
                    opcode,
                    n,
                    operands.len()
                ),
            ))
        }
    };

    match opcode.to_ascii_uppercase().as_str() {
        "MOV" => {
            expect_arity(2)?;
            let dst = parse_dst(operands[0], line, index)?;
            let src = parse_value(operands[1], line)?;
            Ok(IrInstruction::Mov { dst, src })
        }
        "ADD" | "SUB" | "MUL" => {
            expect_arity(3)?;
            let op = match opcode.to_ascii_uppercase().as_str() {
                "ADD" => BinaryOp::Add,
                "SUB" => BinaryOp::Sub,
                _ => BinaryOp::Mul,
            };
            let dst = parse_dst(operands[0], line, index)?;
            let lhs = parse_value(operands[1], line)?;
            let rhs = parse_value(operands[2], line)?;
            Ok(IrInstruction::Binary { op, dst, lhs, rhs })
        }
        "RET" => {
            expect_arity(1)?;
            Ok(IrInstruction::Ret(parse_value(operands[0], line)?))
        }
        other => Err(Error::parse(line, format!("unknown opcode `{}`", other))),
    }
}

fn parse_dst(text: &str, line: usize, index: usize) -> Result<IrVar> {
    match parse_value(text, line)? {
        IrValue::Var(var) => Ok(var),
        IrValue::Imm(value) => Err(Error::malformed(
            index,
            format!("destination `{}` is an immediate", value),
        )),
    }
}

fn parse_value(text: &str, line: usize) -> Result<IrValue> {
    if let Ok(value) = text.parse::<i32>() {
        return Ok(IrValue::Imm(value));
    }
    if is_identifier(text) {
        return Ok(IrValue::var(text));
    }
    Err(Error::parse(line, format!("invalid operand `{}`", text)))
}

fn is_identifier(text: &str) -> bool {
    let mut chars = text.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}
