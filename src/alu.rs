use std::cmp::Ordering;

use crate::ops;
use crate::runtime::Flag;

/// Result of a single ALU operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// Value to be written back to the destination register.
    Value(u8),
    /// `CMP` only touches the flag register.
    Compare(Flag),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AluError {
    Unsupported,
    DivideByZero,
}

/// Compute `a <op> b`. Unary operations ignore `b`.
///
/// All arithmetic wraps at 8 bits. Shifting by 8 or more clears the value.
pub fn execute(opcode: u8, a: u8, b: u8) -> Result<Outcome, AluError> {
    let val = match opcode {
        ops::ADD => a.wrapping_add(b),
        ops::SUB => a.wrapping_sub(b),
        ops::MUL => a.wrapping_mul(b),
        ops::DIV => a.checked_div(b).ok_or(AluError::DivideByZero)?,
        ops::MOD => a.checked_rem(b).ok_or(AluError::DivideByZero)?,
        ops::AND => a & b,
        ops::OR => a | b,
        ops::XOR => a ^ b,
        ops::NOT => !a,
        ops::INC => a.wrapping_add(1),
        ops::DEC => a.wrapping_sub(1),
        ops::SHL => a.checked_shl(b as u32).unwrap_or(0),
        ops::SHR => a.checked_shr(b as u32).unwrap_or(0),
        ops::CMP => return Ok(Outcome::Compare(compare(a, b))),
        _ => return Err(AluError::Unsupported),
    };
    Ok(Outcome::Value(val))
}

fn compare(a: u8, b: u8) -> Flag {
    match a.cmp(&b) {
        Ordering::Less => Flag::Less,
        Ordering::Equal => Flag::Equal,
        Ordering::Greater => Flag::Greater,
    }
}
