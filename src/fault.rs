use std::error::Error;
use std::fmt;
use std::io;

use crate::alu::AluError;
use crate::ops;

/// Fatal condition raised by the machine. Execution cannot continue past one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Fault {
    UnknownOpcode { opcode: u8, pc: u8 },
    UnsupportedAluOp { opcode: u8, pc: u8 },
    DivideByZero { opcode: u8, pc: u8 },
    OutOfBounds { pc: u8, access: Access },
    /// `PRN` could not write to its output stream.
    Output { pc: u8, kind: io::ErrorKind },
}

/// What was out of bounds.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    /// Register index outside of `R0`-`R7`.
    Register(u8),
    /// Program counter was advanced past the end of memory.
    ProgramCounter(u16),
}

impl Fault {
    pub(crate) fn from_alu(error: AluError, opcode: u8, pc: u8) -> Self {
        match error {
            AluError::Unsupported => Self::UnsupportedAluOp { opcode, pc },
            AluError::DivideByZero => Self::DivideByZero { opcode, pc },
        }
    }

    /// Address of the instruction which faulted.
    pub fn pc(&self) -> u8 {
        match *self {
            Self::UnknownOpcode { pc, .. }
            | Self::UnsupportedAluOp { pc, .. }
            | Self::DivideByZero { pc, .. }
            | Self::OutOfBounds { pc, .. }
            | Self::Output { pc, .. } => pc,
        }
    }
}

impl Error for Fault {}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::UnknownOpcode { opcode, pc } => {
                write!(f, "Unknown opcode {opcode:#010b} at address {pc:#04x}")
            }
            Self::UnsupportedAluOp { opcode, pc } => write!(
                f,
                "Unsupported ALU operation {} at address {pc:#04x}",
                Mnemonic(opcode)
            ),
            Self::DivideByZero { opcode, pc } => write!(
                f,
                "Division by zero in {} at address {pc:#04x}",
                Mnemonic(opcode)
            ),
            Self::OutOfBounds { pc, access } => match access {
                Access::Register(index) => {
                    write!(f, "Register R{index} does not exist (at address {pc:#04x})")
                }
                Access::ProgramCounter(target) => write!(
                    f,
                    "Program counter ran off the end of memory ({target:#x}) from address {pc:#04x}"
                ),
            },
            Self::Output { pc, kind } => {
                write!(f, "Failed to write output at address {pc:#04x}: {kind}")
            }
        }
    }
}

struct Mnemonic(u8);

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match ops::mnemonic(self.0) {
            Some(name) => write!(f, "{name}"),
            None => write!(f, "{:#010b}", self.0),
        }
    }
}
