use std::num::ParseIntError;
use std::ops::Range;

use miette::{miette, LabeledSpan, Report, Severity};

use crate::fault::{Access, Fault};
use crate::runtime::MEMORY_SIZE;

// Loader errors

pub fn load_bad_lit(span: Range<usize>, src: &str, e: ParseIntError) -> Report {
    miette!(
        severity = Severity::Error,
        code = "load::bad_lit",
        help = "each line must hold one byte written in binary, like 10000010",
        labels = vec![LabeledSpan::at(span, "incorrect literal")],
        "Encountered an invalid binary literal: {e}",
    )
    .with_source_code(src.to_string())
}

pub fn load_too_large(span: Range<usize>, src: &str) -> Report {
    miette!(
        severity = Severity::Error,
        code = "load::too_large",
        help = format!("programs may use at most {MEMORY_SIZE} bytes"),
        labels = vec![LabeledSpan::at(span, "first byte past the end of memory")],
        "Program does not fit in memory",
    )
    .with_source_code(src.to_string())
}

pub fn load_too_large_raw(len: usize) -> Report {
    miette!(
        severity = Severity::Error,
        code = "load::too_large",
        help = format!("programs may use at most {MEMORY_SIZE} bytes"),
        "Program of {len} bytes does not fit in memory",
    )
}

// Runtime errors

/// Turn a machine fault into a diagnostic for the terminal.
pub fn fault_report(fault: Fault) -> Report {
    match fault {
        Fault::UnknownOpcode { .. } => miette!(
            severity = Severity::Error,
            code = "runtime::unknown_opcode",
            help = "the program image is corrupt, or jumped into data",
            "{fault}",
        ),
        Fault::UnsupportedAluOp { .. } => miette!(
            severity = Severity::Error,
            code = "runtime::unsupported_alu_op",
            help = "this is a bug in the emulator, please report it",
            "{fault}",
        ),
        Fault::DivideByZero { .. } => miette!(
            severity = Severity::Error,
            code = "runtime::divide_by_zero",
            help = "check the divisor register with CMP before DIV or MOD",
            "{fault}",
        ),
        Fault::OutOfBounds {
            access: Access::Register(_),
            ..
        } => miette!(
            severity = Severity::Error,
            code = "runtime::out_of_bounds",
            help = "only registers R0 to R7 exist",
            "{fault}",
        ),
        Fault::OutOfBounds {
            access: Access::ProgramCounter(_),
            ..
        } => miette!(
            severity = Severity::Error,
            code = "runtime::out_of_bounds",
            help = "the program is probably missing a HLT",
            "{fault}",
        ),
        Fault::Output { .. } => miette!(
            severity = Severity::Error,
            code = "runtime::output",
            "{fault}",
        ),
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fault_codes() {
        let cases = [
            (
                Fault::UnknownOpcode { opcode: 0xFF, pc: 4 },
                "runtime::unknown_opcode",
            ),
            (
                Fault::DivideByZero { opcode: 0b1010_0011, pc: 4 },
                "runtime::divide_by_zero",
            ),
            (
                Fault::OutOfBounds {
                    pc: 4,
                    access: Access::Register(9),
                },
                "runtime::out_of_bounds",
            ),
        ];
        for (fault, code) in cases {
            let report = fault_report(fault);
            assert_eq!(report.code().unwrap().to_string(), code);
            assert!(report.to_string().contains("0x04"), "{report}");
        }
    }

    #[test]
    fn fault_messages_name_the_instruction() {
        let report = fault_report(Fault::DivideByZero {
            opcode: 0b1010_0100,
            pc: 0x10,
        });
        assert_eq!(report.to_string(), "Division by zero in MOD at address 0x10");
    }
}
