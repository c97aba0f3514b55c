//! LS-8 opcode bytes.
//!
//! Every opcode is laid out as `AABCDDDD`:
//! - `AA`: number of operand bytes that follow (0-2)
//! - `B`: set if the instruction goes through the ALU
//! - `C`: set if the instruction sets the program counter itself
//! - `DDDD`: instruction identifier

pub const NOP: u8 = 0b0000_0000;
pub const HLT: u8 = 0b0000_0001;
pub const RET: u8 = 0b0001_0001;

pub const CALL: u8 = 0b0101_0000;
pub const JMP: u8 = 0b0101_0100;
pub const JEQ: u8 = 0b0101_0101;
pub const JNE: u8 = 0b0101_0110;
pub const JGT: u8 = 0b0101_0111;
pub const JLT: u8 = 0b0101_1000;
pub const JLE: u8 = 0b0101_1001;
pub const JGE: u8 = 0b0101_1010;

pub const PUSH: u8 = 0b0100_0101;
pub const POP: u8 = 0b0100_0110;
pub const PRN: u8 = 0b0100_0111;
pub const LDI: u8 = 0b1000_0010;

// ALU
pub const ADD: u8 = 0b1010_0000;
pub const SUB: u8 = 0b1010_0001;
pub const MUL: u8 = 0b1010_0010;
pub const DIV: u8 = 0b1010_0011;
pub const MOD: u8 = 0b1010_0100;
pub const INC: u8 = 0b0110_0101;
pub const DEC: u8 = 0b0110_0110;
pub const CMP: u8 = 0b1010_0111;
pub const AND: u8 = 0b1010_1000;
pub const NOT: u8 = 0b0110_1001;
pub const OR: u8 = 0b1010_1010;
pub const XOR: u8 = 0b1010_1011;
pub const SHL: u8 = 0b1010_1100;
pub const SHR: u8 = 0b1010_1101;

/// Total size of an instruction in bytes, opcode included.
#[inline]
pub const fn width(opcode: u8) -> u8 {
    (opcode >> 6) + 1
}

/// Whether the opcode belongs to the ALU group.
#[inline]
pub const fn is_alu(opcode: u8) -> bool {
    opcode & 0b0010_0000 != 0
}

pub fn mnemonic(opcode: u8) -> Option<&'static str> {
    let name = match opcode {
        NOP => "NOP",
        HLT => "HLT",
        RET => "RET",
        CALL => "CALL",
        JMP => "JMP",
        JEQ => "JEQ",
        JNE => "JNE",
        JGT => "JGT",
        JLT => "JLT",
        JLE => "JLE",
        JGE => "JGE",
        PUSH => "PUSH",
        POP => "POP",
        PRN => "PRN",
        LDI => "LDI",
        ADD => "ADD",
        SUB => "SUB",
        MUL => "MUL",
        DIV => "DIV",
        MOD => "MOD",
        INC => "INC",
        DEC => "DEC",
        CMP => "CMP",
        AND => "AND",
        NOT => "NOT",
        OR => "OR",
        XOR => "XOR",
        SHL => "SHL",
        SHR => "SHR",
        _ => return None,
    };
    Some(name)
}
