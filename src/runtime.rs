use std::io::{self, Write};

use crate::alu::{self, Outcome};
use crate::fault::{Access, Fault};
use crate::loader::Image;
use crate::ops;
use crate::output;

/// LS-8 can address 256 bytes of memory.
pub const MEMORY_SIZE: usize = 0x100;
pub const REGISTER_COUNT: usize = 8;
/// Register reserved for the stack pointer.
pub const SP: u8 = 7;
/// Stack pointer after reset. The stack grows down from here.
pub const STACK_START: u8 = 0xF4;

/// Comparison flag, as stored in the `FL` register (`00000LGE`).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flag {
    Less = 0b100,
    Greater = 0b010,
    Equal = 0b001,
    /// No `CMP` has run yet.
    Uninit = 0b000,
}

impl Flag {
    #[inline]
    fn is_set(self, mask: u8) -> bool {
        self as u8 & mask != 0
    }
}

type Handler<W> = fn(&mut Cpu<W>, u8, u8) -> Result<(), Fault>;

/// Complete machine state. PRN output is written to `W`.
pub struct Cpu<W = io::Stdout> {
    mem: [u8; MEMORY_SIZE],
    /// Program counter
    pc: u8,
    /// 8x 8-bit registers, R7 is the stack pointer
    reg: [u8; REGISTER_COUNT],
    flag: Flag,
    running: bool,
    trace: bool,
    out: W,
}

impl Cpu<io::Stdout> {
    pub fn with_stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Cpu<W> {
    pub fn new(out: W) -> Self {
        let mut cpu = Cpu {
            mem: [0; MEMORY_SIZE],
            pc: 0,
            reg: [0; REGISTER_COUNT],
            flag: Flag::Uninit,
            running: true,
            trace: false,
            out,
        };
        cpu.reset();
        cpu
    }

    /// Clear memory, registers and flags; point the stack at [`STACK_START`].
    pub fn reset(&mut self) {
        self.mem = [0; MEMORY_SIZE];
        self.reg = [0; REGISTER_COUNT];
        self.reg[SP as usize] = STACK_START;
        self.pc = 0;
        self.flag = Flag::Uninit;
        self.running = true;
    }

    /// Copy a program image into memory starting at address 0.
    pub fn load(&mut self, image: &Image) {
        let bytes = image.as_bytes();
        self.mem[..bytes.len()].copy_from_slice(bytes);
    }

    /// Print a trace line to stderr before every cycle.
    pub fn set_trace(&mut self, trace: bool) {
        self.trace = trace;
    }

    const OP_TABLE: [Option<Handler<W>>; MEMORY_SIZE] = {
        let mut table: [Option<Handler<W>>; MEMORY_SIZE] = [None; MEMORY_SIZE];
        table[ops::NOP as usize] = Some(Self::nop);
        table[ops::HLT as usize] = Some(Self::hlt);
        table[ops::LDI as usize] = Some(Self::ldi);
        table[ops::PRN as usize] = Some(Self::prn);
        table[ops::PUSH as usize] = Some(Self::push);
        table[ops::POP as usize] = Some(Self::pop);
        table[ops::CALL as usize] = Some(Self::call);
        table[ops::RET as usize] = Some(Self::ret);
        table[ops::JMP as usize] = Some(Self::jmp);
        table[ops::JEQ as usize] = Some(Self::jeq);
        table[ops::JNE as usize] = Some(Self::jne);
        table[ops::JGT as usize] = Some(Self::jgt);
        table[ops::JLT as usize] = Some(Self::jlt);
        table[ops::JLE as usize] = Some(Self::jle);
        table[ops::JGE as usize] = Some(Self::jge);
        table[ops::ADD as usize] = Some(Self::alu);
        table[ops::SUB as usize] = Some(Self::alu);
        table[ops::MUL as usize] = Some(Self::alu);
        table[ops::DIV as usize] = Some(Self::alu);
        table[ops::MOD as usize] = Some(Self::alu);
        table[ops::INC as usize] = Some(Self::alu);
        table[ops::DEC as usize] = Some(Self::alu);
        table[ops::CMP as usize] = Some(Self::alu);
        table[ops::AND as usize] = Some(Self::alu);
        table[ops::NOT as usize] = Some(Self::alu);
        table[ops::OR as usize] = Some(Self::alu);
        table[ops::XOR as usize] = Some(Self::alu);
        table[ops::SHL as usize] = Some(Self::alu);
        table[ops::SHR as usize] = Some(Self::alu);
        table
    };

    /// Run until `HLT`, or until the first fault.
    pub fn run(&mut self) -> Result<(), Fault> {
        while self.running {
            self.step()?;
        }
        Ok(())
    }

    /// Execute exactly one instruction, whether or not the machine has halted.
    pub fn step(&mut self) -> Result<(), Fault> {
        if self.trace {
            output::print_trace(&self.trace_line());
        }
        let opcode = self.read(self.pc);
        // Always fetched, whatever the instruction width
        let operand_a = self.read(self.pc.wrapping_add(1));
        let operand_b = self.read(self.pc.wrapping_add(2));

        let Some(handler) = Self::OP_TABLE[opcode as usize] else {
            return Err(Fault::UnknownOpcode {
                opcode,
                pc: self.pc,
            });
        };
        handler(self, operand_a, operand_b)
    }

    /// Current state formatted as `TRACE: pc | fl | op a b | r0 .. r7`.
    pub fn trace_line(&self) -> String {
        let mut line = format!(
            "TRACE: {:02X} | {:02X} | {:02X} {:02X} {:02X} |",
            self.pc,
            self.flag as u8,
            self.read(self.pc),
            self.read(self.pc.wrapping_add(1)),
            self.read(self.pc.wrapping_add(2)),
        );
        for reg in self.reg {
            line.push_str(&format!(" {reg:02X}"));
        }
        line
    }

    #[inline]
    pub fn read(&self, addr: u8) -> u8 {
        self.mem[addr as usize]
    }

    #[inline]
    pub fn write(&mut self, addr: u8, val: u8) {
        self.mem[addr as usize] = val;
    }

    pub fn register(&self, index: u8) -> Result<u8, Fault> {
        let index = self.reg_index(index)?;
        Ok(self.reg[index])
    }

    pub fn set_register(&mut self, index: u8, val: u8) -> Result<(), Fault> {
        let index = self.reg_index(index)?;
        self.reg[index] = val;
        Ok(())
    }

    pub fn registers(&self) -> &[u8; REGISTER_COUNT] {
        &self.reg
    }

    pub fn memory(&self) -> &[u8; MEMORY_SIZE] {
        &self.mem
    }

    pub fn pc(&self) -> u8 {
        self.pc
    }

    pub fn flag(&self) -> Flag {
        self.flag
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn output(&self) -> &W {
        &self.out
    }

    pub fn into_output(self) -> W {
        self.out
    }

    fn reg_index(&self, index: u8) -> Result<usize, Fault> {
        if (index as usize) < REGISTER_COUNT {
            Ok(index as usize)
        } else {
            Err(Fault::OutOfBounds {
                pc: self.pc,
                access: Access::Register(index),
            })
        }
    }

    /// Address `width` bytes past the current instruction.
    fn next_pc(&self, width: u8) -> Result<u8, Fault> {
        let target = self.pc as u16 + width as u16;
        u8::try_from(target).map_err(|_| Fault::OutOfBounds {
            pc: self.pc,
            access: Access::ProgramCounter(target),
        })
    }

    #[inline]
    fn advance(&mut self, width: u8) -> Result<(), Fault> {
        self.pc = self.next_pc(width)?;
        Ok(())
    }

    fn push_val(&mut self, val: u8) {
        let sp = self.reg[SP as usize].wrapping_sub(1);
        self.reg[SP as usize] = sp;
        self.write(sp, val);
    }

    fn pop_val(&mut self) -> u8 {
        let sp = self.reg[SP as usize];
        let val = self.read(sp);
        self.reg[SP as usize] = sp.wrapping_add(1);
        val
    }

    fn nop(&mut self, _a: u8, _b: u8) -> Result<(), Fault> {
        self.advance(ops::width(ops::NOP))
    }

    fn hlt(&mut self, _a: u8, _b: u8) -> Result<(), Fault> {
        self.running = false;
        Ok(())
    }

    fn ldi(&mut self, reg: u8, val: u8) -> Result<(), Fault> {
        self.set_register(reg, val)?;
        self.advance(ops::width(ops::LDI))
    }

    fn prn(&mut self, reg: u8, _b: u8) -> Result<(), Fault> {
        let val = self.register(reg)?;
        writeln!(self.out, "{val}").map_err(|e| Fault::Output {
            pc: self.pc,
            kind: e.kind(),
        })?;
        self.advance(ops::width(ops::PRN))
    }

    // PUSH and POP take their register from memory, not from the fetched operand
    fn push(&mut self, _a: u8, _b: u8) -> Result<(), Fault> {
        let sp = self.reg[SP as usize].wrapping_sub(1);
        self.reg[SP as usize] = sp;
        let reg = self.read(self.pc.wrapping_add(1));
        let val = self.register(reg)?;
        self.write(sp, val);
        self.advance(ops::width(ops::PUSH))
    }

    fn pop(&mut self, _a: u8, _b: u8) -> Result<(), Fault> {
        let val = self.read(self.reg[SP as usize]);
        let reg = self.read(self.pc.wrapping_add(1));
        self.set_register(reg, val)?;
        // Re-read, `POP R7` has just overwritten the stack pointer
        self.reg[SP as usize] = self.reg[SP as usize].wrapping_add(1);
        self.advance(ops::width(ops::POP))
    }

    fn call(&mut self, reg: u8, _b: u8) -> Result<(), Fault> {
        let target = self.register(reg)?;
        let ret = self.next_pc(ops::width(ops::CALL))?;
        self.push_val(ret);
        self.pc = target;
        Ok(())
    }

    fn ret(&mut self, _a: u8, _b: u8) -> Result<(), Fault> {
        self.pc = self.pop_val();
        Ok(())
    }

    fn jmp(&mut self, reg: u8, _b: u8) -> Result<(), Fault> {
        self.pc = self.register(reg)?;
        Ok(())
    }

    fn jump_if(&mut self, cond: bool, reg: u8) -> Result<(), Fault> {
        if cond {
            self.pc = self.register(reg)?;
            Ok(())
        } else {
            // Every conditional jump is two bytes wide
            self.advance(ops::width(ops::JEQ))
        }
    }

    fn jeq(&mut self, reg: u8, _b: u8) -> Result<(), Fault> {
        self.jump_if(self.flag.is_set(Flag::Equal as u8), reg)
    }

    // Only looks at E, never at L or G
    fn jne(&mut self, reg: u8, _b: u8) -> Result<(), Fault> {
        self.jump_if(!self.flag.is_set(Flag::Equal as u8), reg)
    }

    fn jgt(&mut self, reg: u8, _b: u8) -> Result<(), Fault> {
        self.jump_if(self.flag.is_set(Flag::Greater as u8), reg)
    }

    fn jlt(&mut self, reg: u8, _b: u8) -> Result<(), Fault> {
        self.jump_if(self.flag.is_set(Flag::Less as u8), reg)
    }

    fn jle(&mut self, reg: u8, _b: u8) -> Result<(), Fault> {
        self.jump_if(self.flag.is_set(Flag::Less as u8 | Flag::Equal as u8), reg)
    }

    fn jge(&mut self, reg: u8, _b: u8) -> Result<(), Fault> {
        self.jump_if(self.flag.is_set(Flag::Greater as u8 | Flag::Equal as u8), reg)
    }

    /// Shared by every ALU instruction; the opcode is re-read from memory.
    fn alu(&mut self, reg_a: u8, reg_b: u8) -> Result<(), Fault> {
        let opcode = self.read(self.pc);
        debug_assert!(ops::is_alu(opcode), "{opcode:#010b} routed to the ALU");
        let width = ops::width(opcode);

        let val_a = self.register(reg_a)?;
        // NOT, INC and DEC are two bytes wide and write back to their only
        // register; the second candidate byte is already the next opcode
        let val_b = if width == 3 { self.register(reg_b)? } else { 0 };

        match alu::execute(opcode, val_a, val_b)
            .map_err(|e| Fault::from_alu(e, opcode, self.pc))?
        {
            Outcome::Value(val) => self.set_register(reg_a, val)?,
            Outcome::Compare(flag) => self.flag = flag,
        }
        self.advance(width)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::ops::*;

    fn boot(program: &[u8]) -> Cpu<Vec<u8>> {
        let mut cpu = Cpu::new(Vec::new());
        cpu.load(&Image::from_bytes(program).unwrap());
        cpu
    }

    fn printed(cpu: &Cpu<Vec<u8>>) -> &str {
        std::str::from_utf8(cpu.output()).unwrap()
    }

    fn into_printed(cpu: Cpu<Vec<u8>>) -> String {
        String::from_utf8(cpu.into_output()).unwrap()
    }

    #[test]
    fn reset_state() {
        let cpu = boot(&[]);
        assert_eq!(cpu.registers(), &[0, 0, 0, 0, 0, 0, 0, 0xF4]);
        assert_eq!(cpu.pc(), 0);
        assert_eq!(cpu.flag(), Flag::Uninit);
        assert!(cpu.is_running());
    }

    #[test]
    fn reset_clears_previous_run() {
        let mut cpu = boot(&[LDI, 3, 9, CMP, 0, 0, HLT]);
        cpu.run().unwrap();
        cpu.reset();
        assert_eq!(cpu.registers(), &[0, 0, 0, 0, 0, 0, 0, 0xF4]);
        assert_eq!(cpu.memory(), &[0; MEMORY_SIZE]);
        assert_eq!(cpu.flag(), Flag::Uninit);
        assert!(cpu.is_running());
    }

    #[test]
    fn ldi_sets_register_and_advances() {
        for reg in 0..8 {
            for val in [0, 1, 0x7F, 0x80, 0xFF] {
                let mut cpu = boot(&[LDI, reg, val]);
                cpu.step().unwrap();
                assert_eq!(cpu.register(reg).unwrap(), val);
                assert_eq!(cpu.pc(), 3);
            }
        }
    }

    #[test]
    fn multiply_and_print() {
        let mut cpu = boot(&[LDI, 0, 8, LDI, 1, 9, MUL, 0, 1, PRN, 0, HLT]);
        cpu.run().unwrap();
        assert_eq!(printed(&cpu), "72\n");
        assert!(!cpu.is_running());
        assert_eq!(cpu.pc(), 11);
    }

    #[test]
    fn halt_leaves_pc() {
        let mut cpu = boot(&[NOP, NOP, HLT]);
        cpu.run().unwrap();
        assert_eq!(cpu.pc(), 2);
    }

    #[test]
    fn push_pop_restores_stack() {
        let mut cpu = boot(&[LDI, 0, 5, PUSH, 0, LDI, 0, 0, POP, 3, HLT]);
        cpu.step().unwrap();
        cpu.step().unwrap();
        assert_eq!(cpu.register(SP).unwrap(), STACK_START - 1);
        assert_eq!(cpu.read(STACK_START - 1), 5);
        cpu.run().unwrap();
        assert_eq!(cpu.register(SP).unwrap(), STACK_START);
        assert_eq!(cpu.register(3).unwrap(), 5);
        assert_eq!(cpu.register(0).unwrap(), 0);
    }

    #[test]
    fn push_reads_register_from_memory() {
        let mut cpu = boot(&[PUSH, 2]);
        cpu.set_register(2, 42).unwrap();
        // The operand handed to the handler is ignored
        Cpu::push(&mut cpu, 6, 6).unwrap();
        assert_eq!(cpu.read(STACK_START - 1), 42);
        assert_eq!(cpu.pc(), 2);
    }

    #[test]
    fn pop_into_stack_pointer() {
        let mut cpu = boot(&[LDI, 0, 0x80, PUSH, 0, POP, SP, HLT]);
        cpu.run().unwrap();
        assert_eq!(cpu.register(SP).unwrap(), 0x81);
    }

    #[test]
    fn stack_pointer_wraps() {
        let mut cpu = boot(&[LDI, SP, 0, LDI, 1, 9, PUSH, 1, HLT]);
        cpu.run().unwrap();
        assert_eq!(cpu.register(SP).unwrap(), 0xFF);
        assert_eq!(cpu.read(0xFF), 9);
    }

    #[test]
    fn call_and_return() {
        let mut program = vec![LDI, 1, 20, CALL, 1, PRN, 2, HLT];
        program.resize(20, 0);
        program.extend([LDI, 2, 4, RET]);
        let mut cpu = boot(&program);

        cpu.step().unwrap();
        cpu.step().unwrap();
        assert_eq!(cpu.pc(), 20);
        assert_eq!(cpu.register(SP).unwrap(), STACK_START - 1);
        assert_eq!(cpu.read(STACK_START - 1), 5);

        cpu.step().unwrap();
        cpu.step().unwrap();
        assert_eq!(cpu.pc(), 5);
        assert_eq!(cpu.register(SP).unwrap(), STACK_START);

        cpu.run().unwrap();
        assert_eq!(into_printed(cpu), "4\n");
    }

    #[test]
    fn compare_flags() {
        for (a, b, flag) in [(10, 10, Flag::Equal), (3, 10, Flag::Less), (200, 10, Flag::Greater)] {
            let mut cpu = boot(&[LDI, 0, a, LDI, 1, b, CMP, 0, 1]);
            for _ in 0..3 {
                cpu.step().unwrap();
            }
            assert_eq!(cpu.flag(), flag);
            assert_eq!(cpu.pc(), 9);
            assert_eq!(cpu.register(0).unwrap(), a);
        }
    }

    #[test]
    fn jeq_before_compare_falls_through() {
        let mut cpu = boot(&[JEQ, 0]);
        cpu.step().unwrap();
        assert_eq!(cpu.pc(), 2);

        let mut cpu = boot(&[JNE, 0]);
        cpu.set_register(0, 0x40).unwrap();
        cpu.step().unwrap();
        assert_eq!(cpu.pc(), 0x40);
    }

    #[test]
    fn conditional_jumps() {
        #[rustfmt::skip]
        let cases = [
            // (a, b, opcode, taken)
            (1, 1, JEQ, true),  (1, 2, JEQ, false),
            (1, 1, JNE, false), (1, 2, JNE, true), (2, 1, JNE, true),
            (2, 1, JGT, true),  (1, 1, JGT, false),
            (1, 2, JLT, true),  (2, 1, JLT, false),
            (1, 1, JLE, true),  (1, 2, JLE, true), (2, 1, JLE, false),
            (1, 1, JGE, true),  (2, 1, JGE, true), (1, 2, JGE, false),
        ];
        for (a, b, op, taken) in cases {
            let mut cpu = boot(&[LDI, 0, a, LDI, 1, b, LDI, 2, 0x30, CMP, 0, 1, op, 2]);
            for _ in 0..5 {
                cpu.step().unwrap();
            }
            let expected = if taken { 0x30 } else { 14 };
            assert_eq!(cpu.pc(), expected, "{} {a} {b}", mnemonic(op).unwrap());
        }
    }

    #[test]
    fn jump_unconditionally() {
        let mut cpu = boot(&[LDI, 4, 7, JMP, 4, HLT, HLT, LDI, 0, 1, HLT]);
        cpu.run().unwrap();
        assert_eq!(cpu.register(0).unwrap(), 1);
        assert_eq!(cpu.pc(), 10);
    }

    #[test]
    fn unary_alu_ops_are_two_bytes() {
        let mut cpu = boot(&[LDI, 0, 0xFF, INC, 0, NOT, 0, DEC, 0, HLT]);
        cpu.run().unwrap();
        assert_eq!(cpu.register(0).unwrap(), 0xFE);
        assert_eq!(cpu.pc(), 9);
    }

    #[test]
    fn divide_by_zero_faults() {
        let mut cpu = boot(&[LDI, 0, 9, DIV, 0, 1, HLT]);
        assert_eq!(
            cpu.run(),
            Err(Fault::DivideByZero { opcode: DIV, pc: 3 })
        );
        assert_eq!(cpu.register(0).unwrap(), 9);

        let mut cpu = boot(&[MOD, 0, 1]);
        assert_eq!(cpu.run(), Err(Fault::DivideByZero { opcode: MOD, pc: 0 }));
    }

    #[test]
    fn unknown_opcode_faults() {
        let mut cpu = boot(&[NOP, 0b1111_1111]);
        assert_eq!(
            cpu.run(),
            Err(Fault::UnknownOpcode {
                opcode: 0b1111_1111,
                pc: 1
            })
        );
    }

    #[test]
    fn register_out_of_bounds() {
        let mut cpu = boot(&[LDI, 8, 1]);
        assert_eq!(
            cpu.run(),
            Err(Fault::OutOfBounds {
                pc: 0,
                access: Access::Register(8)
            })
        );
    }

    #[test]
    fn pc_runs_off_memory() {
        let mut program = vec![NOP; MEMORY_SIZE - 2];
        program.extend([PRN, 0]);
        let mut cpu = boot(&program);
        assert_eq!(
            cpu.run(),
            Err(Fault::OutOfBounds {
                pc: 0xFE,
                access: Access::ProgramCounter(0x100)
            })
        );
    }

    #[test]
    fn call_return_address_past_memory() {
        let mut program = vec![NOP; MEMORY_SIZE - 2];
        program.extend([CALL, 1]);
        let mut cpu = boot(&program);
        cpu.set_register(1, 0x10).unwrap();
        assert_eq!(
            cpu.run(),
            Err(Fault::OutOfBounds {
                pc: 0xFE,
                access: Access::ProgramCounter(0x100)
            })
        );
        // Nothing was pushed
        assert_eq!(cpu.register(SP).unwrap(), STACK_START);
        assert_eq!(cpu.pc(), 0xFE);
    }

    #[test]
    fn push_stack_pointer() {
        let mut cpu = boot(&[PUSH, SP, HLT]);
        cpu.run().unwrap();
        assert_eq!(cpu.register(SP).unwrap(), STACK_START - 1);
        assert_eq!(cpu.read(STACK_START - 1), STACK_START - 1);
    }

    #[test]
    fn halt_in_last_cell() {
        let mut program = vec![NOP; MEMORY_SIZE - 1];
        program.push(HLT);
        let mut cpu = boot(&program);
        cpu.run().unwrap();
        assert_eq!(cpu.pc(), 0xFF);
    }

    #[test]
    fn endless_loop_keeps_running() {
        let mut cpu = boot(&[LDI, 0, 3, JMP, 0]);
        for _ in 0..1000 {
            cpu.step().unwrap();
        }
        assert!(cpu.is_running());
        assert_eq!(cpu.pc(), 3);
    }

    #[test]
    fn trace_line_format() {
        let cpu = boot(&[LDI, 0, 8]);
        assert_eq!(
            cpu.trace_line(),
            "TRACE: 00 | 00 | 82 00 08 | 00 00 00 00 00 00 00 F4"
        );
    }
}
