use std::cell::RefCell;
use std::fmt::Display;
use std::io::Write;
use std::str::Chars;

use colored::{ColoredString, Colorize};

use crate::runtime::Cpu;

thread_local! {
    static IS_MINIMAL: RefCell<bool> = const { RefCell::new(false) };
}

/// Strip colour and decoration from everything printed by this module.
pub fn set_minimal(new_value: bool) -> bool {
    IS_MINIMAL.with(|value| value.replace(new_value))
}

pub fn is_minimal() -> bool {
    IS_MINIMAL.with(|value| *value.borrow())
}

#[derive(Clone, Copy, Debug)]
pub enum MsgColor {
    Green,
    Cyan,
    Red,
}

/// Right-aligned status line on stderr, eg. `     Running emitted binary`.
/// Suppressed if `--minimal`, so only program output remains.
pub fn message(color: MsgColor, left: &str, right: impl Display) {
    if is_minimal() {
        return;
    }
    let left = match color {
        MsgColor::Green => left.green(),
        MsgColor::Cyan => left.cyan(),
        MsgColor::Red => left.red(),
    };
    eprintln!("{left:>12} {right}");
}

pub fn print_trace(line: &str) {
    print_debug(&format!("{line}\n"));
}

pub fn print_registers<W: Write>(cpu: &Cpu<W>) {
    if is_minimal() {
        for (i, reg) in cpu.registers().iter().enumerate() {
            print_debug(&format!("R{i} {reg}\n"));
        }
        print_debug(&format!("PC {}\n", cpu.pc()));
        print_debug(&format!("FL {:03b}\n", cpu.flag() as u8));
        return;
    }

    print_debug("\x1b[2m┌────────────────────────────────┐\x1b[0m\n");
    print_debug("\x1b[2m│      \x1b[3mhex   uint   int      bin\x1b[0m\x1b[2m │\x1b[0m\n");
    for (i, reg) in cpu.registers().iter().enumerate() {
        let name = if i == 7 { "SP" } else { "  " };
        print_debug(&format!(
            "\x1b[2m│\x1b[0m \x1b[1mR{i}\x1b[0m{name} 0x{reg:02x}  {reg:>4}  {:>4}  {reg:08b} \x1b[2m│\x1b[0m\n",
            *reg as i8
        ));
    }
    print_debug(&format!(
        "\x1b[2m│\x1b[0m \x1b[1mPC\x1b[0m   0x{:02x}           \x1b[1mFL\x1b[0m  00000{:03b} \x1b[2m│\x1b[0m\n",
        cpu.pc(),
        cpu.flag() as u8
    ));
    print_debug("\x1b[2m└────────────────────────────────┘\x1b[0m\n");
}

/// Print to stderr: blue normally, without any escape codes if `--minimal`.
fn print_debug(string: &str) {
    if is_minimal() {
        for ch in Decolored::new(string) {
            eprint!("{}", ch);
        }
    } else {
        eprint!("{}", ColoredString::from(string).blue());
    }
}

struct Decolored<'a> {
    chars: Chars<'a>,
}

impl<'a> Decolored<'a> {
    pub fn new(string: &'a str) -> Self {
        Self {
            chars: string.chars(),
        }
    }
}

impl Iterator for Decolored<'_> {
    type Item = char;
    fn next(&mut self) -> Option<Self::Item> {
        while let Some(ch) = self.chars.next() {
            // Skip everything between '\x1b' and 'm' (inclusive)
            if ch == '\x1b' {
                while self.chars.next().is_some_and(|ch| ch != 'm') {}
                continue;
            }
            return Some(ch);
        }
        None
    }
}
