use std::fs;
use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use colored::Colorize;
use miette::{IntoDiagnostic, Result};

use ls8::output::{self, message, MsgColor};
use ls8::{Cpu, Image};

/// Emulator for the LS-8, an 8-bit computer with 256 bytes of memory.
#[derive(Parser)]
#[command(version)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Quickly provide a `.ls8` file to run
    path: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Load a `.ls8` program image and run it until it halts
    Run {
        /// `.ls8` file to run
        name: PathBuf,
        /// Print machine state to stderr before every instruction
        #[arg(short, long)]
        trace: bool,
        /// Produce minimal output, suited for blackbox tests
        #[arg(short, long)]
        minimal: bool,
    },
    /// Check that a `.ls8` file loads, without running it
    Check {
        /// File to check
        name: PathBuf,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();
    ls8::env::init();

    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new() //
                .context_lines(ls8::DIAGNOSTIC_CONTEXT_LINES)
                .build(),
        )
    }))?;

    match args.command {
        Some(Command::Run {
            name,
            trace,
            minimal,
        }) => run(&name, trace, minimal),
        Some(Command::Check { name }) => {
            file_message(MsgColor::Green, "Checking", &name);
            let image = load(&name)?;
            message(
                MsgColor::Green,
                "Success",
                format!("{} bytes, no errors found!", image.len()),
            );
            Ok(())
        }
        None => match args.path {
            Some(path) => run(&path, false, false),
            None => {
                println!("\n~ ls8 v{VERSION} ~");
                println!("{}", SHORT_INFO.cyan());
                Ok(())
            }
        },
    }
}

fn file_message(color: MsgColor, left: &str, right: &Path) {
    message(color, left, format!("target {}", right.display()));
}

fn load(name: &Path) -> Result<Image> {
    let src = fs::read_to_string(name).into_diagnostic()?;
    Image::parse(&src)
}

fn run(name: &Path, trace: bool, minimal: bool) -> Result<()> {
    output::set_minimal(minimal);

    file_message(MsgColor::Green, "Loading", name);
    let image = load(name)?;

    let mut cpu = Cpu::with_stdout();
    cpu.load(&image);
    cpu.set_trace(trace || ls8::env::is_trace_enabled());

    message(
        MsgColor::Green,
        "Running",
        format!("{} bytes of program", image.len()),
    );
    if let Err(fault) = cpu.run() {
        message(MsgColor::Red, "Faulted", format!("at address {:#04x}", fault.pc()));
        output::print_registers(&cpu);
        return Err(ls8::fault_report(fault));
    }

    message(MsgColor::Cyan, "Halted", format!("at address {:#04x}", cpu.pc()));
    Ok(())
}

const SHORT_INFO: &str = r"
Runs LS-8 program images: text files with one binary byte per line.
Please use `-h` or `--help` to access the usage instructions.
";

const VERSION: &str = env!("CARGO_PKG_VERSION");
