// Loading
mod loader;
pub use loader::Image;

// Running
mod alu;
mod fault;
pub use fault::{Access, Fault};
pub mod ops;
mod runtime;
pub use runtime::{Cpu, Flag, MEMORY_SIZE, REGISTER_COUNT, SP, STACK_START};

mod error;
pub use error::fault_report;

pub mod env;
pub mod output;

/// Amount of lines to show as context, each side of focus line (line containing span).
pub const DIAGNOSTIC_CONTEXT_LINES: usize = 4;
