use std::cell::Cell;

/// Switches read from the process environment.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Env {
    /// `LS8_TRACE=1`: print a trace line before every instruction.
    pub trace: bool,
}

impl Env {
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let is_on = |name: &str| lookup(name).is_some_and(|v| v == "1");
        Env {
            trace: is_on("LS8_TRACE"),
        }
    }
}

thread_local! {
    /// Set once by `init`
    static ENV: Cell<Option<Env>> = const { Cell::new(None) };
}

pub fn init() {
    let value = Env::from_lookup(|name| std::env::var(name).ok());
    let previous = ENV.with(|env| env.replace(Some(value)));
    assert!(
        previous.is_none(),
        "tried to initialize environment state multiple times"
    );
}

pub fn is_trace_enabled() -> bool {
    get().trace
}

fn get() -> Env {
    ENV.with(Cell::get)
        .unwrap_or_else(|| panic!("tried to access environment state before initialization"))
}
