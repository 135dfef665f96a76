//! Command line interface for the panictrace demonstration binary.
//!
//! The binary raises a panic a configurable number of calls deep under one
//! of the supervisors, which makes it handy for eyeballing the rendered
//! output and for exercising the exit-on-panic path from tests.

use clap::{Parser, ValueEnum};

/// Supervisor used to run the panicking code.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// Run in place under `handle`.
    Handle,
    /// Run on a supervised thread started with `go`.
    Go,
    /// Run as a supervised tokio task started with `go_async`.
    Async,
}

/// Command line arguments for the `panictrace` binary.
#[derive(Debug, Parser)]
#[command(name = "panictrace", version, about = "Render a panic stack trace")]
pub struct Cli {
    /// Number of nested calls before the panic.
    #[arg(short, long, default_value_t = 3)]
    pub depth: usize,

    /// Panic message.
    #[arg(short, long, default_value = "boom")]
    pub message: String,

    /// Supervisor to run under.
    #[arg(long, value_enum, default_value_t = Mode::Handle)]
    pub mode: Mode,

    /// When to color the output: auto, always, or never.
    #[arg(long)]
    pub color: Option<String>,

    /// Recover without exiting (handle mode only).
    #[arg(long)]
    pub no_exit: bool,

    /// Swallow the panic silently.
    #[arg(long)]
    pub disable: bool,
}
