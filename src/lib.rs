#![doc(html_root_url = "https://docs.rs/panictrace/latest")]
//! Readable, colorized stack traces for panics in supervised code.
//!
//! A supervisor ([`handle`], [`go`], [`go_async`], or [`catch`]) runs code
//! under `catch_unwind` while a process panic hook captures the stack at
//! the panic site. The recovered panic is rendered to standard error with
//! runtime-internal frames filtered out and each frame split into package
//! path and function name:
//!
//! ```no_run
//! panictrace::go(|| panic!("boom"), None, None);
//! ```
//!
//! ```text
//! panic: boom
//! ->  at app.main.{{closure}}+0
//! ->       /src/app/main.rs:2
//!
//!     at app.main+1
//!          /src/app/main.rs:2
//! ```

pub mod capture;
pub mod config;
pub mod filter;
pub mod frame;
pub mod hook;
pub mod metrics;
pub mod panic;
pub mod render;
pub mod reporter;
pub mod supervise;
pub mod symbol;

pub use capture::{StackWalker, Trace};
pub use config::{ColorChoice, Config, ParseColorChoiceError};
pub use filter::{CallStack, Predicate, call_stack};
pub use frame::{Frame, FrameAddress, Location, RawFrame};
pub use hook::CrashReport;
pub use render::{Printer, Renderer};
pub use reporter::{EXIT_CODE, Reporter, disable, enable};
pub use supervise::{catch, go, go_async, handle};
pub use symbol::split_function_path;
