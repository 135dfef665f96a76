//! Shared fixtures for `panictrace` tests.
//!
//! Provides an in-memory output sink for reporters, a writer that always
//! fails, recursion markers with predictable symbol names, and a serialized
//! handle to a global `log` capture.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use panictrace::Reporter;
//! use panictrace_testing::SharedBuffer;
//!
//! let buffer = SharedBuffer::new();
//! let reporter = Arc::new(Reporter::with_output(buffer.clone(), false));
//! reporter.handle(false, None, None, || panic!("boom"));
//! assert!(buffer.contents().starts_with("panic: boom"));
//! ```

pub mod logging;
pub mod markers;
pub mod output;

pub use logging::{LoggerHandle, logger};
pub use markers::{descend, frame_blocks};
pub use output::{CapturedReporter, FailingWriter, SharedBuffer, captured_reporter, strip_ansi};
