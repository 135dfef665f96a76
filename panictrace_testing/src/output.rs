//! In-memory sinks for reporter output.

use std::{
    io::{self, Write},
    sync::{Arc, Mutex, PoisonError},
};

use panictrace::Reporter;
use rstest::fixture;

/// Clonable writer collecting everything written to it.
#[derive(Clone, Debug, Default)]
pub struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

impl SharedBuffer {
    /// Create an empty buffer.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Raw bytes written so far.
    #[must_use]
    pub fn bytes(&self) -> Vec<u8> { self.0.lock().unwrap_or_else(PoisonError::into_inner).clone() }

    /// Everything written so far, as text.
    #[must_use]
    pub fn contents(&self) -> String { String::from_utf8_lossy(&self.bytes()).into_owned() }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}

/// Writer rejecting every write.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailingWriter;

impl Write for FailingWriter {
    fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
        Err(io::Error::new(io::ErrorKind::BrokenPipe, "output closed"))
    }

    fn flush(&mut self) -> io::Result<()> { Ok(()) }
}

/// Remove ANSI CSI escape sequences (`ESC [ ... final byte`).
#[must_use]
pub fn strip_ansi(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\x1b' {
            out.push(c);
            continue;
        }
        if chars.next() != Some('[') {
            continue;
        }
        for c in chars.by_ref() {
            if ('@'..='~').contains(&c) {
                break;
            }
        }
    }
    out
}

/// A reporter writing into a [`SharedBuffer`].
pub struct CapturedReporter {
    /// Reporter under test.
    pub reporter: Arc<Reporter>,
    /// Everything the reporter wrote.
    pub output: SharedBuffer,
}

/// Build a plain-text [`CapturedReporter`].
#[fixture]
pub fn captured_reporter() -> CapturedReporter {
    let output = SharedBuffer::new();
    let reporter = Arc::new(Reporter::with_output(output.clone(), false));
    CapturedReporter { reporter, output }
}
