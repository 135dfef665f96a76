//! Text rendering of a recovered panic and its call stack.
//!
//! The report starts with a `panic: <value>` header. The innermost frame is
//! marked with `->` and emphasized, followed by a blank line; every other
//! frame is indented uniformly:
//!
//! ```text
//! panic: boom
//! ->  at app/net.Conn.handle+3
//! ->       /src/app/net/conn.rs:42
//!
//!     at app.main+1
//!          /src/app/main.rs:7
//! ```
//!
//! With color disabled no escape sequence is written at all.

use std::{
    any::Any,
    io::{self, Write},
};

use crate::{frame::Frame, panic::format_panic, symbol::split_function_path};

/// Caller-supplied formatter for the panic value.
pub type Printer = dyn Fn(&mut dyn Write, &(dyn Any + Send)) -> io::Result<()> + Send + Sync;

mod style {
    pub const RESET: &str = "\x1b[0m";
    pub const RED: &str = "\x1b[31m";
    pub const YELLOW: &str = "\x1b[33m";
    pub const BOLD_BRIGHT_BLUE: &str = "\x1b[1;94m";
    pub const BOLD_BRIGHT_CYAN: &str = "\x1b[1;96m";
    pub const BOLD_BRIGHT_GREEN: &str = "\x1b[1;92m";
    pub const BOLD_BRIGHT_YELLOW: &str = "\x1b[1;93m";
    pub const BOLD_BRIGHT_WHITE: &str = "\x1b[1;97m";
    pub const BRIGHT_BLUE: &str = "\x1b[94m";
    pub const BRIGHT_CYAN: &str = "\x1b[96m";
    pub const BRIGHT_GREEN: &str = "\x1b[92m";
    pub const BRIGHT_WHITE: &str = "\x1b[97m";
}

/// Renders panic reports, with or without ANSI styling.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Renderer {
    color: bool,
}

impl Renderer {
    /// Create a renderer; `color` enables ANSI escape sequences.
    #[must_use]
    pub const fn new(color: bool) -> Self { Self { color } }

    /// Whether this renderer emits escape sequences.
    #[must_use]
    pub const fn color(self) -> bool { self.color }

    /// Write the report for `payload` and `frames` to `out`.
    ///
    /// `printer` formats the payload; without one the payload is shown as
    /// its string message or, failing that, its `Debug` form.
    ///
    /// # Errors
    ///
    /// Returns the first error reported by `out`.
    pub fn render<I>(
        self,
        out: &mut dyn Write,
        payload: &(dyn Any + Send),
        printer: Option<&Printer>,
        frames: I,
    ) -> io::Result<()>
    where
        I: IntoIterator<Item = Frame>,
    {
        let mut w = Painter {
            out,
            color: self.color,
        };
        w.styled3(style::BOLD_BRIGHT_CYAN, "panic: ", style::RESET)?;
        w.style(style::BOLD_BRIGHT_BLUE)?;
        match printer {
            Some(printer) => printer(&mut *w.out, payload)?,
            None => write!(w.out, "{}", format_panic(payload))?,
        }
        w.styled(style::RESET, "\n")?;

        let mut first = true;
        for frame in frames {
            if first {
                w.first_frame(&frame)?;
            } else {
                w.frame(&frame)?;
            }
            first = false;
        }
        w.out.flush()
    }
}

struct Painter<'w> {
    out: &'w mut dyn Write,
    color: bool,
}

impl Painter<'_> {
    fn first_frame(&mut self, frame: &Frame) -> io::Result<()> {
        let (package, function) = split_function_path(frame.function());
        let (dir, name) = split_file(frame.file());
        self.styled3(style::RED, "->", style::RESET)?;
        self.text("  at ")?;
        self.styled(style::BOLD_BRIGHT_YELLOW, &package)?;
        self.styled(style::BOLD_BRIGHT_GREEN, function)?;
        self.offset(style::BOLD_BRIGHT_BLUE, frame.offset())?;
        self.text("\n")?;
        self.styled(style::RED, "->")?;
        self.text("       ")?;
        self.styled(style::BOLD_BRIGHT_WHITE, dir)?;
        self.styled(style::BOLD_BRIGHT_CYAN, name)?;
        self.styled(style::BOLD_BRIGHT_GREEN, ":")?;
        self.int(i64::from(frame.line()))?;
        self.styled(style::RESET, "\n\n")
    }

    fn frame(&mut self, frame: &Frame) -> io::Result<()> {
        let (package, function) = split_function_path(frame.function());
        let (dir, name) = split_file(frame.file());
        self.text("    at ")?;
        self.styled(style::YELLOW, &package)?;
        self.styled(style::BRIGHT_GREEN, function)?;
        self.offset(style::BRIGHT_BLUE, frame.offset())?;
        self.text("\n         ")?;
        self.styled(style::BRIGHT_WHITE, dir)?;
        self.styled(style::BRIGHT_CYAN, name)?;
        self.styled(style::BRIGHT_GREEN, ":")?;
        self.int(i64::from(frame.line()))?;
        self.styled(style::RESET, "\n")
    }

    fn offset(&mut self, prefix: &str, offset: Option<u32>) -> io::Result<()> {
        if let Some(offset) = offset {
            self.styled(prefix, "+")?;
            self.int(i64::from(offset))?;
        }
        self.style(style::RESET)
    }

    fn text(&mut self, s: &str) -> io::Result<()> { self.out.write_all(s.as_bytes()) }

    fn style(&mut self, code: &str) -> io::Result<()> {
        if self.color {
            self.text(code)?;
        }
        Ok(())
    }

    fn styled(&mut self, prefix: &str, s: &str) -> io::Result<()> {
        self.style(prefix)?;
        self.text(s)
    }

    fn styled3(&mut self, prefix: &str, s: &str, suffix: &str) -> io::Result<()> {
        self.style(prefix)?;
        self.text(s)?;
        self.style(suffix)
    }

    fn int(&mut self, n: i64) -> io::Result<()> { write_int(&mut *self.out, n) }
}

/// Split a path after its last separator; the directory keeps the separator.
fn split_file(path: &str) -> (&str, &str) {
    match path.rfind(['/', '\\']) {
        Some(i) => path.split_at(i + 1),
        None => ("", path),
    }
}

/// Write `n` in decimal through a stack buffer.
///
/// # Errors
///
/// Returns any error reported by `out`.
pub fn write_int(out: &mut dyn Write, n: i64) -> io::Result<()> {
    // "-9223372036854775808" is 20 bytes.
    let mut buf = [0u8; 20];
    let mut i = buf.len();
    let mut val = n.unsigned_abs();
    loop {
        i -= 1;
        // `val % 10` is a single digit.
        #[allow(clippy::cast_possible_truncation, reason = "value is below 10")]
        let digit = (val % 10) as u8;
        buf[i] = b'0' + digit;
        val /= 10;
        if val == 0 {
            break;
        }
    }
    if n < 0 {
        i -= 1;
        buf[i] = b'-';
    }
    out.write_all(&buf[i..])
}
