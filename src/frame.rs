//! Captured stack frames.

use std::{collections::VecDeque, ffi::c_void, fmt};

use crate::symbol::qualify;

/// Opaque return address of one stack frame.
///
/// Addresses are produced by the capture loop and only ever handed back to
/// the platform resolver; no arithmetic is exposed on them.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameAddress(usize);

impl FrameAddress {
    pub(crate) const NULL: Self = Self(0);

    pub(crate) fn from_ptr(ip: *mut c_void) -> Self { Self(ip as usize) }

    pub(crate) fn as_ptr(self) -> *mut c_void { self.0 as *mut c_void }

    /// Returns `true` for the null address some unwinders report at the
    /// bottom of a stack.
    #[must_use]
    pub fn is_null(self) -> bool { self.0 == 0 }
}

impl fmt::Debug for FrameAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{:#x}", self.0) }
}

/// One walked frame before symbolication: the return address and the start
/// address of the function containing it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct RawFrame {
    ip: FrameAddress,
    entry: FrameAddress,
}

impl RawFrame {
    pub(crate) const EMPTY: Self = Self::new(FrameAddress::NULL, FrameAddress::NULL);

    pub(crate) const fn new(ip: FrameAddress, entry: FrameAddress) -> Self { Self { ip, entry } }

    /// Return address of the frame.
    #[must_use]
    pub fn ip(self) -> FrameAddress { self.ip }

    /// Start of the enclosing function; null when the unwinder did not know.
    #[must_use]
    pub fn entry(self) -> FrameAddress { self.entry }
}

/// A source location: file path and 1-based line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    /// Source file path.
    pub file: String,
    /// Line within `file`.
    pub line: u32,
}

/// One resolved entry of a captured call stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    function: String,
    file: String,
    line: u32,
    entry: Option<Location>,
    address: FrameAddress,
}

impl Frame {
    /// Create a frame from a qualified function symbol and its source position.
    #[must_use]
    pub fn new(function: impl Into<String>, file: impl Into<String>, line: u32) -> Self {
        Self {
            function: function.into(),
            file: file.into(),
            line,
            entry: None,
            address: FrameAddress::NULL,
        }
    }

    /// Set the location of the function's first line.
    #[must_use]
    pub fn with_entry(mut self, file: impl Into<String>, line: u32) -> Self {
        self.entry = Some(Location {
            file: file.into(),
            line,
        });
        self
    }

    /// Qualified function symbol, empty when the address could not be resolved.
    #[must_use]
    pub fn function(&self) -> &str { &self.function }

    /// Source file path, `?` when unknown.
    #[must_use]
    pub fn file(&self) -> &str { &self.file }

    /// Source line, 0 when unknown.
    #[must_use]
    pub fn line(&self) -> u32 { self.line }

    /// Location of the first line of the enclosing function, if known.
    #[must_use]
    pub fn entry(&self) -> Option<&Location> { self.entry.as_ref() }

    /// Address this frame was resolved from.
    #[must_use]
    pub fn address(&self) -> FrameAddress { self.address }

    /// Number of lines between the function entry and this frame's line.
    ///
    /// `None` when the entry is unknown, lies in another file, or lies after
    /// the frame's line.
    #[must_use]
    pub fn offset(&self) -> Option<u32> {
        let entry = self.entry.as_ref()?;
        (entry.file == self.file && entry.line <= self.line).then(|| self.line - entry.line)
    }

    fn unresolved(address: FrameAddress) -> Self {
        Self {
            address,
            ..Self::new(String::new(), "?", 0)
        }
    }

    fn from_symbol(address: FrameAddress, symbol: &backtrace::Symbol) -> Self {
        // `{:#}` drops the trailing hash of legacy mangled names.
        let function = symbol
            .name()
            .map(|name| qualify(&format!("{name:#}")))
            .unwrap_or_default();
        let file = symbol
            .filename()
            .map_or_else(|| "?".to_owned(), |path| path.display().to_string());
        Self {
            function,
            file,
            line: symbol.lineno().unwrap_or(0),
            entry: None,
            address,
        }
    }
}

/// Resolve one walked frame into frames, innermost first.
///
/// Inlined calls at the return address yield one frame each. Only the last
/// symbol is the function the unwinder reported an entry for, so only it
/// gets an entry location.
pub(crate) fn resolve(raw: RawFrame) -> VecDeque<Frame> {
    let address = raw.ip;
    let mut frames = VecDeque::new();
    backtrace::resolve(address.as_ptr(), |symbol| {
        frames.push_back(Frame::from_symbol(address, symbol));
    });
    if let Some(last) = frames.back_mut()
        && !raw.entry.is_null()
    {
        last.entry = entry_location(raw.entry);
    }
    if frames.is_empty() {
        frames.push_back(Frame::unresolved(address));
    }
    frames
}

fn entry_location(entry: FrameAddress) -> Option<Location> {
    let mut location = None;
    // The resolver looks up the byte before the address it is given, which
    // suits return addresses but not a function's first instruction.
    let first = FrameAddress(entry.0.wrapping_add(1));
    backtrace::resolve(first.as_ptr(), |symbol| {
        if let (Some(file), Some(line)) = (symbol.filename(), symbol.lineno()) {
            location = Some(Location {
                file: file.display().to_string(),
                line,
            });
        }
    });
    location
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(Frame::new("app.run", "src/main.rs", 12).with_entry("src/main.rs", 10), Some(2))]
    #[case(Frame::new("app.run", "src/main.rs", 10).with_entry("src/main.rs", 10), Some(0))]
    #[case(Frame::new("app.run", "src/main.rs", 9).with_entry("src/main.rs", 10), None)]
    #[case(Frame::new("app.run", "src/main.rs", 12).with_entry("src/lib.rs", 10), None)]
    #[case(Frame::new("app.run", "src/main.rs", 12), None)]
    fn computes_offsets(#[case] frame: Frame, #[case] expected: Option<u32>) {
        assert_eq!(frame.offset(), expected);
    }

    #[test]
    fn resolves_own_function() {
        let entry = FrameAddress::from_ptr(resolves_own_function as *mut c_void);
        let frames = resolve(RawFrame::new(FrameAddress(entry.0 + 1), entry));
        let outermost = frames.back().expect("resolution yields at least one frame");
        assert!(
            outermost.function().ends_with("tests.resolves_own_function"),
            "unexpected symbol {:?}",
            outermost.function()
        );
        assert_eq!(outermost.offset(), Some(0));
    }

    #[test]
    fn unknown_entry_leaves_offset_out() {
        let entry = FrameAddress::from_ptr(unknown_entry_leaves_offset_out as *mut c_void);
        let frames = resolve(RawFrame::new(FrameAddress(entry.0 + 1), FrameAddress::NULL));
        assert!(frames.iter().all(|frame| frame.entry().is_none()));
    }

    #[test]
    fn addresses_format_as_hex() {
        assert_eq!(format!("{:?}", FrameAddress(0xbeef)), "0xbeef");
    }
}
