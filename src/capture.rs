//! Capture of raw return addresses for the current call stack.
//!
//! The walk runs against a fixed-size buffer that is doubled until one walk
//! returns fewer addresses than the buffer holds, so deep stacks are never
//! truncated and shallow ones never over-allocate.

use std::cell::Cell;

use crate::frame::{self, Frame, FrameAddress, RawFrame};

/// Number of slots the capture buffer starts with.
pub const INITIAL_DEPTH: usize = 16;

thread_local! {
    static ORIGIN: Cell<Option<RawFrame>> = const { Cell::new(None) };
}

/// Platform primitive enumerating the frames of the current thread.
pub trait StackWalker {
    /// Fill `buf` with return addresses and function entry addresses,
    /// innermost first.
    ///
    /// The walker's own frames are never reported. `skip` further frames are
    /// dropped after them, so `skip == 0` starts at the caller of `callers`.
    /// Returns the number of slots written, at most `buf.len()`.
    fn callers(&self, skip: usize, buf: &mut [RawFrame]) -> usize;
}

/// [`StackWalker`] backed by the `backtrace` unwinder.
#[derive(Clone, Copy, Debug, Default)]
pub struct BacktraceWalker;

impl StackWalker for BacktraceWalker {
    #[inline(never)]
    fn callers(&self, skip: usize, buf: &mut [RawFrame]) -> usize {
        let marker = <Self as StackWalker>::callers as usize;
        walk(skip, buf, Some(marker)).unwrap_or_else(|| walk(skip, buf, None).unwrap_or(0))
    }
}

/// Walk the stack, discarding everything up to and including the frame whose
/// symbol starts at `marker`. Returns `None` if the marker never showed up.
fn walk(skip: usize, buf: &mut [RawFrame], marker: Option<usize>) -> Option<usize> {
    let mut started = marker.is_none();
    let mut skipped = 0;
    let mut written = 0;
    backtrace::trace(|frame| {
        if !started {
            started = Some(frame.symbol_address() as usize) == marker;
            return true;
        }
        if skipped < skip {
            skipped += 1;
            return true;
        }
        let Some(slot) = buf.get_mut(written) else {
            return false;
        };
        *slot = RawFrame::new(
            FrameAddress::from_ptr(frame.ip()),
            FrameAddress::from_ptr(frame.symbol_address()),
        );
        written += 1;
        true
    });
    started.then_some(written)
}

/// Unresolved frames of one captured stack, innermost first.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Trace {
    frames: Vec<RawFrame>,
}

impl Trace {
    /// Wrap an already captured frame list.
    #[must_use]
    pub fn from_frames(frames: Vec<RawFrame>) -> Self { Self { frames } }

    /// The captured frames.
    #[must_use]
    pub fn frames(&self) -> &[RawFrame] { &self.frames }

    /// Number of captured frames.
    #[must_use]
    pub fn len(&self) -> usize { self.frames.len() }

    /// Returns `true` if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool { self.frames.is_empty() }

    /// Resolve every frame without filtering, innermost first.
    ///
    /// Resolution is lazy, one walked frame at a time.
    pub fn resolve(&self) -> impl Iterator<Item = Frame> + '_ {
        self.frames.iter().flat_map(|&raw| frame::resolve(raw))
    }

    pub(crate) fn into_frames(self) -> Vec<RawFrame> { self.frames }
}

/// Capture the current stack with the platform walker.
///
/// `skip == 0` starts at the caller of `raw_stack`. The address of the code
/// that spawned the current supervised task, if any, is appended last.
#[inline(never)]
#[must_use]
pub fn raw_stack(skip: usize) -> Trace { capture_with(&BacktraceWalker, skip + 1, origin()) }

/// Capture with an explicit walker and origin address.
///
/// `skip == 0` starts at the caller of `capture_with`.
#[inline(never)]
pub fn capture_with<W>(walker: &W, skip: usize, origin: Option<RawFrame>) -> Trace
where
    W: StackWalker + ?Sized,
{
    let mut buf = vec![RawFrame::EMPTY; INITIAL_DEPTH];
    loop {
        let n = walker.callers(skip + 1, &mut buf);
        if n < buf.len() {
            buf.truncate(n);
            break;
        }
        tracing::trace!(capacity = buf.len() * 2, "stack capture buffer full, growing");
        buf = vec![RawFrame::EMPTY; buf.len() * 2];
    }
    if let Some(origin) = origin {
        buf.push(origin);
    }
    Trace::from_frames(buf)
}

/// The frame `skip` levels above the caller of `spawn_site`.
///
/// `spawn_site(0)` is the caller itself; supervisors use `spawn_site(1)`
/// to remember who asked for a task to be spawned.
#[inline(never)]
pub(crate) fn spawn_site(skip: usize) -> Option<RawFrame> {
    let mut buf = [RawFrame::EMPTY; 1];
    (BacktraceWalker.callers(skip + 1, &mut buf) == 1).then_some(buf[0])
}

/// Frame of the code that spawned the current supervised task.
///
/// `None` outside supervised threads and tasks.
#[must_use]
pub fn origin() -> Option<RawFrame> { ORIGIN.get() }

pub(crate) fn replace_origin(origin: Option<RawFrame>) -> Option<RawFrame> {
    ORIGIN.replace(origin)
}
