//! Lazy, filtered iteration over captured frames.

use std::{collections::VecDeque, iter::FusedIterator, vec};

use crate::{
    capture::{self, Trace},
    frame::{self, Frame, RawFrame},
    symbol::split_function_path,
};

/// Caller-supplied frame filter; frames for which it returns `false` are
/// dropped.
pub type Predicate = dyn Fn(&Frame) -> bool + Send + Sync;

/// Packages whose unexported items are runtime machinery.
const RUNTIME_PACKAGES: &[&str] = &[
    "std",
    "core",
    "alloc",
    "backtrace",
    "panic_unwind",
    "test",
    "__rustc",
];

/// Unqualified platform start-up, threading, and unwinding symbols.
const PLATFORM_SYMBOLS: &[&str] = &[
    "__rust_",
    "rust_begin_unwind",
    "rust_panic",
    "_start",
    "__libc_start",
    "start_thread",
    "clone",
    "__clone",
    "__GI_",
    "_pthread",
    "__pthread",
    "thread_start",
    "BaseThreadInitThunk",
    "RtlUserThreadStart",
    "__scrt_common_main",
    "invoke_main",
];

/// Package holding the supervisor's dispatch trampolines.
pub(crate) const TRAMPOLINE_PACKAGE: &str = concat!(env!("CARGO_CRATE_NAME"), "/supervise.");

/// Reports whether `function` is an unexported runtime function.
///
/// Runtime items whose name (and receiver, if any) starts with an uppercase
/// letter are considered user-relevant markers and kept; everything else in
/// a runtime package, and every platform entry symbol, is noise.
/// Unresolved frames (empty symbol) carry nothing to show and count as noise.
#[must_use]
pub fn is_unexported_runtime(function: &str) -> bool {
    if function.is_empty() {
        return true;
    }
    let (package, name) = split_function_path(function);
    if package.is_empty() {
        return name == "main" || PLATFORM_SYMBOLS.iter().any(|p| name.starts_with(p));
    }
    let root = package.split(['/', '.']).next().unwrap_or_default();
    if !RUNTIME_PACKAGES.contains(&root) {
        return false;
    }

    let (receiver, name) = match name.rfind('.') {
        Some(i) => (&name[..i], &name[i + 1..]),
        None => ("", name),
    };
    let receiver = receiver
        .strip_prefix('(')
        .and_then(|r| r.strip_suffix(')'))
        .unwrap_or(receiver);
    !starts_uppercase(name) || (!receiver.is_empty() && !starts_uppercase(receiver))
}

fn starts_uppercase(s: &str) -> bool { s.starts_with(|c: char| c.is_ascii_uppercase()) }

/// Reports whether `function` is one of this crate's dispatch trampolines.
#[must_use]
pub fn is_trampoline(function: &str) -> bool { function.starts_with(TRAMPOLINE_PACKAGE) }

/// Filtered frames of one captured stack, innermost first.
///
/// Each walked frame is resolved only when the iterator reaches it, so stopping
/// early skips the remaining symbolication. The sequence is single-pass.
pub struct CallStack<'p> {
    raw: vec::IntoIter<RawFrame>,
    pending: VecDeque<Frame>,
    predicate: Option<&'p Predicate>,
}

impl<'p> CallStack<'p> {
    /// Iterate over the frames of an already captured trace.
    #[must_use]
    pub fn from_trace(trace: Trace, predicate: Option<&'p Predicate>) -> Self {
        Self {
            raw: trace.into_frames().into_iter(),
            pending: VecDeque::new(),
            predicate,
        }
    }

    fn keep(&self, frame: &Frame) -> bool {
        !is_unexported_runtime(frame.function())
            && !is_trampoline(frame.function())
            && self.predicate.is_none_or(|predicate| predicate(frame))
    }
}

impl Iterator for CallStack<'_> {
    type Item = Frame;

    fn next(&mut self) -> Option<Frame> {
        loop {
            if let Some(frame) = self.pending.pop_front() {
                if self.keep(&frame) {
                    return Some(frame);
                }
                continue;
            }
            let raw = self.raw.next()?;
            if raw.ip().is_null() {
                continue;
            }
            self.pending = frame::resolve(raw);
        }
    }
}

impl FusedIterator for CallStack<'_> {}

/// Capture the current call stack and iterate over its filtered frames.
///
/// `skip == 0` starts at the caller of `call_stack`.
///
/// ```
/// let frames: Vec<_> = panictrace::call_stack(0, None).take(1).collect();
/// assert_eq!(frames.len(), 1);
/// ```
#[inline(never)]
#[must_use]
pub fn call_stack(skip: usize, predicate: Option<&Predicate>) -> CallStack<'_> {
    CallStack::from_trace(capture::raw_stack(skip + 1), predicate)
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("std/panicking.begin_panic", true)]
    #[case("std/panicking.begin_panic.{{closure}}", true)]
    #[case("core/panicking.panic_fmt", true)]
    #[case("core/ops/function.FnOnce.call_once", true)]
    #[case("alloc/boxed.(Box<F, A> as core::ops::function::Fn<Args>).call", true)]
    #[case("std/sys/backtrace.__rust_begin_short_backtrace", true)]
    #[case("backtrace/backtrace.trace", true)]
    #[case("test.run_test.{{closure}}", true)]
    #[case(
        "core/ops/function.(fn() -> core::result::Result<(), alloc::string::String> as core::ops::function::FnOnce<()>).call_once",
        true
    )]
    #[case("std/hint.Marker", false)]
    #[case("std/thread.Builder.Spawn", false)]
    #[case("std/thread.(Builder).Spawn", false)]
    #[case("std/thread.(builder).Spawn", true)]
    #[case("__rustc.rust_begin_unwind", true)]
    #[case("__rust_try", true)]
    #[case("__libc_start_main", true)]
    #[case("clone3", true)]
    #[case("main", true)]
    #[case("", true)]
    #[case("app.main", false)]
    #[case("stdx/io.read", false)]
    #[case("app/core.run", false)]
    fn classifies_runtime_frames(#[case] function: &str, #[case] expected: bool) {
        assert_eq!(is_unexported_runtime(function), expected, "{function}");
    }

    #[rstest]
    #[case("panictrace/supervise.trampoline", true)]
    #[case("panictrace/supervise.<impl panictrace::reporter::Reporter>.handle.{{closure}}", true)]
    #[case("panictrace/supervise/tests.handles", false)]
    #[case("panictrace/render.write_int", false)]
    fn identifies_trampolines(#[case] function: &str, #[case] expected: bool) {
        assert_eq!(is_trampoline(function), expected);
    }

    #[inline(never)]
    fn marker() -> Vec<Frame> { call_stack(0, None).take(1).collect() }

    #[test]
    fn first_frame_is_the_caller() {
        let frames = marker();
        assert_eq!(frames.len(), 1);
        assert!(
            frames[0].function().ends_with("tests.marker"),
            "unexpected first frame {:?}",
            frames[0].function()
        );
    }

    #[test]
    fn predicate_drops_frames() {
        let reject_tests: &Predicate = &|frame: &Frame| !frame.function().contains("/tests.");
        assert!(call_stack(0, Some(reject_tests)).all(|f| !f.function().contains("/tests.")));
    }

    #[test]
    fn empty_trace_yields_nothing() {
        let mut frames = CallStack::from_trace(Trace::default(), None);
        assert!(frames.next().is_none());
        assert!(frames.next().is_none());
    }
}
