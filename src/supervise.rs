//! Supervision of closures, threads, and async tasks.
//!
//! Everything defined here is dispatch machinery between the caller and the
//! supervised code; frames from this module are dropped from rendered
//! traces.

use std::{
    future::Future,
    panic::{self, AssertUnwindSafe},
    sync::Arc,
    thread,
};

use futures::FutureExt;

use crate::{
    capture,
    filter::Predicate,
    frame::RawFrame,
    hook::{self, CrashReport, Scope},
    render::Printer,
    reporter::Reporter,
};

#[inline(never)]
fn trampoline<T>(origin: Option<RawFrame>, f: impl FnOnce() -> T) -> Result<T, CrashReport> {
    let scope = Scope::enter(origin);
    let result = panic::catch_unwind(AssertUnwindSafe(f));
    let depth = scope.depth();
    drop(scope);
    match result {
        Ok(value) => {
            hook::discard(depth);
            Ok(value)
        }
        Err(payload) => Err(CrashReport::recovered(payload, depth)),
    }
}

/// Run `f`, turning a panic into a [`CrashReport`] that holds the payload and
/// the stack captured where the panic was raised.
///
/// The default panic message is not printed for panics caught here.
///
/// ```
/// let report = panictrace::catch(|| panic!("boom")).unwrap_err();
/// assert_eq!(report.message().to_string(), "boom");
/// ```
///
/// # Errors
///
/// Returns the crash report if `f` panics.
#[inline(never)]
pub fn catch<T>(f: impl FnOnce() -> T) -> Result<T, CrashReport> {
    hook::install();
    trampoline(None, f)
}

impl Reporter {
    /// Run `f`, rendering any panic it raises.
    ///
    /// Returns `Some` with the result of `f`, or `None` after a panic was
    /// handled. With `exit` set, a rendered panic terminates the process with
    /// [`EXIT_CODE`](crate::EXIT_CODE) instead of returning.
    #[inline(never)]
    pub fn handle<T>(
        &self,
        exit: bool,
        printer: Option<&Printer>,
        predicate: Option<&Predicate>,
        f: impl FnOnce() -> T,
    ) -> Option<T> {
        hook::install();
        self.supervise(None, exit, printer, predicate, f)
    }

    fn supervise<T>(
        &self,
        origin: Option<RawFrame>,
        exit: bool,
        printer: Option<&Printer>,
        predicate: Option<&Predicate>,
        f: impl FnOnce() -> T,
    ) -> Option<T> {
        match trampoline(origin, f) {
            Ok(value) => Some(value),
            Err(report) => {
                self.report(&report, exit, printer, predicate);
                None
            }
        }
    }

    /// Run `task` on a new thread, rendering any panic it raises.
    ///
    /// The spawning frame is appended to the rendered trace. With `exit`
    /// set a rendered panic terminates the process.
    #[inline(never)]
    pub fn spawn<F>(
        self: &Arc<Self>,
        exit: bool,
        task: F,
        printer: Option<Box<Printer>>,
        predicate: Option<Box<Predicate>>,
    ) -> thread::JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        self.spawn_from(capture::spawn_site(1), exit, task, printer, predicate)
    }

    fn spawn_from<F>(
        self: &Arc<Self>,
        origin: Option<RawFrame>,
        exit: bool,
        task: F,
        printer: Option<Box<Printer>>,
        predicate: Option<Box<Predicate>>,
    ) -> thread::JoinHandle<()>
    where
        F: FnOnce() + Send + 'static,
    {
        hook::install();
        let reporter = Arc::clone(self);
        thread::spawn(move || {
            reporter.supervise(origin, exit, printer.as_deref(), predicate.as_deref(), task);
        })
    }

    /// Run `future` as a task on the current tokio runtime, rendering any
    /// panic it raises.
    ///
    /// The task is marked as supervised around every poll, so it may move
    /// between worker threads freely.
    ///
    /// # Panics
    ///
    /// Panics if called outside a tokio runtime.
    #[inline(never)]
    pub fn spawn_async<F>(
        self: &Arc<Self>,
        exit: bool,
        future: F,
        printer: Option<Box<Printer>>,
        predicate: Option<Box<Predicate>>,
    ) -> tokio::task::JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.spawn_async_from(capture::spawn_site(1), exit, future, printer, predicate)
    }

    fn spawn_async_from<F>(
        self: &Arc<Self>,
        origin: Option<RawFrame>,
        exit: bool,
        future: F,
        printer: Option<Box<Printer>>,
        predicate: Option<Box<Predicate>>,
    ) -> tokio::task::JoinHandle<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        hook::install();
        let reporter = Arc::clone(self);
        tokio::spawn(async move {
            let mut future = Box::pin(future);
            let scoped = std::future::poll_fn(move |cx| {
                let scope = Scope::enter(origin);
                let poll = future.as_mut().poll(cx);
                hook::discard(scope.depth());
                poll
            });
            if let Err(payload) = AssertUnwindSafe(scoped).catch_unwind().await {
                let report = CrashReport::recovered(payload, hook::depth() + 1);
                reporter.report(&report, exit, printer.as_deref(), predicate.as_deref());
            }
        })
    }
}

/// Run `f` under the global reporter, rendering any panic it raises.
///
/// See [`Reporter::handle`].
#[inline(never)]
pub fn handle<T>(
    exit: bool,
    printer: Option<&Printer>,
    predicate: Option<&Predicate>,
    f: impl FnOnce() -> T,
) -> Option<T> {
    Reporter::global().handle(exit, printer, predicate, f)
}

/// Run `task` on a new thread; a panic in it is rendered on the global
/// reporter and then terminates the process with
/// [`EXIT_CODE`](crate::EXIT_CODE).
///
/// Unlike a plain [`std::thread::spawn`], a panicking task cannot die
/// unnoticed while the rest of the process carries on.
#[inline(never)]
pub fn go<F>(
    task: F,
    printer: Option<Box<Printer>>,
    predicate: Option<Box<Predicate>>,
) -> thread::JoinHandle<()>
where
    F: FnOnce() + Send + 'static,
{
    Reporter::global().spawn_from(capture::spawn_site(1), true, task, printer, predicate)
}

/// Async counterpart of [`go`], spawning on the current tokio runtime.
///
/// # Panics
///
/// Panics if called outside a tokio runtime.
#[inline(never)]
pub fn go_async<F>(
    future: F,
    printer: Option<Box<Printer>>,
    predicate: Option<Box<Predicate>>,
) -> tokio::task::JoinHandle<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    Reporter::global().spawn_async_from(capture::spawn_site(1), true, future, printer, predicate)
}

#[cfg(test)]
mod tests {
    use std::{io, panic};

    use super::*;

    #[test]
    fn catch_returns_value_without_panic() {
        assert_eq!(catch(|| 7).ok(), Some(7));
    }

    #[test]
    fn catch_captures_stack_and_location() {
        let report = catch(|| panic!("boom")).expect_err("closure panics");
        assert_eq!(report.message().to_string(), "boom");
        assert!(!report.trace().is_empty());
        assert!(report.location().is_some_and(|l| l.contains("supervise.rs")));
    }

    #[test]
    fn resumed_unwinds_have_empty_traces() {
        let report = catch(|| panic::resume_unwind(Box::new("silent"))).expect_err("closure unwinds");
        assert!(report.trace().is_empty());
        assert_eq!(report.message().to_string(), "silent");
    }

    #[test]
    fn nested_catch_reports_inner_panic_only() {
        let outer = catch(|| {
            let inner = catch(|| panic!("inner")).expect_err("inner closure panics");
            assert_eq!(inner.message().to_string(), "inner");
            panic!("outer");
        })
        .expect_err("outer closure panics");
        assert_eq!(outer.message().to_string(), "outer");
    }

    #[test]
    fn recovered_inner_panic_leaves_no_trace_behind() {
        let report = catch(|| {
            let caught = panic::catch_unwind(|| panic!("inner"));
            assert!(caught.is_err());
            panic::resume_unwind(Box::new("outer"))
        })
        .expect_err("closure unwinds");
        assert_eq!(report.message().to_string(), "outer");
        assert!(report.trace().is_empty());
        assert!(report.location().is_none());
    }

    #[test]
    fn rethrown_payload_keeps_its_trace() {
        let report = catch(|| {
            let payload = panic::catch_unwind(|| panic!("again")).expect_err("inner closure panics");
            panic::resume_unwind(payload)
        })
        .expect_err("closure unwinds");
        assert_eq!(report.message().to_string(), "again");
        assert!(!report.trace().is_empty());
    }

    #[test]
    fn clean_exit_discards_recovered_capture() {
        let value = catch(|| {
            let _ = panic::catch_unwind(|| panic!("handled"));
            3
        });
        assert_eq!(value.ok(), Some(3));
        let report = catch(|| panic::resume_unwind(Box::new("handled"))).expect_err("closure unwinds");
        assert!(report.trace().is_empty());
    }

    #[test]
    fn handle_returns_none_after_panic() {
        let reporter = Reporter::with_output(io::sink(), false);
        assert_eq!(reporter.handle(false, None, None, || 1), Some(1));
        assert_eq!(reporter.handle(false, None, None, || -> i32 { panic!("boom") }), None);
    }
}
