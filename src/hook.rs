//! Process panic hook feeding crash reports to supervisors.
//!
//! The stack has to be captured while the panicking frames still exist, so
//! the capture happens in the panic hook and the result is parked in
//! thread-local storage until the supervisor's `catch_unwind` picks it up.
//! Panics outside a supervised scope go to the previously installed hook.
//!
//! Inside a scope the previous hook is never consulted, including for panics
//! the supervised code catches with its own `catch_unwind`. Such captures
//! are tagged with the scope depth and the payload they belong to, and are
//! dropped when that scope exits normally, so they can never be paired with
//! a later payload.

use std::{
    any::{Any, TypeId},
    cell::{Cell, RefCell},
    panic::{self, PanicHookInfo},
    sync::Once,
};

use crate::{
    capture::{self, Trace},
    filter::{CallStack, Predicate},
    frame::RawFrame,
    panic::{PanicMessage, format_panic},
};

thread_local! {
    static DEPTH: Cell<usize> = const { Cell::new(0) };
    static CAPTURED: RefCell<Option<Captured>> = const { RefCell::new(None) };
}

struct Captured {
    trace: Trace,
    location: Option<String>,
    depth: usize,
    payload: PayloadKey,
}

/// What the hook can observe of a payload that the recovered box must match.
#[derive(Debug, PartialEq, Eq)]
struct PayloadKey {
    type_id: TypeId,
    text: Option<String>,
}

impl PayloadKey {
    fn of(payload: &(dyn Any + Send)) -> Self {
        let text = payload
            .downcast_ref::<&'static str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned());
        Self {
            type_id: (*payload).type_id(),
            text,
        }
    }
}

/// Install the supervising panic hook once per process.
///
/// Supervisors call this themselves; calling it early only moves the
/// installation out of the first supervised call. The hook installed before
/// this one keeps handling panics raised outside supervised scopes; panics
/// inside a scope never reach it, even when the supervised code recovers
/// from them itself.
pub fn install() {
    static INSTALL: Once = Once::new();
    INSTALL.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if DEPTH.get() > 0 {
                on_panic(info);
            } else {
                previous(info);
            }
        }));
        tracing::debug!("supervising panic hook installed");
    });
}

#[inline(never)]
fn on_panic(info: &PanicHookInfo<'_>) {
    // Skip this function and the hook closure.
    let trace = capture::raw_stack(2);
    let location = info.location().map(ToString::to_string);
    tracing::debug!(
        frames = trace.len(),
        location = location.as_deref().unwrap_or("<unknown>"),
        "captured stack of supervised panic"
    );
    CAPTURED.set(Some(Captured {
        trace,
        location,
        depth: DEPTH.get(),
        payload: PayloadKey::of(info.payload()),
    }));
}

/// Number of supervised scopes the current thread is in.
pub(crate) fn depth() -> usize { DEPTH.get() }

/// Forget a capture made inside the scope at `depth` or deeper.
///
/// Called when that scope finishes without panicking: any capture left
/// behind belongs to a panic the supervised code recovered from itself.
pub(crate) fn discard(depth: usize) {
    CAPTURED.with_borrow_mut(|slot| {
        if slot.as_ref().is_some_and(|captured| captured.depth >= depth) {
            *slot = None;
        }
    });
}

/// Marks the current thread as supervised while alive.
pub(crate) struct Scope {
    depth: usize,
    previous_origin: Option<Option<RawFrame>>,
}

impl Scope {
    /// Enter a supervised scope, recording `origin` as the task's spawn
    /// site when given.
    pub(crate) fn enter(origin: Option<RawFrame>) -> Self {
        let depth = DEPTH.get() + 1;
        DEPTH.set(depth);
        let previous_origin = origin.map(|origin| capture::replace_origin(Some(origin)));
        Self {
            depth,
            previous_origin,
        }
    }

    /// Nesting level of this scope, 1 for the outermost.
    pub(crate) fn depth(&self) -> usize { self.depth }
}

impl Drop for Scope {
    fn drop(&mut self) {
        DEPTH.set(DEPTH.get() - 1);
        if let Some(previous) = self.previous_origin {
            capture::replace_origin(previous);
        }
    }
}

/// A panic recovered by a supervisor, with the stack captured where it was
/// raised.
pub struct CrashReport {
    payload: Box<dyn Any + Send>,
    trace: Trace,
    location: Option<String>,
}

impl CrashReport {
    /// Build a report for a payload just recovered by the scope at `depth`.
    ///
    /// Picks up the stack the hook captured for it. A capture made in an
    /// enclosing scope is left in place; one made for a different payload is
    /// dropped. A payload raised with `resume_unwind` never reaches the hook
    /// and gets an empty trace.
    pub(crate) fn recovered(payload: Box<dyn Any + Send>, depth: usize) -> Self {
        let captured = CAPTURED.with_borrow_mut(|slot| {
            if slot.as_ref().is_some_and(|captured| captured.depth >= depth) {
                slot.take()
            } else {
                None
            }
        });
        let key = PayloadKey::of(payload.as_ref());
        let (trace, location) = match captured {
            Some(captured) if captured.payload == key => (captured.trace, captured.location),
            _ => (Trace::default(), None),
        };
        Self {
            payload,
            trace,
            location,
        }
    }

    /// The recovered panic value.
    #[must_use]
    pub fn payload(&self) -> &(dyn Any + Send) { self.payload.as_ref() }

    /// The panic value formatted as text.
    pub fn message(&self) -> PanicMessage<'_> { format_panic(self.payload()) }

    /// `file:line:column` of the panic, when the runtime reported one.
    #[must_use]
    pub fn location(&self) -> Option<&str> { self.location.as_deref() }

    /// Raw addresses captured at the panic site.
    #[must_use]
    pub fn trace(&self) -> &Trace { &self.trace }

    /// Filtered frames of the captured stack, innermost first.
    #[must_use]
    pub fn frames<'p>(&self, predicate: Option<&'p Predicate>) -> CallStack<'p> {
        CallStack::from_trace(self.trace.clone(), predicate)
    }

    /// Give back the payload, e.g. to continue unwinding with
    /// [`std::panic::resume_unwind`].
    #[must_use]
    pub fn into_payload(self) -> Box<dyn Any + Send> { self.payload }
}

impl std::fmt::Debug for CrashReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrashReport")
            .field("message", &self.message().to_string())
            .field("location", &self.location)
            .field("frames", &self.trace.len())
            .finish()
    }
}
