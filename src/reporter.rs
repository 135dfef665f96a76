//! Render state shared by every supervisor of a reporter.
//!
//! A [`Reporter`] owns the output writer, the color flag, and the enabled
//! flag behind one mutex. The lock is held for the whole render, so
//! concurrent panics never interleave and a color or output change never
//! lands in the middle of a report. A process-wide instance is built lazily
//! from the environment; further instances can be created for tests or
//! embedding.

use std::{
    io::{self, Write},
    process,
    sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError},
};

use crate::{
    config::Config,
    filter::Predicate,
    hook::CrashReport,
    metrics::{self, Outcome},
    render::{Printer, Renderer},
};

/// Exit status used when a fatal panic has been rendered.
pub const EXIT_CODE: i32 = 2;

struct State {
    enabled: bool,
    color: bool,
    output: Box<dyn Write + Send>,
}

/// Destination and policy for rendered panic reports.
pub struct Reporter {
    state: Mutex<State>,
}

impl Reporter {
    /// Create a reporter writing to standard error.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self::from_parts(config.enabled, config.stderr_color(), Box::new(io::stderr()))
    }

    /// Create an enabled reporter writing to `output`.
    #[must_use]
    pub fn with_output(output: impl Write + Send + 'static, color: bool) -> Self {
        Self::from_parts(true, color, Box::new(output))
    }

    fn from_parts(enabled: bool, color: bool, output: Box<dyn Write + Send>) -> Self {
        Self {
            state: Mutex::new(State {
                enabled,
                color,
                output,
            }),
        }
    }

    /// The process-wide reporter, configured from the environment on first use.
    pub fn global() -> &'static Arc<Reporter> {
        static GLOBAL: OnceLock<Arc<Reporter>> = OnceLock::new();
        GLOBAL.get_or_init(|| Arc::new(Reporter::new(Config::from_env())))
    }

    // A panic while rendering is not supported; a poisoned lock still holds
    // consistent flags and a usable writer.
    fn lock(&self) -> MutexGuard<'_, State> { self.state.lock().unwrap_or_else(PoisonError::into_inner) }

    /// Render recovered panics again.
    pub fn enable(&self) { self.lock().enabled = true; }

    /// Swallow recovered panics without writing anything.
    pub fn disable(&self) { self.lock().enabled = false; }

    /// Whether recovered panics are rendered.
    #[must_use]
    pub fn is_enabled(&self) -> bool { self.lock().enabled }

    /// Turn ANSI styling on or off.
    pub fn set_color(&self, color: bool) { self.lock().color = color; }

    /// Whether reports are styled.
    #[must_use]
    pub fn color_enabled(&self) -> bool { self.lock().color }

    /// Replace the output writer.
    pub fn set_output(&self, output: impl Write + Send + 'static) {
        self.lock().output = Box::new(output);
    }

    /// Render `report`, then exit with [`EXIT_CODE`] if `exit` is set.
    ///
    /// When the reporter is disabled the panic is swallowed silently and the
    /// process never exits. Write failures are logged and otherwise ignored.
    pub fn report(
        &self,
        report: &CrashReport,
        exit: bool,
        printer: Option<&Printer>,
        predicate: Option<&Predicate>,
    ) {
        let mut state = self.lock();
        if !state.enabled {
            metrics::inc_panics(Outcome::Suppressed);
            tracing::debug!(panic = %report.message(), "panic suppressed, rendering disabled");
            return;
        }

        let renderer = Renderer::new(state.color);
        let frames = report.frames(predicate);
        if let Err(e) = renderer.render(&mut *state.output, report.payload(), printer, frames) {
            tracing::warn!(error = %e, "failed to write panic report");
        }
        metrics::inc_panics(Outcome::Rendered);

        if exit {
            tracing::debug!(code = EXIT_CODE, "exiting after fatal panic");
            process::exit(EXIT_CODE);
        }
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.lock();
        f.debug_struct("Reporter")
            .field("enabled", &state.enabled)
            .field("color", &state.color)
            .finish_non_exhaustive()
    }
}

/// Render recovered panics on the global reporter.
pub fn enable() { Reporter::global().enable(); }

/// Silently swallow recovered panics on the global reporter.
pub fn disable() { Reporter::global().disable(); }
