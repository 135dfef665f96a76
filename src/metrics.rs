//! Metric helpers for `panictrace`.
//!
//! This module defines metric names and simple helper functions
//! wrapping the [`metrics`](https://docs.rs/metrics) crate. Without the
//! `metrics` feature the helpers compile to nothing.

/// Name of the counter tracking panics handled by a reporter.
pub const PANICS_TOTAL: &str = "panictrace_panics_total";

/// What a reporter did with a recovered panic.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The report was written to the output.
    Rendered,
    /// Rendering was disabled and the panic was swallowed.
    Suppressed,
}

impl Outcome {
    /// Label value recorded for this outcome.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Rendered => "rendered",
            Outcome::Suppressed => "suppressed",
        }
    }
}

/// Record a handled panic.
#[cfg(feature = "metrics")]
pub fn inc_panics(outcome: Outcome) {
    metrics::counter!(PANICS_TOTAL, "outcome" => outcome.as_str()).increment(1);
}

/// Record a handled panic.
#[cfg(not(feature = "metrics"))]
pub fn inc_panics(_outcome: Outcome) {}
