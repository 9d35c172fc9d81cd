//! Per-run state threaded through every pipeline step.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::alias::Environment;

/// Mutable state owned by a single pull.
///
/// Nothing here outlives the run: each invocation builds a fresh context.
#[derive(Clone, Debug, Default)]
pub struct RunContext {
    environment: Option<Environment>,
    errors: usize,
    interrupted: Arc<AtomicBool>,
}

impl RunContext {
    /// Creates an empty context with no resolved environment.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context observing an externally owned interruption flag,
    /// typically set by a termination-signal handler.
    #[must_use]
    pub fn with_interrupt_flag(interrupted: Arc<AtomicBool>) -> Self {
        Self {
            interrupted,
            ..Self::default()
        }
    }

    /// Returns the resolved environment, if any.
    #[must_use]
    pub const fn environment(&self) -> Option<&Environment> {
        self.environment.as_ref()
    }

    /// Records the environment every remote call is routed through.
    pub fn set_environment(&mut self, environment: Environment) {
        self.environment = Some(environment);
    }

    /// Counts one non-fatal failure.
    pub const fn record_failure(&mut self) {
        self.errors += 1;
    }

    /// Number of non-fatal failures recorded so far.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors
    }

    /// Returns `true` once a termination signal has been observed.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        self.interrupted.load(Ordering::SeqCst)
    }
}
