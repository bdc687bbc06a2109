//! Ordered shutdown actions.
//!
//! Steps run in registration order, each exactly once. The normal shutdown
//! path and the signal watcher may both call [`CleanupRegistry::run_all`]; the
//! run lock makes the second caller wait for the first and then find an empty
//! list.

use std::error::Error as StdError;
use std::fmt;
use std::mem;
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{debug, warn};

use super::SESSION_TARGET;
use crate::dispatch::panic_message;

/// Failure reported by a cleanup step.
#[derive(Debug, Error)]
#[error("cleanup step failed: {source}")]
pub struct CleanupError {
    #[source]
    source: Box<dyn StdError + Send + Sync>,
}

impl CleanupError {
    /// Wraps any error or message.
    pub fn new(source: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self {
            source: source.into(),
        }
    }
}

type CleanupStep = Box<dyn FnOnce() -> Result<(), CleanupError> + Send>;

/// Summary of one [`CleanupRegistry::run_all`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleanupReport {
    /// Steps executed during the pass.
    pub executed: usize,
    /// Steps that returned an error or panicked.
    pub failed: usize,
}

/// FIFO list of shutdown actions.
#[derive(Default)]
pub struct CleanupRegistry {
    steps: Mutex<Vec<CleanupStep>>,
    run: Mutex<()>,
}

impl CleanupRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn steps(&self) -> MutexGuard<'_, Vec<CleanupStep>> {
        self.steps.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a step.
    pub fn register<F>(&self, step: F)
    where
        F: FnOnce() -> Result<(), CleanupError> + Send + 'static,
    {
        self.steps().push(Box::new(step));
    }

    /// Returns the number of steps waiting to run.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps().len()
    }

    /// Returns `true` when no steps are waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps().is_empty()
    }

    /// Runs and clears every registered step.
    ///
    /// Failures and panics are logged and never stop later steps. Steps
    /// registered while a run is in progress are kept for the next run.
    pub fn run_all(&self) -> CleanupReport {
        let _run = self.run.lock().unwrap_or_else(PoisonError::into_inner);
        let steps = mem::take(&mut *self.steps());
        let mut report = CleanupReport::default();

        for (index, step) in steps.into_iter().enumerate() {
            report.executed += 1;
            match panic::catch_unwind(AssertUnwindSafe(step)) {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    report.failed += 1;
                    warn!(target: SESSION_TARGET, step = index, %error, "cleanup step failed");
                }
                Err(payload) => {
                    report.failed += 1;
                    let message = panic_message(payload.as_ref());
                    warn!(target: SESSION_TARGET, step = index, %message, "cleanup step panicked");
                }
            }
        }

        debug!(
            target: SESSION_TARGET,
            executed = report.executed,
            failed = report.failed,
            "cleanup finished"
        );
        report
    }
}

impl fmt::Debug for CleanupRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CleanupRegistry")
            .field("pending", &self.len())
            .finish()
    }
}
