//! Completed deferred results and the asynchronous notification latch.
//!
//! Producers append from any thread. In async mode the first append after
//! the latch was cleared writes a single `R` line; later appends stay silent
//! until the controller drains the queue or switches async mode on again.
//!
//! `add` takes the output lock before the queue lock. Nothing takes them in
//! the opposite order.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use super::SESSION_TARGET;
use crate::codec::join_escaped;
use crate::dispatch::RequestId;
use crate::output::OutputChannel;

/// A completed deferred result awaiting `RESULTS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingResult {
    request_id: RequestId,
    tokens: Vec<String>,
}

impl PendingResult {
    /// Creates a pending result.
    #[must_use]
    pub const fn new(request_id: RequestId, tokens: Vec<String>) -> Self {
        Self { request_id, tokens }
    }

    /// Returns the request id the result answers.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the unescaped result tokens.
    #[must_use]
    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    /// Renders the `RESULTS` line for this entry.
    #[must_use]
    pub fn to_line(&self) -> String {
        if self.tokens.is_empty() {
            self.request_id.to_string()
        } else {
            format!("{} {}", self.request_id, join_escaped(&self.tokens))
        }
    }
}

#[derive(Debug, Default)]
struct QueueState {
    pending: VecDeque<PendingResult>,
    async_mode: bool,
    has_new_results: bool,
}

/// FIFO of completed results plus the async-mode flags.
#[derive(Debug)]
pub struct ResultQueue {
    output: Arc<OutputChannel>,
    state: Mutex<QueueState>,
}

impl ResultQueue {
    /// Creates an empty queue that notifies through `output`.
    #[must_use]
    pub fn new(output: Arc<OutputChannel>) -> Self {
        Self {
            output,
            state: Mutex::new(QueueState::default()),
        }
    }

    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Appends a result, notifying the controller when required.
    pub fn add(&self, request_id: RequestId, tokens: Vec<String>) {
        let mut output = self.output.lock();
        let mut state = self.state();
        state.pending.push_back(PendingResult::new(request_id, tokens));
        debug!(
            target: SESSION_TARGET,
            request_id = request_id.get(),
            queued = state.pending.len(),
            "result queued"
        );

        if state.async_mode && !state.has_new_results {
            state.has_new_results = true;
            if let Err(error) = output.write_notification() {
                warn!(target: SESSION_TARGET, %error, "failed to write result notification");
            }
        }
    }

    /// Removes and returns every queued result in insertion order.
    ///
    /// Clears the notification latch.
    pub fn drain(&self) -> Vec<PendingResult> {
        let mut state = self.state();
        state.has_new_results = false;
        state.pending.drain(..).collect()
    }

    /// Switches async mode. Turning it on clears the notification latch.
    pub fn set_async_mode(&self, enabled: bool) {
        let mut state = self.state();
        state.async_mode = enabled;
        if enabled {
            state.has_new_results = false;
        }
    }

    /// Returns `true` when async mode is on.
    #[must_use]
    pub fn async_mode(&self) -> bool {
        self.state().async_mode
    }

    /// Returns the number of queued results.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state().pending.len()
    }

    /// Returns `true` when no results are queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.state().pending.is_empty()
    }
}
