//! Command-name routing.
//!
//! Names are stored uppercased, so lookups ignore the case the controller
//! used. Handler errors are converted to wire responses here; nothing past
//! this boundary sees a [`DispatchError`].

use std::collections::BTreeMap;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use tracing::{debug, warn};

use super::errors::DispatchError;
use super::handler::{CommandHandler, HandlerResult, panic_message};
use super::request::CommandRequest;
use crate::session::ExecutionContext;

/// Tracing target for dispatch operations.
pub(crate) const DISPATCH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::dispatch");

/// Routes command tokens to registered handlers.
#[derive(Default, Clone)]
pub struct Dispatcher {
    handlers: BTreeMap<String, Arc<dyn CommandHandler>>,
}

impl Dispatcher {
    /// Creates an empty dispatcher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` under `name`, replacing any earlier registration.
    pub fn register(&mut self, name: &str, handler: Arc<dyn CommandHandler>) {
        let key = name.to_ascii_uppercase();
        if self.handlers.insert(key.clone(), handler).is_some() {
            debug!(target: DISPATCH_TARGET, command = %key, "replaced command handler");
        }
    }

    /// Returns `true` when a handler is registered under `name`.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(&name.to_ascii_uppercase())
    }

    /// Returns the registered command names in sorted order.
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.handlers.keys().cloned().collect()
    }

    /// Dispatches a tokenized line.
    ///
    /// Always produces a result: lookup and handler errors become `E` or
    /// `F` responses, and a panicking handler answers `F <panic message>`.
    pub fn dispatch(&self, tokens: Vec<String>, context: &ExecutionContext) -> HandlerResult {
        match self.try_dispatch(tokens, context) {
            Ok(result) => result,
            Err(error) => {
                warn!(target: DISPATCH_TARGET, %error, "command rejected");
                HandlerResult::respond(error.to_response())
            }
        }
    }

    fn try_dispatch(
        &self,
        tokens: Vec<String>,
        context: &ExecutionContext,
    ) -> Result<HandlerResult, DispatchError> {
        let request = CommandRequest::from_tokens(tokens)?;
        let handler = self
            .handlers
            .get(request.name())
            .ok_or_else(|| DispatchError::unknown_command(request.name()))?;

        debug!(
            target: DISPATCH_TARGET,
            command = request.name(),
            arguments = request.arguments().len(),
            "dispatching command"
        );
        panic::catch_unwind(AssertUnwindSafe(|| handler.handle(&request, context))).unwrap_or_else(
            |payload| {
                let message = panic_message(payload.as_ref());
                warn!(
                    target: DISPATCH_TARGET,
                    command = request.name(),
                    %message,
                    "command handler panicked"
                );
                Err(DispatchError::failure(message))
            },
        )
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("commands", &self.commands())
            .finish()
    }
}
