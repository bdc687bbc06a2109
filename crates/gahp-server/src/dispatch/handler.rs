//! Handler capability and the values handlers hand back to the main loop.
//!
//! Handlers run synchronously on the main loop thread. Anything slow is
//! returned as a [`DeferredTask`], which the loop starts on its own thread
//! once the immediate acknowledgement has been written.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use thiserror::Error;
use tracing::warn;

use super::errors::DispatchError;
use super::request::{CommandRequest, RequestId};
use super::response::Response;
use crate::session::{ExecutionContext, SESSION_TARGET};

/// A command implementation.
///
/// Closures with the matching signature implement the trait, which keeps
/// small commands short to register.
#[cfg_attr(test, mockall::automock)]
pub trait CommandHandler: Send + Sync {
    /// Handles one request and produces the immediate result.
    ///
    /// # Errors
    ///
    /// Returns a [`DispatchError`]; the dispatcher turns it into `E` or `F`.
    fn handle(
        &self,
        request: &CommandRequest,
        context: &ExecutionContext,
    ) -> Result<HandlerResult, DispatchError>;
}

impl<F> CommandHandler for F
where
    F: Fn(&CommandRequest, &ExecutionContext) -> Result<HandlerResult, DispatchError>
        + Send
        + Sync,
{
    fn handle(
        &self,
        request: &CommandRequest,
        context: &ExecutionContext,
    ) -> Result<HandlerResult, DispatchError> {
        self(request, context)
    }
}

/// Outcome of a handler invocation.
#[derive(Debug)]
pub struct HandlerResult {
    response: Response,
    deferred: Option<DeferredTask>,
    prefix_change: Option<String>,
}

impl HandlerResult {
    /// Wraps an immediate response with no side effects.
    #[must_use]
    pub const fn respond(response: Response) -> Self {
        Self {
            response,
            deferred: None,
            prefix_change: None,
        }
    }

    /// Shorthand for a bare `S`.
    #[must_use]
    pub fn success() -> Self {
        Self::respond(Response::success())
    }

    /// Attaches background work started after the response is written.
    #[must_use]
    pub fn with_deferred(mut self, task: DeferredTask) -> Self {
        self.deferred = Some(task);
        self
    }

    /// Stages a new response prefix.
    ///
    /// The prefix is committed only after this result's response has been
    /// written, so the response itself still carries the old prefix.
    #[must_use]
    pub fn with_prefix_change(mut self, prefix: impl Into<String>) -> Self {
        self.prefix_change = Some(prefix.into());
        self
    }

    /// Returns the immediate response.
    #[must_use]
    pub const fn response(&self) -> &Response {
        &self.response
    }

    /// Returns the staged prefix, if any.
    #[must_use]
    pub fn prefix_change(&self) -> Option<&str> {
        self.prefix_change.as_deref()
    }

    /// Returns `true` when background work is attached.
    #[must_use]
    pub const fn has_deferred(&self) -> bool {
        self.deferred.is_some()
    }

    /// Splits the result into its parts.
    #[must_use]
    pub fn into_parts(self) -> (Response, Option<DeferredTask>, Option<String>) {
        (self.response, self.deferred, self.prefix_change)
    }
}

impl From<Response> for HandlerResult {
    fn from(response: Response) -> Self {
        Self::respond(response)
    }
}

/// Failure reported by deferred work.
///
/// The message is queued as `<request_id> F <message>`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct TaskFailure {
    message: String,
}

impl TaskFailure {
    /// Creates a failure with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

type TaskBody = Box<dyn FnOnce(&ExecutionContext) + Send + 'static>;

/// Background work returned by a handler.
pub struct DeferredTask {
    label: String,
    body: TaskBody,
}

impl DeferredTask {
    /// Runs `work` and queues its outcome under `request_id`.
    ///
    /// Success queues the returned tokens. An error or a panic queues
    /// `F <message>` so the controller always receives a result.
    pub fn with_result<F>(request_id: RequestId, work: F) -> Self
    where
        F: FnOnce(&ExecutionContext) -> Result<Vec<String>, TaskFailure> + Send + 'static,
    {
        let body = move |context: &ExecutionContext| {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| work(context)));
            let tokens = match outcome {
                Ok(Ok(tokens)) => tokens,
                Ok(Err(failure)) => failure_tokens(failure.message()),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(
                        target: SESSION_TARGET,
                        request_id = request_id.get(),
                        %message,
                        "deferred task panicked"
                    );
                    failure_tokens(&message)
                }
            };
            context.add_result(request_id, tokens);
        };
        Self {
            label: format!("request-{request_id}"),
            body: Box::new(body),
        }
    }

    /// Runs `work` with no automatic result delivery.
    ///
    /// The closure is responsible for calling
    /// [`ExecutionContext::add_result`] itself, if at all.
    pub fn detached<F>(work: F) -> Self
    where
        F: FnOnce(&ExecutionContext) + Send + 'static,
    {
        Self {
            label: "detached".to_owned(),
            body: Box::new(work),
        }
    }

    /// Returns a short label used for thread names and logs.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Executes the task on the current thread.
    pub fn run(self, context: &ExecutionContext) {
        (self.body)(context);
    }
}

impl fmt::Debug for DeferredTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredTask")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

fn failure_tokens(message: &str) -> Vec<String> {
    vec!["F".to_owned(), message.to_owned()]
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "task panicked".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::ExecutionContext;

    fn drained(context: &ExecutionContext) -> Vec<(u64, Vec<String>)> {
        context
            .drain_results()
            .into_iter()
            .map(|result| (result.request_id().get(), result.tokens().to_vec()))
            .collect()
    }

    #[test]
    fn successful_work_queues_tokens() {
        let context = ExecutionContext::for_tests();
        let task = DeferredTask::with_result(RequestId::new(7), |_| {
            Ok(vec!["0".to_owned(), "NULL".to_owned()])
        });
        assert_eq!(task.label(), "request-7");
        task.run(&context);

        assert_eq!(
            drained(&context),
            vec![(7, vec!["0".to_owned(), "NULL".to_owned()])]
        );
    }

    #[test]
    fn failed_work_queues_failure_marker() {
        let context = ExecutionContext::for_tests();
        DeferredTask::with_result(RequestId::new(3), |_| Err(TaskFailure::new("no route")))
            .run(&context);

        assert_eq!(
            drained(&context),
            vec![(3, vec!["F".to_owned(), "no route".to_owned()])]
        );
    }

    #[test]
    fn panicking_work_queues_failure_marker() {
        let context = ExecutionContext::for_tests();
        DeferredTask::with_result(RequestId::new(9), |_| -> Result<Vec<String>, TaskFailure> {
            panic!("lost connection")
        })
        .run(&context);

        assert_eq!(
            drained(&context),
            vec![(9, vec!["F".to_owned(), "lost connection".to_owned()])]
        );
    }

    #[test]
    fn detached_work_controls_delivery() {
        let context = ExecutionContext::for_tests();
        DeferredTask::detached(|ctx| {
            ctx.add_result(RequestId::new(1), vec!["a".to_owned()]);
            ctx.add_result(RequestId::new(2), vec!["b".to_owned()]);
        })
        .run(&context);

        assert_eq!(drained(&context).len(), 2);
    }

    #[test]
    fn staged_prefix_is_exposed() {
        let result = HandlerResult::success().with_prefix_change("GAHP:");
        assert_eq!(result.prefix_change(), Some("GAHP:"));
        assert!(!result.has_deferred());
    }
}
