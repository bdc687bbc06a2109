//! Command-dispatch and result-delivery engine for GAHP-style helper servers.
//!
//! A helper server talks to a single controlling parent over standard input
//! and output. Every request is one line: a command name followed by escaped
//! arguments. Commands either answer at once with `S`, `E` or `F`, or hand
//! back a [`DeferredTask`] that runs on its own thread and later queues a
//! result keyed by the request id the controller chose. The controller
//! collects queued results with `RESULTS`; after `ASYNC_MODE_ON` the server
//! also writes an unsolicited `R` line whenever the queue goes from empty to
//! non-empty.
//!
//! Embedding a new command set means registering [`CommandHandler`]s on a
//! [`ServerBuilder`]:
//!
//! ```no_run
//! use gahp_server::{
//!     CommandRequest, DeferredTask, DispatchError, ExecutionContext, HandlerResult, Server,
//! };
//!
//! let server = Server::builder()
//!     .command(
//!         "PING",
//!         |request: &CommandRequest, _: &ExecutionContext| -> Result<_, DispatchError> {
//!             request.expect_arguments(1)?;
//!             let id = request.request_id(0)?;
//!             Ok(HandlerResult::success()
//!                 .with_deferred(DeferredTask::with_result(id, |_| Ok(vec!["0".to_owned()]))))
//!         },
//!     )
//!     .build();
//! server.run(std::io::stdin().lock());
//! ```
//!
//! The binary wires the same server to configuration from [`gahp_config`],
//! structured logging on standard error and signal-driven cleanup.

mod bootstrap;
mod builtins;
pub mod codec;
mod dispatch;
mod health;
mod output;
mod process;
mod server;
mod session;
pub mod telemetry;

pub use bootstrap::{
    BootstrapError, ConfigLoader, Helper, StaticConfigLoader, SystemConfigLoader, bootstrap_with,
};
pub use builtins::{
    ASYNC_MODE_OFF, ASYNC_MODE_ON, COMMANDS, QUIT, RESPONSE_PREFIX, RESULTS, VERSION,
};
pub use dispatch::{
    CommandHandler, CommandRequest, DeferredTask, DispatchError, Dispatcher, HandlerResult,
    NULL_ARGUMENT, Outcome, RequestId, RequestIdParseError, Response, TaskFailure,
};
pub use health::{HealthReporter, StructuredHealthReporter};
pub use output::{OutputChannel, RESULTS_READY};
pub use process::{
    LaunchError, LaunchPlan, ShutdownError, ShutdownSignal, SystemShutdownSignal, run_server,
    run_server_with, spawn_signal_watcher,
};
pub use server::{DEFAULT_VERSION, Server, ServerBuilder, ShutdownReason};
pub use session::{
    CleanupError, CleanupRegistry, CleanupReport, ExecutionContext, ObjectStore, PendingResult,
    ResultQueue, StoredObject, UniqueIdGenerator,
};
pub use telemetry::{TelemetryError, TelemetryHandle};

#[cfg(test)]
mod tests;
