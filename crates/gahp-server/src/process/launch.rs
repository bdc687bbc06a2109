//! Launch sequencing for the helper process.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use tracing::info;

use crate::bootstrap::{ConfigLoader, SystemConfigLoader, bootstrap_with};
use crate::health::{HealthReporter, StructuredHealthReporter};
use crate::server::ShutdownReason;

use super::PROCESS_TARGET;
use super::errors::LaunchError;
use super::shutdown::{ShutdownSignal, SystemShutdownSignal, spawn_signal_watcher};

/// Collaborators required to run the helper.
pub struct LaunchPlan<L, S, I, W, E> {
    /// Configuration source.
    pub loader: L,
    /// Lifecycle observer.
    pub reporter: Arc<dyn HealthReporter>,
    /// Termination signal source.
    pub shutdown: S,
    /// Request stream.
    pub input: I,
    /// Response stream.
    pub output: W,
    /// Called with the signal number after signal-driven cleanup.
    pub exit: E,
}

/// Runs the helper on standard input and output.
///
/// # Errors
///
/// Returns [`LaunchError`] when signal handlers, configuration or telemetry
/// cannot be set up.
pub fn run_server() -> Result<ShutdownReason, LaunchError> {
    let plan = LaunchPlan {
        loader: SystemConfigLoader,
        reporter: Arc::new(StructuredHealthReporter::new()),
        shutdown: SystemShutdownSignal::install()?,
        input: io::stdin().lock(),
        output: io::stdout(),
        exit: exit_process,
    };
    run_server_with(plan)
}

/// Runs the helper with injected collaborators.
///
/// Returns once the main loop has stopped and cleanup has run.
///
/// # Errors
///
/// Returns [`LaunchError`] when bootstrap fails or the signal watcher cannot
/// start.
pub fn run_server_with<L, S, I, W, E>(
    plan: LaunchPlan<L, S, I, W, E>,
) -> Result<ShutdownReason, LaunchError>
where
    L: ConfigLoader,
    S: ShutdownSignal,
    I: BufRead,
    W: Write + Send + 'static,
    E: FnOnce(i32) + Send + 'static,
{
    let LaunchPlan {
        loader,
        reporter,
        shutdown,
        input,
        output,
        exit,
    } = plan;

    let helper = bootstrap_with(&loader, Arc::clone(&reporter))?;
    let server = helper.server_builder().output(output).build();
    spawn_signal_watcher(shutdown, server.context().cleanup_registry(), exit)
        .map_err(|source| LaunchError::Watcher { source })?;

    reporter.server_started(server.context().version());
    let reason = server.run(input);
    reporter.server_stopped(reason);
    info!(target: PROCESS_TARGET, %reason, "helper process finished");
    Ok(reason)
}

fn exit_process(code: i32) {
    std::process::exit(code);
}
