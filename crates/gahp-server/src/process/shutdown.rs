//! Signal-driven shutdown.
//!
//! A watcher thread blocks on termination signals. When one arrives it runs
//! the session's cleanup registry and exits the process with the signal
//! number as status. The registry serialises concurrent runs, so a signal
//! racing a normal `QUIT` still runs each step once.

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use signal_hook::consts::signal::{SIGHUP, SIGINT, SIGQUIT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tracing::{info, warn};

use crate::session::CleanupRegistry;

use super::PROCESS_TARGET;

/// Source of termination signals.
pub trait ShutdownSignal: Send + 'static {
    /// Blocks until a signal arrives.
    ///
    /// Returns `None` when the source closes without delivering one.
    fn wait(&mut self) -> Option<i32>;
}

/// Errors reported by shutdown signal listeners.
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Installing signal handlers failed.
    #[error("failed to install signal handlers: {source}")]
    Install {
        /// Underlying IO error.
        #[source]
        source: io::Error,
    },
}

/// Listener for SIGTERM, SIGINT, SIGQUIT and SIGHUP.
pub struct SystemShutdownSignal {
    signals: Signals,
}

impl SystemShutdownSignal {
    /// Installs the signal handlers.
    ///
    /// # Errors
    ///
    /// Returns [`ShutdownError::Install`] when registration fails.
    pub fn install() -> Result<Self, ShutdownError> {
        let signals = Signals::new([SIGTERM, SIGINT, SIGQUIT, SIGHUP])
            .map_err(|source| ShutdownError::Install { source })?;
        Ok(Self { signals })
    }
}

impl ShutdownSignal for SystemShutdownSignal {
    fn wait(&mut self) -> Option<i32> {
        self.signals.forever().next()
    }
}

impl std::fmt::Debug for SystemShutdownSignal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SystemShutdownSignal").finish_non_exhaustive()
    }
}

/// Starts the thread that turns a signal into cleanup and exit.
///
/// `exit` receives the signal number. Production callers pass
/// [`std::process::exit`].
///
/// # Errors
///
/// Returns the spawn error when the thread cannot be created.
pub fn spawn_signal_watcher<S, E>(
    mut signal: S,
    cleanup: Arc<CleanupRegistry>,
    exit: E,
) -> io::Result<JoinHandle<()>>
where
    S: ShutdownSignal,
    E: FnOnce(i32) + Send + 'static,
{
    thread::Builder::new()
        .name("gahp-signals".to_owned())
        .spawn(move || {
            let Some(signal_number) = signal.wait() else {
                warn!(target: PROCESS_TARGET, "signal source closed");
                return;
            };
            info!(target: PROCESS_TARGET, signal = signal_number, "shutdown signal received");
            let report = cleanup.run_all();
            info!(
                target: PROCESS_TARGET,
                executed = report.executed,
                failed = report.failed,
                "cleanup after signal complete"
            );
            exit(signal_number);
        })
}
