//! Error surface for launching the helper process.

use std::io;

use thiserror::Error;

use crate::bootstrap::BootstrapError;

use super::shutdown::ShutdownError;

/// Errors surfaced while launching the helper.
#[derive(Debug, Error)]
pub enum LaunchError {
    /// Bootstrap failed.
    #[error(transparent)]
    Bootstrap(#[from] BootstrapError),
    /// Signal handlers could not be installed.
    #[error(transparent)]
    Shutdown(#[from] ShutdownError),
    /// The signal watcher thread could not be started.
    #[error("failed to start signal watcher: {source}")]
    Watcher {
        /// Underlying spawn error.
        #[source]
        source: io::Error,
    },
}
