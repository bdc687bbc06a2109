//! Lifecycle reporting for the helper server.

use std::sync::Arc;

use gahp_config::Config;

use crate::bootstrap::BootstrapError;
use crate::server::ShutdownReason;

const HEALTH_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::health");

/// Observer for lifecycle events.
pub trait HealthReporter: Send + Sync {
    /// Invoked before configuration loading begins.
    fn bootstrap_starting(&self);

    /// Invoked after bootstrap completes.
    fn bootstrap_succeeded(&self, config: &Config);

    /// Invoked when bootstrap fails.
    fn bootstrap_failed(&self, error: &BootstrapError);

    /// Invoked once the main loop is about to read requests.
    fn server_started(&self, version: &str);

    /// Invoked after the main loop has stopped and cleanup has run.
    fn server_stopped(&self, reason: ShutdownReason);
}

impl<T> HealthReporter for Arc<T>
where
    T: HealthReporter + ?Sized,
{
    fn bootstrap_starting(&self) {
        (**self).bootstrap_starting();
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        (**self).bootstrap_succeeded(config);
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        (**self).bootstrap_failed(error);
    }

    fn server_started(&self, version: &str) {
        (**self).server_started(version);
    }

    fn server_stopped(&self, reason: ShutdownReason) {
        (**self).server_stopped(reason);
    }
}

/// Reporter that logs lifecycle events through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct StructuredHealthReporter;

impl StructuredHealthReporter {
    /// Builds a new reporter.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl HealthReporter for StructuredHealthReporter {
    fn bootstrap_starting(&self) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_starting",
            "starting helper bootstrap"
        );
    }

    fn bootstrap_succeeded(&self, config: &Config) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "bootstrap_succeeded",
            log_filter = %config.log_filter(),
            log_format = %config.log_format(),
            version_override = config.gahp_version().is_some(),
            "helper bootstrap completed"
        );
    }

    fn bootstrap_failed(&self, error: &BootstrapError) {
        tracing::error!(
            target: HEALTH_TARGET,
            event = "bootstrap_failed",
            error = %error,
            "helper bootstrap failed"
        );
    }

    fn server_started(&self, version: &str) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_started",
            version,
            "helper serving on stdin/stdout"
        );
    }

    fn server_stopped(&self, reason: ShutdownReason) {
        tracing::info!(
            target: HEALTH_TARGET,
            event = "server_stopped",
            reason = %reason,
            "helper stopped"
        );
    }
}
