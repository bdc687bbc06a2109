//! Shared configuration for the GAHP helper server.
//!
//! Values are layered by [`ortho_config`]: built-in defaults first, then
//! configuration files, then `GAHP_*` environment variables, and finally
//! command-line flags. The controlling parent normally launches the server
//! with no arguments at all, so every field must have a usable default.

mod defaults;
mod logging;

use serde::{Deserialize, Serialize};

use ortho_config::OrthoConfig;

pub use defaults::{
    DEFAULT_LOG_FILTER, default_log_filter, default_log_filter_string, default_log_format,
};
pub use logging::{LogFormat, LogFormatParseError};

/// Environment variable prefix recognised by the loader.
pub const ENV_PREFIX: &str = "GAHP";

/// Resolved server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, OrthoConfig)]
#[ortho_config(prefix = "GAHP")]
pub struct Config {
    /// `tracing` filter expression applied to stderr logging.
    #[serde(default = "default_log_filter_string")]
    pub log_filter: String,
    /// Output format for log records.
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,
    /// Overrides the version string reported by `VERSION` and the banner.
    ///
    /// The value is written verbatim, so embedded spaces must already be
    /// escaped for the wire.
    #[serde(default)]
    pub gahp_version: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: default_log_filter_string(),
            log_format: default_log_format(),
            gahp_version: None,
        }
    }
}

impl Config {
    /// Returns the log filter expression.
    #[must_use]
    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// Returns the configured log format.
    #[must_use]
    pub const fn log_format(&self) -> LogFormat {
        self.log_format
    }

    /// Returns the version override, if one was configured.
    #[must_use]
    pub fn gahp_version(&self) -> Option<&str> {
        self.gahp_version.as_deref()
    }
}
