use crate::logging::LogFormat;

/// Default log filter expression used by the server binary.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Default log filter expression used by the server binary.
#[must_use]
pub const fn default_log_filter() -> &'static str {
    DEFAULT_LOG_FILTER
}

/// Owned log filter value used where allocation is required (e.g. serde).
#[must_use]
pub fn default_log_filter_string() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

/// Default logging format for the server binary.
#[must_use]
pub const fn default_log_format() -> LogFormat {
    LogFormat::Json
}
