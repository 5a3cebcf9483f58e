//! Configuration constants and utilities for hurlite
//!
//! Defaults for the transport and the environment lookups the binary
//! consults before command-line flags are applied.

use std::time::Duration;

/// Environment variable holding the log filter used when `--verbose` is off
pub const LOG_LEVEL_ENV_VAR: &str = "HURLITE_LOG_LEVEL";

/// Log filter used when neither `--verbose` nor the environment sets one
pub const DEFAULT_LOG_LEVEL: &str = "warn";

/// Connection timeout applied when `--connect-timeout` is not given
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(60);

/// `User-Agent` sent with every request unless the script sets one
pub fn user_agent() -> String {
    format!("hurlite/{}", env!("CARGO_PKG_VERSION"))
}

/// Get the log filter, checking the environment variable first, then falling back to default
pub fn get_log_level() -> String {
    std::env::var_os(LOG_LEVEL_ENV_VAR)
        .and_then(|val| val.into_string().ok())
        .filter(|val| !val.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
}
