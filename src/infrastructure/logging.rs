//! Logging configuration
//!
//! Initializes tracing for the application.

use tracing_subscriber::{EnvFilter, fmt};

/// Environment variable overriding the configured log filter
pub const LOG_ENV_VAR: &str = "ENVMATRIX_LOG";

/// Builds the log filter: `ENVMATRIX_LOG` when set and valid, `level`
/// otherwise
#[must_use]
pub fn log_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initializes logging with the specified level.
///
/// Logs go to stderr so command output on stdout stays machine-readable.
/// Calling this more than once is harmless.
pub fn init_logging(level: &str) {
    let installed = fmt()
        .with_env_filter(log_filter(level))
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .try_init();

    if installed.is_err() {
        tracing::debug!("Logging already initialized");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_twice() {
        init_logging("debug");
        init_logging("info");
    }

    #[test]
    fn test_log_filter_falls_back_to_level() {
        if std::env::var_os(LOG_ENV_VAR).is_none() {
            assert_eq!(log_filter("warn").to_string(), "warn");
        }
    }
}
