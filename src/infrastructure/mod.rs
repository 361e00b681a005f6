//! Infrastructure layer
//!
//! Configuration loading and logging setup.

mod config;
mod logging;

pub use config::{CONFIG_FILE_NAMES, Config};
pub use logging::{LOG_ENV_VAR, init_logging, log_filter};
