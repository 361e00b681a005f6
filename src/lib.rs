//! # envmatrix - environment matrices for benchmarking and testing
//!
//! envmatrix expands a declarative matrix of interpreter versions and
//! dependency versions into a set of environment specifications, and
//! provisions one isolated environment per specification.
//!
//! ## Quick Start
//!
//! ```no_run
//! use envmatrix::prelude::*;
//! use std::path::Path;
//!
//! let config = Config::from_yaml_str(r#"
//! pythons: ["2.7", "3.4"]
//! matrix:
//!   six: ["1.4", null]
//! exclude:
//!   - python: "3.4"
//!     six: null
//! "#)?;
//!
//! for report in provision_all(config.environments(Path::new("."))?, 2) {
//!     println!("{}: {:?}", report.environment.name(), report.result);
//! }
//! # Ok::<(), envmatrix::Error>(())
//! ```
//!
//! ## Layout
//!
//! - [`matrix`]: matrix expansion and include/exclude rules
//! - [`environment`]: backends and the provisioning lifecycle
//! - [`executor`]: process execution inside environments
//! - [`infrastructure`]: configuration and logging

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod environment;
pub mod errors;
pub mod executor;
pub mod infrastructure;
pub mod matrix;

// Prelude module for common imports
pub mod prelude;

// Re-export commonly used types
pub use environment::{
    Backend, EnvironmentState, ProvisionReport, ProvisionedEnvironment, backend_for,
    provision_all,
};
pub use errors::{ConfigError, Error, ExecutionError, ProvisionError};
pub use executor::{CommandOutput, RunOptions};
pub use infrastructure::Config;
pub use matrix::{AmbientContext, EnvironmentMatrix, EnvironmentSpec, Requirement, resolve};

/// Version of the envmatrix crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
