//! Prelude module for common imports

pub use crate::environment::{
    Backend, BackendOptions, Drift, EnvironmentState, ProvisionReport, ProvisionedEnvironment,
    backend_for, provision_all,
};
pub use crate::errors::{ConfigError, Error, ExecutionError, ProvisionError};
pub use crate::executor::{CommandOutput, RunOptions, ValidReturnCodes};
pub use crate::infrastructure::{Config, init_logging};
pub use crate::matrix::{
    AmbientContext, EnvironmentMatrix, EnvironmentSpec, Requirement, Rule, Variant, resolve,
};
