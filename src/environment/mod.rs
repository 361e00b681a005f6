//! Environment provisioning
//!
//! An [`EnvironmentSpec`](crate::matrix::EnvironmentSpec) becomes a
//! [`ProvisionedEnvironment`] once bound to a [`Backend`]. The lifecycle
//! verifies the environment on disk and rebuilds it whenever it drifts.

mod backend;
mod batch;
mod conda;
mod identity;
mod lifecycle;
mod metadata;
mod virtualenv;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{
    Backend, BackendOptions, backend_for, find_in_dir, find_on_path, pip_requirement,
};
pub use batch::{ProvisionReport, provision_all};
pub use conda::CondaBackend;
pub use identity::EnvironmentIdentity;
pub use lifecycle::{
    Drift, EnvironmentState, ProvisionedEnvironment, interpreter_matches,
};
pub use metadata::{EnvironmentMetadata, METADATA_FILE};
pub use virtualenv::VirtualenvBackend;
