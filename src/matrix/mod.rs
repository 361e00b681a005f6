//! Environment matrix resolution
//!
//! This module turns the declarative matrix from configuration into the set
//! of [`EnvironmentSpec`]s that must be provisioned.

mod requirement;
mod resolver;
mod rule;
mod spec;
mod version;

#[cfg(test)]
mod tests;

pub use requirement::{Requirement, Variant};
pub use resolver::{EnvironmentMatrix, IncludeRule, resolve};
pub use rule::{
    AmbientContext, AnchoredPattern, ENVIRONMENT_TYPE_KEY, Pattern, RawRule, Rule,
    SYS_PLATFORM_KEY, host_platform, is_synthetic_key,
};
pub use spec::{EnvironmentSpec, PYTHON_KEY};
