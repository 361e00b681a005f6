//! conda backend

use super::backend::{Backend, BackendOptions, find_on_path, pip_install, query_python_version};
use super::metadata::EnvironmentMetadata;
use crate::errors::ProvisionError;
use crate::executor::{RunOptions, run_process};
use crate::matrix::EnvironmentSpec;
use std::path::{Path, PathBuf};

/// Builds environments with `conda create`, which can fetch any interpreter
/// version on demand. Dependencies are installed with the environment's pip.
#[derive(Debug, Clone, Default)]
pub struct CondaBackend {
    options: BackendOptions,
}

impl CondaBackend {
    /// Creates the backend
    #[must_use]
    pub fn new(options: BackendOptions) -> Self {
        Self { options }
    }
}

/// Executable directories of a conda prefix. On Windows the interpreter
/// lives in the prefix root and entry points in `Scripts`.
fn prefix_dirs(destination: &Path, windows: bool) -> Vec<PathBuf> {
    if windows {
        vec![
            destination.to_path_buf(),
            destination.join("Library").join("bin"),
            destination.join("Scripts"),
        ]
    } else {
        vec![destination.join("bin")]
    }
}

impl Backend for CondaBackend {
    fn name(&self) -> &str {
        "conda"
    }

    fn executable_dirs(&self, destination: &Path) -> Vec<PathBuf> {
        prefix_dirs(destination, cfg!(windows))
    }

    fn build(
        &self,
        python: &str,
        spec: &EnvironmentSpec,
        destination: &Path,
    ) -> Result<EnvironmentMetadata, ProvisionError> {
        let conda = find_on_path("conda").ok_or_else(|| ProvisionError::Build {
            name: destination.display().to_string(),
            reason: "conda not found on PATH".to_string(),
        })?;

        let interpreter = if python.is_empty() {
            "python".to_string()
        } else {
            format!("python={python}")
        };

        run_process(
            &conda,
            &[
                "create".to_string(),
                "--yes".to_string(),
                "--quiet".to_string(),
                "-p".to_string(),
                destination.to_string_lossy().into_owned(),
                interpreter,
                "pip".to_string(),
            ],
            &RunOptions::new().with_optional_timeout(self.options.command_timeout),
        )?;

        pip_install(self, spec, destination, &self.options)?;
        let obtained = query_python_version(self, destination, &self.options)?;

        Ok(EnvironmentMetadata::new(obtained, self.name(), spec))
    }
}
