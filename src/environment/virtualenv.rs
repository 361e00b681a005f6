//! virtualenv backend

use super::backend::{Backend, BackendOptions, find_on_path, pip_install, query_python_version};
use super::metadata::EnvironmentMetadata;
use crate::errors::ProvisionError;
use crate::executor::{RunOptions, run_process};
use crate::matrix::EnvironmentSpec;
use std::path::Path;

/// Builds environments with `virtualenv` on top of a host interpreter
/// found on `PATH` as `python<version>`.
///
/// Falls back to the interpreter's own `venv` module when `virtualenv` is not
/// installed.
#[derive(Debug, Clone, Default)]
pub struct VirtualenvBackend {
    options: BackendOptions,
}

impl VirtualenvBackend {
    /// Creates the backend
    #[must_use]
    pub fn new(options: BackendOptions) -> Self {
        Self { options }
    }
}

impl Backend for VirtualenvBackend {
    fn name(&self) -> &str {
        "virtualenv"
    }

    fn build(
        &self,
        python: &str,
        spec: &EnvironmentSpec,
        destination: &Path,
    ) -> Result<EnvironmentMetadata, ProvisionError> {
        let interpreter = find_on_path(&format!("python{python}")).ok_or_else(|| {
            ProvisionError::InterpreterNotFound {
                version: python.to_string(),
                backend: self.name().to_string(),
            }
        })?;

        let destination_arg = destination.to_string_lossy().into_owned();
        let run_options = RunOptions::new().with_optional_timeout(self.options.command_timeout);

        match find_on_path("virtualenv") {
            Some(virtualenv) => {
                run_process(
                    &virtualenv,
                    &[
                        "-p".to_string(),
                        interpreter.to_string_lossy().into_owned(),
                        destination_arg,
                    ],
                    &run_options,
                )?;
            }
            None => {
                tracing::debug!("virtualenv not found, using the venv module");
                run_process(
                    &interpreter,
                    &[
                        "-m".to_string(),
                        "venv".to_string(),
                        "--clear".to_string(),
                        destination_arg,
                    ],
                    &run_options,
                )?;
            }
        }

        pip_install(self, spec, destination, &self.options)?;
        let obtained = query_python_version(self, destination, &self.options)?;

        Ok(EnvironmentMetadata::new(obtained, self.name(), spec))
    }
}
