//! Environment backends
//!
//! A backend wraps one concrete environment manager. The provisioning
//! lifecycle only talks to this trait; it never spawns package managers
//! itself.

use super::conda::CondaBackend;
use super::metadata::EnvironmentMetadata;
use super::virtualenv::VirtualenvBackend;
use crate::errors::{ConfigError, ProvisionError};
use crate::executor::{RunOptions, run_process};
use crate::matrix::EnvironmentSpec;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Capability to materialize and inspect environments
#[allow(clippy::missing_errors_doc)]
pub trait Backend: Send + Sync + fmt::Debug {
    /// Backend name as used in configuration, e.g. `virtualenv`
    fn name(&self) -> &str;

    /// Creates an environment at `destination` with interpreter `python` and
    /// the dependencies of `spec`. An empty version means the installer
    /// default.
    ///
    /// `destination` may contain leftovers of an earlier attempt; backends
    /// overwrite them.
    fn build(
        &self,
        python: &str,
        spec: &EnvironmentSpec,
        destination: &Path,
    ) -> Result<EnvironmentMetadata, ProvisionError>;

    /// Removes the environment at `destination`
    fn destroy(&self, destination: &Path) -> Result<(), ProvisionError> {
        if destination.exists() {
            fs::remove_dir_all(destination)?;
        }
        Ok(())
    }

    /// Directory holding the environment's executables
    fn bin_dir(&self, destination: &Path) -> PathBuf {
        if cfg!(windows) {
            destination.join("Scripts")
        } else {
            destination.join("bin")
        }
    }

    /// Directories holding executables, in lookup order. Prepended to `PATH`
    /// when running commands inside the environment.
    fn executable_dirs(&self, destination: &Path) -> Vec<PathBuf> {
        vec![self.bin_dir(destination)]
    }

    /// Locates an executable inside the environment
    fn which(&self, destination: &Path, executable: &str) -> Option<PathBuf> {
        self.executable_dirs(destination)
            .iter()
            .find_map(|dir| find_in_dir(dir, executable))
    }

    /// Executables that must exist for the environment to be usable
    fn critical_executables(&self) -> &[&str] {
        &["python", "pip"]
    }
}

/// Settings shared by the concrete backends
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackendOptions {
    /// Timeout for each backend command (None = no timeout)
    pub command_timeout: Option<Duration>,
}

/// Returns the backend for a configured environment type
pub fn backend_for(name: &str, options: &BackendOptions) -> Result<Arc<dyn Backend>, ConfigError> {
    match name {
        "virtualenv" => Ok(Arc::new(VirtualenvBackend::new(options.clone()))),
        "conda" => Ok(Arc::new(CondaBackend::new(options.clone()))),
        other => Err(ConfigError::UnknownBackend(other.to_string())),
    }
}

/// Looks for `executable` in `dir`, trying the `.exe` suffix on Windows
#[must_use]
pub fn find_in_dir(dir: &Path, executable: &str) -> Option<PathBuf> {
    let candidate = dir.join(executable);
    if candidate.is_file() {
        return Some(candidate);
    }
    if cfg!(windows) {
        let candidate = dir.join(format!("{executable}.exe"));
        if candidate.is_file() {
            return Some(candidate);
        }
    }
    None
}

/// Looks for `executable` on `PATH`
#[must_use]
pub fn find_on_path(executable: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path).find_map(|dir| find_in_dir(&dir, executable))
}

/// Package argument for pip: `name==version`, or `name` for the default
#[must_use]
pub fn pip_requirement(name: &str, version: &str) -> String {
    if version.is_empty() {
        name.to_string()
    } else {
        format!("{name}=={version}")
    }
}

/// Installs every dependency of `spec` with the environment's pip, one
/// package per invocation
pub(crate) fn pip_install(
    backend: &dyn Backend,
    spec: &EnvironmentSpec,
    destination: &Path,
    options: &BackendOptions,
) -> Result<(), ProvisionError> {
    if spec.requirements.is_empty() {
        return Ok(());
    }

    let pip = backend
        .which(destination, "pip")
        .ok_or_else(|| ProvisionError::Build {
            name: destination.display().to_string(),
            reason: "pip not found in environment".to_string(),
        })?;

    let run_options = RunOptions::new().with_optional_timeout(options.command_timeout);
    for (name, version) in &spec.requirements {
        let requirement = pip_requirement(name, version);
        tracing::info!(package = %requirement, env = %destination.display(), "Installing");
        run_process(
            &pip,
            &["install".to_string(), requirement],
            &run_options,
        )?;
    }
    Ok(())
}

/// Script printing the interpreter's full `major.minor.micro` version
pub(crate) const VERSION_SCRIPT: &str =
    "import sys; sys.stdout.write('%d.%d.%d' % sys.version_info[:3])";

/// Asks the environment's interpreter for its full version
pub(crate) fn query_python_version(
    backend: &dyn Backend,
    destination: &Path,
    options: &BackendOptions,
) -> Result<String, ProvisionError> {
    let python = backend
        .which(destination, "python")
        .ok_or_else(|| ProvisionError::Build {
            name: destination.display().to_string(),
            reason: "python not found in environment".to_string(),
        })?;

    let output = run_process(
        &python,
        &["-c".to_string(), VERSION_SCRIPT.to_string()],
        &RunOptions::new().with_optional_timeout(options.command_timeout),
    )?;
    Ok(output.stdout.trim().to_string())
}
