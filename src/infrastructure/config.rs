//! Configuration management

use crate::environment::{BackendOptions, ProvisionedEnvironment, backend_for};
use crate::errors::ConfigError;
use crate::matrix::{AmbientContext, EnvironmentMatrix, EnvironmentSpec};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File names looked up by [`Config::discover`], in order
pub const CONFIG_FILE_NAMES: [&str; 3] = ["envmatrix.yml", "envmatrix.yaml", "envmatrix.json"];

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Backend used to build environments
    pub environment_type: String,
    /// Directory holding the environments
    pub env_dir: PathBuf,
    /// Interpreters, requirement matrix and include/exclude rules
    #[serde(flatten)]
    pub matrix: EnvironmentMatrix,
    /// Log level
    pub log_level: String,
    /// Environments provisioned concurrently
    pub parallel: usize,
    /// Timeout for each backend command in seconds (None = no timeout)
    pub install_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment_type: "virtualenv".to_string(),
            env_dir: PathBuf::from(".envmatrix/env"),
            matrix: EnvironmentMatrix::default(),
            log_level: "info".to_string(),
            parallel: 1,
            install_timeout_secs: Some(600),
        }
    }
}

impl Config {
    /// Loads a configuration file. Files ending in `.json` are parsed as
    /// JSON, everything else as YAML.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let is_json = path.extension().is_some_and(|ext| ext == "json");
        let config: Self = if is_json {
            serde_json::from_str(&contents).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?
        } else {
            serde_yaml::from_str(&contents).map_err(|e| ConfigError::Parse {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?
        };

        config.validate()?;
        tracing::debug!(path = %path.display(), pythons = ?config.matrix.pythons, "Loaded configuration");
        Ok(config)
    }

    /// Parses and validates a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| ConfigError::Parse {
            path: "<string>".to_string(),
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Finds the configuration file: first in `dir`, then in the user
    /// configuration directory (`~/.config/envmatrix/` on Linux).
    #[must_use]
    pub fn discover(dir: &Path) -> Option<PathBuf> {
        let user_dir = dirs::config_dir().map(|d| d.join("envmatrix"));
        std::iter::once(dir.to_path_buf())
            .chain(user_dir)
            .flat_map(|d| CONFIG_FILE_NAMES.iter().map(move |name| d.join(name)))
            .find(|candidate| candidate.is_file())
    }

    /// Checks settings that deserialization cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.matrix.pythons.is_empty() {
            return Err(ConfigError::NoPythons);
        }
        self.matrix.validate()?;
        backend_for(&self.environment_type, &self.backend_options())?;
        Ok(())
    }

    /// Ambient values for this configuration on the current host
    #[must_use]
    pub fn ambient(&self) -> AmbientContext {
        AmbientContext::current(self.environment_type.clone())
    }

    /// Resolves the environment matrix on the current host
    pub fn resolve(&self) -> Result<BTreeSet<EnvironmentSpec>, ConfigError> {
        self.matrix.resolve(&self.ambient())
    }

    /// Options passed to the backend
    #[must_use]
    pub fn backend_options(&self) -> BackendOptions {
        BackendOptions {
            command_timeout: self.install_timeout_secs.map(Duration::from_secs),
        }
    }

    /// Resolves the matrix and binds every specification to the configured
    /// backend. Relative `env_dir` values are taken relative to `base_dir`.
    pub fn environments(&self, base_dir: &Path) -> Result<Vec<ProvisionedEnvironment>, ConfigError> {
        let backend = backend_for(&self.environment_type, &self.backend_options())?;
        let env_root = base_dir.join(&self.env_dir);
        Ok(self
            .resolve()?
            .into_iter()
            .map(|spec| ProvisionedEnvironment::new(spec, backend.clone(), &env_root))
            .collect())
    }
}
