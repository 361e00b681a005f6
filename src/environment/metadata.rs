//! Persisted environment metadata
//!
//! Every successfully built environment carries a JSON record describing what
//! was actually provisioned. Presence checks compare it with the requested
//! specification to detect drift.

use crate::errors::ProvisionError;
use crate::matrix::EnvironmentSpec;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// File name of the metadata record inside an environment directory
pub const METADATA_FILE: &str = "envmatrix-env.json";

/// Record of a built environment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentMetadata {
    /// Interpreter version actually present
    pub python: String,
    /// Backend that built the environment
    pub backend: String,
    /// Dependencies installed, name to requested version
    #[serde(default)]
    pub requirements: BTreeMap<String, String>,
    /// When the build finished
    pub created_at: DateTime<Utc>,
}

impl EnvironmentMetadata {
    /// Metadata for `spec` built by `backend` with the given interpreter
    #[must_use]
    pub fn new(python: impl Into<String>, backend: impl Into<String>, spec: &EnvironmentSpec) -> Self {
        Self {
            python: python.into(),
            backend: backend.into(),
            requirements: spec.requirements.clone(),
            created_at: Utc::now(),
        }
    }

    /// Location of the metadata file for an environment directory
    #[must_use]
    pub fn path(env_dir: &Path) -> PathBuf {
        env_dir.join(METADATA_FILE)
    }

    /// Loads metadata. Returns `Ok(None)` when the file does not exist.
    pub fn load(env_dir: &Path) -> Result<Option<Self>, ProvisionError> {
        let path = Self::path(env_dir);
        let contents = match fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(ProvisionError::Metadata {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                });
            }
        };

        serde_json::from_str(&contents)
            .map(Some)
            .map_err(|e| ProvisionError::Metadata {
                path: path.display().to_string(),
                reason: e.to_string(),
            })
    }

    /// Writes metadata, replacing any previous record
    pub fn save(&self, env_dir: &Path) -> Result<(), ProvisionError> {
        let path = Self::path(env_dir);
        let json = serde_json::to_string_pretty(self).map_err(|e| ProvisionError::Metadata {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        fs::write(&path, json).map_err(|e| ProvisionError::Metadata {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }
}
