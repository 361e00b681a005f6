//! Provisioning lifecycle of a single environment
//!
//! ```text
//!            create                 build ok
//!  Absent ──────────► Building ─────────────► Ready
//!    ▲                   │  ▲                  │
//!    │    build failed   │  │ drift            │ create / check_presence
//!    └───────────────────┘  └──── Verifying ◄──┘
//!                                   │  pass
//!                                   └────────► Ready
//! ```
//!
//! Every `create` call verifies what is on disk; a drifted environment is
//! destroyed and rebuilt from scratch so that it always converges to its
//! specification.

use super::backend::Backend;
use super::identity::EnvironmentIdentity;
use super::metadata::EnvironmentMetadata;
use crate::errors::{ExecutionError, ProvisionError};
use crate::executor::{CommandOutput, RunOptions, runner};
use crate::matrix::EnvironmentSpec;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

/// Lifecycle state of a provisioned environment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EnvironmentState {
    /// Nothing usable on disk
    Absent,
    /// The backend is materializing the environment
    Building,
    /// Built and verified against its specification
    Ready,
    /// Comparing on-disk state with the specification
    Verifying,
}

impl fmt::Display for EnvironmentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "absent"),
            Self::Building => write!(f, "building"),
            Self::Ready => write!(f, "ready"),
            Self::Verifying => write!(f, "verifying"),
        }
    }
}

/// Why an environment on disk no longer matches its specification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Drift {
    /// No environment directory
    NotBuilt,
    /// Directory exists but has no metadata record
    MissingMetadata,
    /// Metadata record cannot be read
    UnreadableMetadata(String),
    /// Interpreter differs from the requested version
    InterpreterMismatch {
        /// Requested version
        expected: String,
        /// Version recorded on disk
        found: String,
    },
    /// Built by a different backend
    BackendMismatch {
        /// Configured backend
        expected: String,
        /// Backend recorded on disk
        found: String,
    },
    /// Installed dependencies differ from the specification
    RequirementsMismatch,
    /// A critical executable is missing
    MissingExecutable(String),
}

impl fmt::Display for Drift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotBuilt => write!(f, "environment not built"),
            Self::MissingMetadata => write!(f, "metadata file missing"),
            Self::UnreadableMetadata(reason) => write!(f, "metadata unreadable: {reason}"),
            Self::InterpreterMismatch { expected, found } => {
                write!(f, "python {found} installed, {expected} requested")
            }
            Self::BackendMismatch { expected, found } => {
                write!(f, "built by {found}, {expected} configured")
            }
            Self::RequirementsMismatch => write!(f, "installed requirements differ"),
            Self::MissingExecutable(name) => write!(f, "'{name}' is missing"),
        }
    }
}

/// True if the interpreter `found` satisfies the requested version.
///
/// Backends record the full `major.minor.micro` version, so `3.4.10`
/// satisfies `3.4.10`, `3.4` and `3`, but not `3.4.1`. An empty request
/// accepts any interpreter.
#[must_use]
pub fn interpreter_matches(requested: &str, found: &str) -> bool {
    requested.is_empty()
        || found == requested
        || found
            .strip_prefix(requested)
            .is_some_and(|rest| rest.starts_with('.'))
}

/// An environment bound to one specification and one backend
#[derive(Debug, Clone)]
pub struct ProvisionedEnvironment {
    spec: EnvironmentSpec,
    backend: Arc<dyn Backend>,
    identity: EnvironmentIdentity,
    path: PathBuf,
    state: EnvironmentState,
}

impl ProvisionedEnvironment {
    /// Binds `spec` to `backend`, located under `env_root`.
    ///
    /// Nothing is touched on disk until [`create`](Self::create).
    #[must_use]
    pub fn new(spec: EnvironmentSpec, backend: Arc<dyn Backend>, env_root: &Path) -> Self {
        let identity = EnvironmentIdentity::new(&spec, backend.name());
        let path = env_root.join(identity.id());
        Self {
            spec,
            backend,
            identity,
            path,
            state: EnvironmentState::Absent,
        }
    }

    /// The specification this environment provides
    #[must_use]
    pub fn spec(&self) -> &EnvironmentSpec {
        &self.spec
    }

    /// Identity derived from specification and backend
    #[must_use]
    pub fn identity(&self) -> &EnvironmentIdentity {
        &self.identity
    }

    /// Human-readable name
    #[must_use]
    pub fn name(&self) -> &str {
        self.identity.name()
    }

    /// Environment directory
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current lifecycle state
    #[must_use]
    pub fn state(&self) -> EnvironmentState {
        self.state
    }

    /// Backend managing this environment
    #[must_use]
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }

    /// Verifies the environment on disk.
    ///
    /// Returns `None` and moves to `Ready` when it matches the
    /// specification; otherwise returns the drift and moves to `Absent`.
    pub fn check_presence(&mut self) -> Option<Drift> {
        self.transition(EnvironmentState::Verifying);
        let drift = self.detect_drift();
        match &drift {
            None => self.transition(EnvironmentState::Ready),
            Some(reason) => {
                tracing::info!(env = %self.name(), drift = %reason, "Environment drifted");
                self.transition(EnvironmentState::Absent);
            }
        }
        drift
    }

    /// Ensures the environment exists and matches its specification,
    /// building or rebuilding it as needed.
    pub fn create(&mut self) -> Result<(), ProvisionError> {
        if self.check_presence().is_none() {
            tracing::debug!(env = %self.name(), "Environment present");
            return Ok(());
        }
        self.build()
    }

    /// Removes the environment from disk
    pub fn destroy(&mut self) -> Result<(), ProvisionError> {
        tracing::info!(env = %self.name(), path = %self.path.display(), "Removing environment");
        self.backend.destroy(&self.path)?;
        self.transition(EnvironmentState::Absent);
        Ok(())
    }

    /// Runs a command inside the environment, see [`runner::run`]
    pub fn run(
        &self,
        command: &[String],
        options: &RunOptions,
    ) -> Result<CommandOutput, ExecutionError> {
        runner::run(self, command, options)
    }

    fn build(&mut self) -> Result<(), ProvisionError> {
        self.transition(EnvironmentState::Building);
        let start = Instant::now();
        tracing::info!(
            env = %self.name(),
            python = %self.spec.python,
            requirements = self.spec.requirements.len(),
            "Building environment"
        );

        match self.try_build() {
            Ok(()) => {
                tracing::info!(
                    env = %self.name(),
                    duration_ms = start.elapsed().as_millis(),
                    "Environment ready"
                );
                self.transition(EnvironmentState::Ready);
                Ok(())
            }
            Err(e) => {
                tracing::error!(env = %self.name(), error = %e, "Environment build failed");
                if let Err(cleanup) = self.backend.destroy(&self.path) {
                    tracing::warn!(env = %self.name(), error = %cleanup, "Cleanup failed");
                }
                self.transition(EnvironmentState::Absent);
                Err(e)
            }
        }
    }

    fn try_build(&self) -> Result<(), ProvisionError> {
        self.backend.destroy(&self.path)?;
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let metadata = self
            .backend
            .build(&self.spec.python, &self.spec, &self.path)?;
        fs::create_dir_all(&self.path)?;
        metadata.save(&self.path)?;

        // A fresh build that already looks drifted would be rebuilt forever.
        if let Some(drift) = self.detect_drift() {
            return Err(ProvisionError::Build {
                name: self.name().to_string(),
                reason: format!("environment does not match its specification after build: {drift}"),
            });
        }
        Ok(())
    }

    fn detect_drift(&self) -> Option<Drift> {
        if !self.path.is_dir() {
            return Some(Drift::NotBuilt);
        }

        let metadata = match EnvironmentMetadata::load(&self.path) {
            Ok(Some(metadata)) => metadata,
            Ok(None) => return Some(Drift::MissingMetadata),
            Err(e) => return Some(Drift::UnreadableMetadata(e.to_string())),
        };

        if !interpreter_matches(&self.spec.python, &metadata.python) {
            return Some(Drift::InterpreterMismatch {
                expected: self.spec.python.clone(),
                found: metadata.python,
            });
        }
        if metadata.backend != self.backend.name() {
            return Some(Drift::BackendMismatch {
                expected: self.backend.name().to_string(),
                found: metadata.backend,
            });
        }
        if metadata.requirements != self.spec.requirements {
            return Some(Drift::RequirementsMismatch);
        }

        self.backend
            .critical_executables()
            .iter()
            .find(|exe| self.backend.which(&self.path, exe).is_none())
            .map(|exe| Drift::MissingExecutable((*exe).to_string()))
    }

    fn transition(&mut self, next: EnvironmentState) {
        if self.state != next {
            tracing::trace!(env = %self.name(), from = %self.state, to = %next, "State transition");
            self.state = next;
        }
    }
}
