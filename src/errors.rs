//! Error types for matrix resolution, provisioning and execution

use std::time::Duration;
use thiserror::Error;

/// Top-level error for envmatrix operations
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Configuration is malformed
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// An environment could not be provisioned
    #[error(transparent)]
    Provision(#[from] ProvisionError),

    /// A command inside an environment failed
    #[error(transparent)]
    Execution(#[from] ExecutionError),
}

/// User-facing configuration errors.
///
/// These abort a resolution pass immediately and are never retried.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// An include rule does not name an interpreter version
    #[error("include rule #{index} ({rule}) must specify a 'python' version")]
    IncludeMissingPython {
        /// Position of the rule in the include list.
        index: usize,
        /// Rendered rule, for locating it in the configuration.
        rule: String,
    },

    /// A rule pattern is not a valid regular expression
    #[error("invalid pattern '{pattern}' for key '{key}': {reason}")]
    InvalidPattern {
        /// Selector key the pattern belongs to.
        key: String,
        /// The offending pattern.
        pattern: String,
        /// Regex compiler message.
        reason: String,
    },

    /// A matrix dependency uses a name reserved for the interpreter or the
    /// ambient context
    #[error("'{key}' is reserved and cannot be used as a matrix dependency")]
    ReservedMatrixKey {
        /// The offending dependency name.
        key: String,
    },

    /// The configured environment type has no backend
    #[error("unknown environment type '{0}'")]
    UnknownBackend(String),

    /// No interpreter versions were configured
    #[error("at least one python version must be configured")]
    NoPythons,

    /// Configuration file could not be read
    #[error("failed to read configuration '{path}': {reason}")]
    Io {
        /// Path of the configuration file.
        path: String,
        /// Underlying I/O error.
        reason: String,
    },

    /// Configuration file could not be parsed
    #[error("failed to parse configuration '{path}': {reason}")]
    Parse {
        /// Path of the configuration file.
        path: String,
        /// Deserializer message.
        reason: String,
    },
}

/// Errors raised while building or verifying an environment
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProvisionError {
    /// The backend could not materialize the environment
    #[error("failed to build environment '{name}': {reason}")]
    Build {
        /// Human-readable environment name.
        name: String,
        /// What went wrong.
        reason: String,
    },

    /// Requested interpreter is not available to the backend
    #[error("python {version} not found for {backend}")]
    InterpreterNotFound {
        /// Requested interpreter version.
        version: String,
        /// Backend that looked for it.
        backend: String,
    },

    /// A backend command failed
    #[error("backend command failed: {0}")]
    Command(#[from] ExecutionError),

    /// Metadata file could not be written or parsed
    #[error("environment metadata error at '{path}': {reason}")]
    Metadata {
        /// Metadata file path.
        path: String,
        /// Underlying error.
        reason: String,
    },

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(String),
}

impl From<std::io::Error> for ProvisionError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

/// Errors raised while running a command
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExecutionError {
    /// Command exited with a code outside the accepted set
    #[error("command '{command}' failed with exit code {code}: {stderr}")]
    ExitCode {
        /// Rendered command line.
        command: String,
        /// Exit code, `-1` when terminated by a signal.
        code: i32,
        /// Captured standard output.
        stdout: String,
        /// Captured standard error.
        stderr: String,
    },

    /// Command did not finish in time and was killed
    #[error("command '{command}' timed out after {duration:?}")]
    Timeout {
        /// Rendered command line.
        command: String,
        /// Configured timeout.
        duration: Duration,
        /// Output captured before the process was killed.
        stdout: String,
        /// Error output captured before the process was killed.
        stderr: String,
    },

    /// Command could not be started
    #[error("failed to spawn '{command}': {reason}")]
    Spawn {
        /// Rendered command line.
        command: String,
        /// Underlying I/O error.
        reason: String,
    },

    /// Empty command line
    #[error("command must not be empty")]
    EmptyCommand,
}

impl ExecutionError {
    /// Standard output captured before the failure, if any
    #[must_use]
    pub fn stdout(&self) -> Option<&str> {
        match self {
            Self::ExitCode { stdout, .. } | Self::Timeout { stdout, .. } => Some(stdout),
            Self::Spawn { .. } | Self::EmptyCommand => None,
        }
    }

    /// Standard error captured before the failure, if any
    #[must_use]
    pub fn stderr(&self) -> Option<&str> {
        match self {
            Self::ExitCode { stderr, .. } | Self::Timeout { stderr, .. } => Some(stderr),
            Self::Spawn { .. } | Self::EmptyCommand => None,
        }
    }
}
