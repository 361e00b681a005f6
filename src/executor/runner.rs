//! Running commands inside a provisioned environment

use super::process::{CommandOutput, RunOptions, run_process};
use crate::environment::{Backend, ProvisionedEnvironment};
use crate::errors::ExecutionError;
use std::ffi::OsString;
use std::path::PathBuf;

/// Runs `command` inside `environment`.
///
/// The environment's executable directories are prepended to `PATH` and
/// `command[0]` is looked up there first, falling back to the bare name.
/// The environment is used as-is; call
/// [`create`](ProvisionedEnvironment::create) beforehand to make sure it is
/// ready.
pub fn run(
    environment: &ProvisionedEnvironment,
    command: &[String],
    options: &RunOptions,
) -> Result<CommandOutput, ExecutionError> {
    let (program, args) = command.split_first().ok_or(ExecutionError::EmptyCommand)?;

    let backend = environment.backend();
    let exe_dirs = backend.executable_dirs(environment.path());
    let executable = backend
        .which(environment.path(), program)
        .unwrap_or_else(|| PathBuf::from(program));

    let mut options = options.clone();
    let path = prepend_path(&exe_dirs, options.env.get("PATH").map(OsString::from))?;
    options
        .env
        .insert("PATH".to_string(), path.to_string_lossy().into_owned());
    options.env.insert(
        "VIRTUAL_ENV".to_string(),
        environment.path().to_string_lossy().into_owned(),
    );

    tracing::info!(env = %environment.name(), command = ?command, "Running in environment");
    run_process(&executable, args, &options)
}

fn prepend_path(exe_dirs: &[PathBuf], base: Option<OsString>) -> Result<OsString, ExecutionError> {
    let base = base.or_else(|| std::env::var_os("PATH")).unwrap_or_default();
    let dirs = exe_dirs.iter().cloned().chain(std::env::split_paths(&base));
    std::env::join_paths(dirs).map_err(|e| ExecutionError::Spawn {
        command: "PATH".to_string(),
        reason: format!("invalid PATH: {e}"),
    })
}
