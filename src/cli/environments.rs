//! `envmatrix setup`, `run` and `rm`

use super::Workspace;
use anyhow::{Context, Result, bail};
use envmatrix::environment::{ProvisionedEnvironment, provision_all};
use envmatrix::executor::RunOptions;
use std::time::Duration;

fn environments(workspace: &Workspace) -> Result<Vec<ProvisionedEnvironment>> {
    workspace
        .config
        .environments(&workspace.base_dir)
        .context("Failed to resolve the environment matrix")
}

/// Creates or repairs every environment
pub fn setup(workspace: &Workspace, parallel: Option<usize>) -> Result<()> {
    let reports = provision_all(
        environments(workspace)?,
        parallel.unwrap_or(workspace.config.parallel),
    );
    let mut failed = 0;
    for report in &reports {
        match &report.result {
            Ok(()) => println!(
                "ready   {} ({:.1}s)",
                report.environment.name(),
                report.duration.as_secs_f64()
            ),
            Err(e) => {
                failed += 1;
                println!("failed  {}: {e}", report.environment.name());
            }
        }
    }

    if failed > 0 {
        bail!("{failed} of {} environment(s) failed to build", reports.len());
    }
    Ok(())
}

/// Runs `command_line` in every environment, provisioning them first
pub fn run_everywhere(
    workspace: &Workspace,
    command_line: &str,
    timeout: Option<u64>,
    any_exit_code: bool,
    parallel: Option<usize>,
) -> Result<()> {
    let command = shell_words::split(command_line)
        .with_context(|| format!("Failed to parse command: {command_line}"))?;
    if command.is_empty() {
        bail!("Command must not be empty");
    }
    let environments = environments(workspace)?;

    let mut options = RunOptions::new().with_optional_timeout(timeout.map(Duration::from_secs));
    if any_exit_code {
        options = options.accept_any_return_code();
    }

    let reports = provision_all(environments, parallel.unwrap_or(workspace.config.parallel));
    let total = reports.len();
    let mut failed = 0;
    for report in reports {
        let name = report.environment.name().to_string();
        if let Err(e) = report.result {
            failed += 1;
            eprintln!("[{name}] skipped, environment unavailable: {e}");
            continue;
        }

        println!("[{name}] $ {command_line}");
        match report.environment.run(&command, &options) {
            Ok(output) => {
                print!("{}", output.stdout);
                eprint!("{}", output.stderr);
            }
            Err(e) => {
                failed += 1;
                print!("{}", e.stdout().unwrap_or_default());
                eprint!("{}", e.stderr().unwrap_or_default());
                eprintln!("[{name}] {e}");
            }
        }
    }

    if failed > 0 {
        bail!("Command failed in {failed} of {total} environment(s)");
    }
    Ok(())
}

/// Removes every environment of the current matrix
pub fn remove_all(workspace: &Workspace) -> Result<()> {
    for mut environment in environments(workspace)? {
        if !environment.path().exists() {
            continue;
        }
        environment
            .destroy()
            .with_context(|| format!("Failed to remove {}", environment.name()))?;
        println!("removed {}", environment.name());
    }
    Ok(())
}
