//! `envmatrix resolve` - Print the resolved environments

use super::{OutputFormat, Workspace};
use anyhow::{Context, Result};
use envmatrix::environment::EnvironmentIdentity;
use envmatrix::matrix::EnvironmentSpec;
use std::collections::BTreeSet;
use std::fmt::Write;

/// Renders the resolved environment set in the requested format
pub fn render(workspace: &Workspace, format: OutputFormat) -> Result<String> {
    let specs = workspace
        .config
        .resolve()
        .context("Failed to resolve the environment matrix")?;

    match format {
        OutputFormat::Text => Ok(render_text(&specs, &workspace.config.environment_type)),
        OutputFormat::Json => {
            serde_json::to_string_pretty(&specs).context("Failed to serialize environments")
        }
    }
}

fn render_text(specs: &BTreeSet<EnvironmentSpec>, backend: &str) -> String {
    let mut out = String::new();
    for spec in specs {
        let identity = EnvironmentIdentity::new(spec, backend);
        let _ = writeln!(out, "{}  {}  {spec}", identity.id(), identity.name());
    }
    let _ = write!(out, "{} environment(s)", specs.len());
    out
}
