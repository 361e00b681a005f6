//! In-process backend for tests
//!
//! Builds environments as plain directories with executable shell stubs,
//! so the lifecycle can be exercised without any Python installed.

use super::backend::{Backend, pip_requirement};
use super::metadata::EnvironmentMetadata;
use crate::errors::ProvisionError;
use crate::matrix::EnvironmentSpec;
use std::fs;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};

const INSTALLED_FILE: &str = "installed.txt";

#[derive(Debug, Default)]
pub(crate) struct FakeBackend {
    builds: AtomicUsize,
    fail_for: Option<String>,
    reported_python: Option<String>,
}

impl FakeBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Builds for `python` fail after leaving a half-built directory
    pub(crate) fn failing_for(mut self, python: &str) -> Self {
        self.fail_for = Some(python.to_string());
        self
    }

    /// Record `python` as the interpreter regardless of the request
    pub(crate) fn reporting_python(mut self, python: &str) -> Self {
        self.reported_python = Some(python.to_string());
        self
    }

    pub(crate) fn build_count(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Packages installed in the environment at `destination`
    pub(crate) fn installed(&self, destination: &Path) -> Vec<String> {
        fs::read_to_string(destination.join(INSTALLED_FILE))
            .map(|contents| contents.lines().map(str::to_string).collect())
            .unwrap_or_default()
    }
}

impl Backend for FakeBackend {
    fn name(&self) -> &str {
        "fake"
    }

    fn build(
        &self,
        python: &str,
        spec: &EnvironmentSpec,
        destination: &Path,
    ) -> Result<EnvironmentMetadata, ProvisionError> {
        self.builds.fetch_add(1, Ordering::SeqCst);

        let bin = self.bin_dir(destination);
        fs::create_dir_all(&bin)?;

        if self.fail_for.as_deref() == Some(python) {
            return Err(ProvisionError::Build {
                name: destination.display().to_string(),
                reason: format!("no interpreter for python {python}"),
            });
        }

        for exe in self.critical_executables() {
            write_stub(&bin.join(exe))?;
        }

        let installed: Vec<String> = spec
            .requirements
            .iter()
            .map(|(name, version)| pip_requirement(name, version))
            .collect();
        fs::write(destination.join(INSTALLED_FILE), installed.join("\n"))?;

        let python = self.reported_python.as_deref().unwrap_or(python);
        Ok(EnvironmentMetadata::new(python, self.name(), spec))
    }
}

fn write_stub(path: &Path) -> Result<(), ProvisionError> {
    fs::write(path, "#!/bin/sh\necho \"$0 $*\"\n")?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o755))?;
    }
    Ok(())
}
