//! Child process execution with captured output
//!
//! Both the environment runner and the concrete backends spawn processes
//! through [`run_process`]. Output is captured on reader threads so that a
//! process killed on timeout still reports what it printed.

use crate::errors::ExecutionError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use wait_timeout::ChildExt;

/// How long to wait for reader threads after a killed process
const READER_GRACE: Duration = Duration::from_millis(200);

/// Exit codes treated as success
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidReturnCodes {
    /// Every exit code is accepted
    Any,
    /// Only the listed exit codes are accepted
    Only(Vec<i32>),
}

impl ValidReturnCodes {
    /// Returns true if `code` is accepted
    #[must_use]
    pub fn accepts(&self, code: i32) -> bool {
        match self {
            Self::Any => true,
            Self::Only(codes) => codes.contains(&code),
        }
    }
}

impl Default for ValidReturnCodes {
    fn default() -> Self {
        Self::Only(vec![0])
    }
}

/// Options for running a command
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    /// Exit codes treated as success (default: only zero)
    pub valid_return_codes: ValidReturnCodes,

    /// Kill the process after this long (None = no timeout)
    pub timeout: Option<Duration>,

    /// Working directory (None = inherit)
    pub cwd: Option<PathBuf>,

    /// Extra environment variables
    pub env: HashMap<String, String>,
}

impl RunOptions {
    /// Creates default options
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Sets an optional timeout
    #[must_use]
    pub fn with_optional_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Accepts the given exit codes instead of only zero
    #[must_use]
    pub fn with_valid_return_codes(mut self, codes: impl Into<Vec<i32>>) -> Self {
        self.valid_return_codes = ValidReturnCodes::Only(codes.into());
        self
    }

    /// Accepts every exit code
    #[must_use]
    pub fn accept_any_return_code(mut self) -> Self {
        self.valid_return_codes = ValidReturnCodes::Any;
        self
    }

    /// Sets the working directory
    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Adds an environment variable
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Result of a finished command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    /// Standard output
    pub stdout: String,

    /// Standard error
    pub stderr: String,

    /// Exit code, `-1` when terminated by a signal
    pub exit_code: i32,

    /// Duration of execution
    pub duration: Duration,
}

impl CommandOutput {
    /// Returns true if the command exited with zero
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Renders a command line for logs and error messages
#[must_use]
pub fn render_command(program: &Path, args: &[String]) -> String {
    let mut parts = Vec::with_capacity(args.len() + 1);
    parts.push(program.to_string_lossy().into_owned());
    parts.extend(args.iter().cloned());
    shell_words::join(parts)
}

/// Runs `program` with `args`, capturing output.
///
/// Fails with [`ExecutionError::ExitCode`] when the exit code is not accepted
/// and with [`ExecutionError::Timeout`] when the timeout elapses; in that case
/// the child is killed and the output captured so far is returned in the
/// error.
pub fn run_process(
    program: &Path,
    args: &[String],
    options: &RunOptions,
) -> Result<CommandOutput, ExecutionError> {
    let command_line = render_command(program, args);

    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.envs(&options.env);
    if let Some(cwd) = &options.cwd {
        cmd.current_dir(cwd);
    }
    cmd.stdin(Stdio::null());
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());

    tracing::debug!(command = %command_line, timeout = ?options.timeout, "Executing command");

    let start = Instant::now();
    let mut child = cmd.spawn().map_err(|e| ExecutionError::Spawn {
        command: command_line.clone(),
        reason: e.to_string(),
    })?;

    let stdout = OutputCollector::spawn(child.stdout.take());
    let stderr = OutputCollector::spawn(child.stderr.take());

    let status: ExitStatus = match options.timeout {
        None => child.wait().map_err(|e| ExecutionError::Spawn {
            command: command_line.clone(),
            reason: format!("failed to wait: {e}"),
        })?,
        Some(timeout) => {
            let waited = child.wait_timeout(timeout).map_err(|e| ExecutionError::Spawn {
                command: command_line.clone(),
                reason: format!("failed to wait: {e}"),
            })?;
            match waited {
                Some(status) => status,
                None => {
                    let _ = child.kill();
                    let _ = child.wait();
                    let deadline = Instant::now() + READER_GRACE;
                    let stdout = stdout.finish_within(deadline);
                    let stderr = stderr.finish_within(deadline);
                    tracing::warn!(
                        command = %command_line,
                        timeout_ms = timeout.as_millis(),
                        "Command timed out and was killed"
                    );
                    return Err(ExecutionError::Timeout {
                        command: command_line,
                        duration: timeout,
                        stdout,
                        stderr,
                    });
                }
            }
        }
    };

    // A background grandchild may hold the pipes open after the child exits
    let (stdout, stderr) = match options.timeout {
        Some(timeout) => {
            let deadline = (start + timeout).max(Instant::now() + READER_GRACE);
            (stdout.finish_within(deadline), stderr.finish_within(deadline))
        }
        None => (stdout.finish(), stderr.finish()),
    };
    let exit_code = status.code().unwrap_or(-1);
    let duration = start.elapsed();

    tracing::debug!(
        command = %command_line,
        exit_code,
        duration_ms = duration.as_millis(),
        "Command finished"
    );

    if !options.valid_return_codes.accepts(exit_code) {
        return Err(ExecutionError::ExitCode {
            command: command_line,
            code: exit_code,
            stdout,
            stderr,
        });
    }

    Ok(CommandOutput {
        stdout,
        stderr,
        exit_code,
        duration,
    })
}

/// Drains a pipe on a background thread into a shared buffer
struct OutputCollector {
    buffer: Arc<Mutex<Vec<u8>>>,
    handle: Option<JoinHandle<()>>,
}

impl OutputCollector {
    fn spawn<R: Read + Send + 'static>(pipe: Option<R>) -> Self {
        let buffer = Arc::new(Mutex::new(Vec::new()));
        let handle = pipe.map(|mut pipe| {
            let buffer = Arc::clone(&buffer);
            std::thread::spawn(move || {
                let mut chunk = [0u8; 8192];
                loop {
                    match pipe.read(&mut chunk) {
                        Ok(0) | Err(_) => break,
                        Ok(n) => buffer.lock().extend_from_slice(&chunk[..n]),
                    }
                }
            })
        });
        Self { buffer, handle }
    }

    /// Waits for the pipe to close and returns everything read
    fn finish(mut self) -> String {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.snapshot()
    }

    /// Like `finish`, but stops waiting at `deadline`.
    ///
    /// A grandchild of the process may keep the pipe open; the reader
    /// thread is then left detached.
    fn finish_within(mut self, deadline: Instant) -> String {
        if let Some(handle) = self.handle.take() {
            while !handle.is_finished() && Instant::now() < deadline {
                std::thread::sleep(Duration::from_millis(5));
            }
            if handle.is_finished() {
                let _ = handle.join();
            } else {
                tracing::debug!("Output pipe still open, detaching reader");
            }
        }
        self.snapshot()
    }

    fn snapshot(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }
}
