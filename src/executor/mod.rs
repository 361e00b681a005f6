//! Command execution
//!
//! [`run_process`] is the single place where child processes are spawned;
//! [`runner::run`] layers environment activation on top of it.

mod process;
pub mod runner;

pub use process::{CommandOutput, RunOptions, ValidReturnCodes, render_command, run_process};
pub use runner::run;
