//! Command-line interface for envmatrix
//!
//! - `resolve`: Print the environments the matrix expands to
//! - `setup`: Provision every environment
//! - `run`: Run a command in every environment
//! - `rm`: Remove every environment
//! - `completions`: Generate shell completions

pub mod completions;
pub mod environments;
pub mod resolve;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use envmatrix::infrastructure::{Config, init_logging};
use std::path::{Path, PathBuf};

/// CLI arguments for envmatrix
#[derive(Parser, Debug)]
#[command(name = "envmatrix")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file (default: envmatrix.yml in the current directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Log level, overridden by ENVMATRIX_LOG
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the resolved environments
    Resolve {
        /// Output format
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Create or repair every environment
    Setup {
        /// Environments provisioned concurrently (default: from configuration)
        #[arg(short = 'j', long)]
        parallel: Option<usize>,
    },

    /// Run a command in every environment
    Run {
        /// Command line, split like a POSIX shell would
        command: String,
        /// Kill the command after this many seconds
        #[arg(long)]
        timeout: Option<u64>,
        /// Do not fail on non-zero exit codes
        #[arg(long)]
        any_exit_code: bool,
        /// Environments provisioned concurrently (default: from configuration)
        #[arg(short = 'j', long)]
        parallel: Option<usize>,
    },

    /// Remove every environment
    Rm,

    /// Generate shell completions
    Completions {
        /// Shell type
        #[arg(value_enum)]
        shell: ShellArg,
        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum ShellArg {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

/// Build the CLI command for completion generation
pub fn build_cli() -> clap::Command {
    Args::command()
}

/// Loaded configuration and the directory relative paths resolve against
pub struct Workspace {
    pub config: Config,
    pub base_dir: PathBuf,
}

impl Workspace {
    fn load(explicit: Option<&Path>) -> Result<Self> {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => Config::discover(&cwd).with_context(|| {
                format!("No envmatrix configuration found in {}", cwd.display())
            })?,
        };

        let config = Config::load(&path)
            .with_context(|| format!("Invalid configuration: {}", path.display()))?;
        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or(cwd, Path::to_path_buf);

        Ok(Self { config, base_dir })
    }
}

/// Parse and execute CLI arguments
pub fn run() -> Result<()> {
    let args = Args::parse();
    let workspace = || -> Result<Workspace> {
        let workspace = Workspace::load(args.config.as_deref())?;
        init_logging(
            args.log_level
                .as_deref()
                .unwrap_or(&workspace.config.log_level),
        );
        Ok(workspace)
    };

    match args.command {
        Command::Resolve { format } => {
            println!("{}", resolve::render(&workspace()?, format)?);
        }
        Command::Setup { parallel } => {
            environments::setup(&workspace()?, parallel)?;
        }
        Command::Run {
            command,
            timeout,
            any_exit_code,
            parallel,
        } => {
            environments::run_everywhere(
                &workspace()?,
                &command,
                timeout,
                any_exit_code,
                parallel,
            )?;
        }
        Command::Rm => {
            environments::remove_all(&workspace()?)?;
        }
        Command::Completions { shell, output } => {
            use clap_complete::Shell;

            let shell_enum = match shell {
                ShellArg::Bash => Shell::Bash,
                ShellArg::Zsh => Shell::Zsh,
                ShellArg::Fish => Shell::Fish,
                ShellArg::PowerShell => Shell::PowerShell,
            };

            let completions = completions::generate_completions(shell_enum)?;
            if let Some(output_path) = output {
                completions::save_completions(&completions, &output_path)?;
            } else {
                println!("{completions}");
            }
        }
    }

    Ok(())
}
