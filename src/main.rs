//! envmatrix - provision and run interpreter/dependency environment matrices
//!
//! ## Commands
//!
//! - `envmatrix resolve` - Print the environments the matrix expands to
//! - `envmatrix setup` - Create or repair every environment
//! - `envmatrix run` - Run a command in every environment
//! - `envmatrix rm` - Remove every environment
//! - `envmatrix completions` - Generate shell completions
//!
//! ## Quick Start
//!
//! ```bash
//! # Inspect the matrix described by ./envmatrix.yml
//! envmatrix resolve --format json
//!
//! # Build four environments at a time, then run the test suite in each
//! envmatrix setup -j 4
//! envmatrix run "python -m pytest -x"
//!
//! # Generate shell completions
//! envmatrix completions bash > /etc/bash_completion.d/envmatrix
//! ```

use std::process::ExitCode;

mod cli;

fn main() -> ExitCode {
    match cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            if std::env::var_os("ENVMATRIX_VERBOSE").is_some() {
                eprintln!("{e:?}");
            }
            ExitCode::FAILURE
        }
    }
}
