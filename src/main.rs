//! Binary entry point for stencil.
//!
//! Parses the command line, initializes logging, and runs exactly one
//! render. Any failure prints a single diagnostic line to stderr and
//! exits non-zero; no partial output is promised once an error has been
//! detected.

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(missing_docs)]
// Allow print_stderr in main binary for CLI diagnostics
#![allow(clippy::print_stderr)]

use clap::Parser;
use std::process::ExitCode;
use stencil::cli::{Cli, run};
use stencil::logging;

fn try_main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);
    run(&cli)?;
    Ok(())
}

/// Main entry point.
fn main() -> ExitCode {
    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        },
    }
}
