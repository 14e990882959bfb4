//! # layercfg CLI
//!
//! This is the binary entry point for the `layercfg` command-line tool.
//!
//! Its primary responsibilities are:
//! - Parsing command-line arguments using `clap`.
//! - Executing the appropriate command based on the parsed arguments.
//! - Turning any remaining diagnostic or error into a non-zero exit code.
//!
//! The validation and build logic lives in the `layercfg` library crate; the
//! binary only wires it to the terminal.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
