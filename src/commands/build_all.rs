//! # Build-All Command Implementation
//!
//! Builds every model, and every schema no model mentions, and writes
//! instances and versioned files. `verify-build`
//! runs the same command in strict mode: it fails, without writing, as soon
//! as a build would change any file. That makes it suitable as a CI check
//! that committed output is current.

use std::path::Path;

use anyhow::Result;
use clap::Args;

use layercfg::output::{marker, Marker, OutputConfig};

use super::{open_manager, report};

/// Build every model and write versioned output
#[derive(Args, Debug)]
pub struct BuildAllArgs {
    /// Fail instead of writing when any output would change.
    #[arg(long)]
    pub strict: bool,
}

/// Execute the `build-all` (or `verify-build`) command.
pub fn execute(args: BuildAllArgs, root: &Path, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let action = if args.strict { "Verified" } else { "Built" };
    println!(
        "{} {} config sets under {}",
        marker(&out, Marker::Info),
        if args.strict { "Verifying" } else { "Building" },
        root.display()
    );

    let mut manager = open_manager(root)?;
    let results = manager.build_all(args.strict)?;
    report(&out, &results, action)
}
