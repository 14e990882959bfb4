//! # Validate-All Command Implementation
//!
//! Runs every model of every config set, and every schema no model
//! mentions, through ingestion, validation,
//! build and verification. Nothing is written, so this is safe to run at any
//! time.

use std::path::Path;

use anyhow::Result;

use layercfg::output::{marker, Marker, OutputConfig};

use super::{open_manager, report};

/// Execute the `validate-all` command.
pub fn execute(root: &Path, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    println!(
        "{} Validating config sets under {}",
        marker(&out, Marker::Info),
        root.display()
    );

    let manager = open_manager(root)?;
    let results = manager.validate_all()?;
    report(&out, &results, "Validated")
}
