//! # Create-Configset Command Implementation
//!
//! Creates `<root>/<name>/` with empty `schemas/`, `models/` and `instances/`
//! folders.

use std::path::Path;

use anyhow::Result;
use clap::Args;

use layercfg::output::{marker, Marker, OutputConfig};

use super::open_manager;

/// Create a new config set
#[derive(Args, Debug)]
pub struct CreateConfigsetArgs {
    /// Name of the config set (no dots or path separators)
    pub name: String,
}

/// Execute the `create-configset` command.
pub fn execute(args: CreateConfigsetArgs, root: &Path, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let mut manager = open_manager(root)?;
    let set = manager.create_config_set(&args.name)?;
    println!(
        "{} Created config set {} at {}",
        marker(&out, Marker::Ok),
        set.name(),
        set.path().display()
    );
    Ok(())
}
