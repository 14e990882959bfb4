//! # Get-Configsets Command Implementation
//!
//! Lists every config set under a directory with how many schemas, models
//! and instances it holds.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Args;

use layercfg::output::{marker, Marker, OutputConfig};

use super::open_manager;

/// List config sets
#[derive(Args, Debug)]
pub struct GetConfigsetsArgs {
    /// Directory to search instead of the workspace root
    #[arg(value_name = "ROOT")]
    pub dir: Option<PathBuf>,
}

/// Execute the `get-configsets` command.
pub fn execute(args: GetConfigsetsArgs, root: &Path, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let root = args.dir.as_deref().unwrap_or(root);
    let manager = open_manager(root)?;

    let sets = manager.get_config_sets();
    if sets.is_empty() {
        println!(
            "{} No config sets found under {}",
            marker(&out, Marker::Warning),
            root.display()
        );
        return Ok(());
    }

    for set in sets {
        println!(
            "{}\t{}\t{} schemas, {} models, {} instances",
            set.name(),
            set.path().display(),
            set.schema_ids().len(),
            set.model_ids().len(),
            set.instance_ids().len()
        );
    }
    Ok(())
}
