//! # Init-Demo Command Implementation
//!
//! Writes a small config set with two schemas and two models that inherit
//! from each other, ready for `build-all`.

use std::path::Path;

use anyhow::Result;

use layercfg::output::{marker, Marker, OutputConfig};

use super::open_manager;

/// Execute the `init-demo` command.
pub fn execute(root: &Path, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let mut manager = open_manager(root)?;
    let set = manager.create_demo_config_set()?;

    println!(
        "{} Created demo config set at {}",
        marker(&out, Marker::Ok),
        set.path().display()
    );
    for id in set.schema_ids().iter().chain(set.model_ids().iter()) {
        println!("   {}", id);
    }
    println!("\nRun `layercfg build-all` to build it.");
    Ok(())
}
