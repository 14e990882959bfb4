//! # Create-Schema / Create-Model Command Implementation
//!
//! Writes `<configset>/<category>/<name>.json` holding only `$id` and
//! `$version`. Existing files are never overwritten.

use std::path::Path;

use anyhow::Result;
use clap::Args;

use layercfg::identifier::Category;
use layercfg::output::{marker, Marker, OutputConfig};

use super::open_manager;

/// Add an empty document to a config set
#[derive(Args, Debug)]
pub struct CreateResourceArgs {
    /// Config set that receives the document
    pub configset: String,

    /// Document name, used for the file name and the identifier
    pub name: String,
}

/// Execute `create-schema` or `create-model`, depending on `category`.
pub fn execute(args: CreateResourceArgs, category: Category, root: &Path, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let mut manager = open_manager(root)?;
    let id = match category {
        Category::Models => manager.create_model(&args.configset, &args.name)?,
        _ => manager.create_schema(&args.configset, &args.name)?,
    };
    println!("{} Created {}", marker(&out, Marker::Ok), id);
    Ok(())
}
