//! # Workspace Settings
//!
//! An optional `.layercfg.yaml` at the workspace root tunes discovery and
//! validation:
//!
//! ```yaml
//! # directory names skipped while looking for config sets
//! exclude:
//!   - fixtures
//!   - vendor
//! # run the generic JSON-Schema check over schema documents
//! schema_check: true
//! ```
//!
//! A missing file yields [`Settings::default`]. A file that exists but cannot
//! be parsed is an error, so typos are not silently ignored.

use crate::error::{Error, Result};
use crate::filesystem::FileSystem;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// File name looked up at the workspace root.
pub const SETTINGS_FILE: &str = ".layercfg.yaml";

/// Directory names never searched for config sets.
pub const DEFAULT_EXCLUDES: &[&str] = &[
    "node_modules",
    "out",
    "build",
    "dist",
    ".git",
    ".cache",
    "coverage",
    "temp",
];

/// Settings read from `.layercfg.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Extra directory names skipped during config-set discovery.
    pub exclude: Vec<String>,
    /// Run the generic JSON-Schema check over schema documents.
    pub schema_check: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            exclude: Vec::new(),
            schema_check: true,
        }
    }
}

impl Settings {
    /// Whether a directory with this name is skipped during discovery.
    pub fn is_excluded(&self, dir_name: &str) -> bool {
        DEFAULT_EXCLUDES.contains(&dir_name) || self.exclude.iter().any(|e| e == dir_name)
    }
}

/// Parse settings from YAML text.
pub fn parse(yaml_content: &str) -> Result<Settings> {
    if yaml_content.trim().is_empty() {
        return Ok(Settings::default());
    }
    serde_yaml::from_str(yaml_content).map_err(|e| Error::ConfigParse {
        message: e.to_string(),
        hint: Some(format!(
            "{} accepts only `exclude` (list of directory names) and `schema_check` (bool)",
            SETTINGS_FILE
        )),
    })
}

/// Load `.layercfg.yaml` from `root`, falling back to defaults when absent.
pub fn load(fs: &dyn FileSystem, root: &Path) -> Result<Settings> {
    let path = root.join(SETTINGS_FILE);
    if !fs.exists(&path) {
        return Ok(Settings::default());
    }
    parse(&fs.read_to_string(&path)?)
}
