//! Versioning: decide which files each built document needs
//!
//! Every built document has an unversioned file, `category/name.json`, and
//! versioned copies, `category/name/name_N.json`. For each document this
//! phase finds the highest `N` on disk and compares the built content with
//! it, ignoring key order and the `$id`/`$version` stamps.
//!
//! | Highest N | Same content | Version N has uncommitted changes | Action |
//! |---|---|---|---|
//! | 0 | - | - | create version 1 |
//! | N | yes | - | nothing (or rewrite a missing unversioned file) |
//! | N | no | no | create version N+1 |
//! | N | no | yes | overwrite version N |
//!
//! When the unversioned file is missing but version N already holds the
//! built content, only the unversioned file is rewritten from it. No new
//! version is created and version N is left untouched.
//!
//! Decisions are staged on the blackboard for the output phases. In strict
//! mode any decision other than "nothing" fails the run before anything is
//! staged.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use regex::Regex;
use serde_json::Value as JsonValue;

use super::Phase;
use crate::context::{ErrorKind, Payload, PhaseKind, PipelineContext, ValidationError};
use crate::error::{Error, Result};
use crate::filesystem::FileSystem;
use crate::git::VersionControl;
use crate::identifier::{Category, ResourceId};
use crate::merge::json_equal;

/// What versioning does for one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VersionAction {
    /// The latest version already holds this content.
    Unchanged { version: u32 },
    /// The latest version holds this content but the unversioned file is gone.
    RestoreUnversioned { version: u32 },
    /// Write a new version.
    Create { version: u32 },
    /// Replace an uncommitted version in place.
    Overwrite { version: u32 },
}

impl VersionAction {
    pub fn version(&self) -> u32 {
        match *self {
            VersionAction::Unchanged { version }
            | VersionAction::RestoreUnversioned { version }
            | VersionAction::Create { version }
            | VersionAction::Overwrite { version } => version,
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, VersionAction::Unchanged { .. })
    }
}

impl fmt::Display for VersionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionAction::Unchanged { version } => write!(f, "unchanged at version {}", version),
            VersionAction::RestoreUnversioned { version } => {
                write!(f, "restore unversioned file from version {}", version)
            }
            VersionAction::Create { version } => write!(f, "create version {}", version),
            VersionAction::Overwrite { version } => write!(f, "overwrite version {}", version),
        }
    }
}

/// A decision for one built document.
#[derive(Debug, Clone)]
pub struct VersionDecision {
    pub category: Category,
    pub id: String,
    pub content: JsonValue,
    pub unversioned_path: PathBuf,
    pub action: VersionAction,
}

/// Copy of `content` with `$id` and `$version` set.
pub fn stamp(content: &JsonValue, id: &str, version: u32) -> JsonValue {
    let mut stamped = content.clone();
    if let JsonValue::Object(map) = &mut stamped {
        map.insert("$id".to_string(), JsonValue::String(id.to_string()));
        map.insert("$version".to_string(), JsonValue::from(version));
    }
    stamped
}

/// Highest `N` among `name_N.json` files directly inside `dir`, 0 when none.
///
/// Files that do not match the pattern are ignored, so gaps and stray files
/// do not matter.
pub fn highest_version(fs: &dyn FileSystem, dir: &Path, name: &str) -> Result<u32> {
    if !fs.is_dir(dir) {
        return Ok(0);
    }
    let pattern = Regex::new(&format!(r"^{}_(\d+)\.json$", regex::escape(name)))?;

    let highest = fs
        .list_dir(dir)?
        .iter()
        .filter_map(|path| path.file_name().map(|n| n.to_string_lossy().to_string()))
        .filter_map(|file| pattern.captures(&file)?.get(1)?.as_str().parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    Ok(highest)
}

/// Path of version `version` of the resource whose unversioned file is
/// `unversioned_path`.
pub fn versioned_path(unversioned_path: &Path, name: &str, version: u32) -> PathBuf {
    unversioned_path
        .with_file_name(name)
        .join(format!("{}_{}.json", name, version))
}

/// Decide what to write for `content`, built for `id`.
pub fn decide(
    fs: &dyn FileSystem,
    vcs: &dyn VersionControl,
    category: Category,
    id: &str,
    content: &JsonValue,
    unversioned_path: &Path,
) -> Result<VersionDecision> {
    let resource = ResourceId::parse(id)?;
    let name = resource.name();
    let dir = unversioned_path.with_file_name(name);
    let latest = highest_version(fs, &dir, name)?;

    let action = if latest == 0 {
        VersionAction::Create { version: 1 }
    } else {
        let latest_path = versioned_path(unversioned_path, name, latest);
        let on_disk = fs
            .read_to_string(&latest_path)
            .ok()
            .and_then(|text| serde_json::from_str::<JsonValue>(&text).ok());
        let candidate = stamp(content, &resource.with_version(latest).to_string(), latest);

        if on_disk.is_some_and(|existing| json_equal(&candidate, &existing)) {
            if fs.exists(unversioned_path) {
                VersionAction::Unchanged { version: latest }
            } else {
                VersionAction::RestoreUnversioned { version: latest }
            }
        } else if vcs.has_uncommitted_changes(&latest_path) {
            VersionAction::Overwrite { version: latest }
        } else {
            VersionAction::Create {
                version: latest + 1,
            }
        }
    };

    debug!("{}: {}", id, action);
    Ok(VersionDecision {
        category,
        id: id.to_string(),
        content: content.clone(),
        unversioned_path: unversioned_path.to_path_buf(),
        action,
    })
}

pub struct VersioningPhase {
    fs: Arc<dyn FileSystem>,
    vcs: Arc<dyn VersionControl>,
    strict: bool,
}

impl VersioningPhase {
    pub fn new(fs: Arc<dyn FileSystem>, vcs: Arc<dyn VersionControl>, strict: bool) -> Self {
        Self { fs, vcs, strict }
    }

    fn decisions(&self, ctx: &PipelineContext<'_>) -> Result<Vec<VersionDecision>> {
        let built: Vec<_> = ctx
            .data
            .phase_entries(PhaseKind::Build)
            .filter_map(|(category, id, payload)| {
                payload.value().map(|v| (category, id.to_string(), v.clone()))
            })
            .collect();

        let mut decisions = Vec::with_capacity(built.len());
        for (category, id, content) in built {
            if ResourceId::parse(&id)?.version().is_some() {
                continue;
            }
            let Some(path) = ctx.config_sets.build_abs_file_path(&id) else {
                warn!("No config set owns {}; not versioning it", id);
                continue;
            };
            decisions.push(decide(
                self.fs.as_ref(),
                self.vcs.as_ref(),
                category,
                &id,
                &content,
                &path,
            )?);
        }
        Ok(decisions)
    }

    fn stage(ctx: &mut PipelineContext<'_>, decision: &VersionDecision) -> Result<()> {
        let version = decision.action.version();
        if decision.action.is_noop() {
            debug!("{} is up to date at version {}", decision.id, version);
            return Ok(());
        }
        info!("{}: {}", decision.id, decision.action);

        if !matches!(decision.action, VersionAction::RestoreUnversioned { .. }) {
            let versioned_id = ResourceId::parse(&decision.id)?
                .with_version(version)
                .to_string();
            let versioned = stamp(&decision.content, &versioned_id, version);
            ctx.data.insert(
                PhaseKind::Versioning,
                decision.category,
                &versioned_id,
                Payload::Versioned(versioned),
            );
        }

        let unversioned = stamp(&decision.content, &decision.id, version);
        ctx.data.insert(
            PhaseKind::Versioning,
            decision.category,
            &decision.id,
            Payload::Versioned(unversioned),
        );
        Ok(())
    }
}

impl Phase for VersioningPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Versioning
    }

    fn execute(&self, ctx: &mut PipelineContext<'_>) -> Result<()> {
        let decisions = self.decisions(ctx)?;

        if self.strict {
            let changes: Vec<&VersionDecision> =
                decisions.iter().filter(|d| !d.action.is_noop()).collect();
            if let Some(first) = changes.first() {
                for change in &changes {
                    ctx.push_error(ValidationError::new(
                        ErrorKind::VersioningConflict,
                        &change.unversioned_path,
                        format!("Build output is out of date: {} would {}", change.id, change.action),
                    ));
                }
                return Err(Error::VersioningConflict {
                    id: first.id.clone(),
                    action: first.action.to_string(),
                });
            }
        }

        for decision in &decisions {
            Self::stage(ctx, decision)?;
        }
        Ok(())
    }
}
