//! Version-control capability
//!
//! Versioning only needs one answer from version control: does a file have
//! changes that are not committed yet? [`GitCli`] answers it by running the
//! system `git` binary, which picks up whatever configuration the user has.

use std::path::{Path, PathBuf};
use std::process::Command;

use log::{debug, warn};

use crate::error::Error;

/// Answers whether a file differs from the last commit.
pub trait VersionControl: Send + Sync {
    /// `true` when `path` has uncommitted changes (modified, staged or
    /// untracked). Files outside a repository and missing files are clean.
    fn has_uncommitted_changes(&self, path: &Path) -> bool;
}

/// [`VersionControl`] backed by the `git` command line.
#[derive(Debug, Clone, Copy, Default)]
pub struct GitCli;

impl GitCli {
    /// Run `git status --porcelain` for a single file inside `repo_root`.
    fn status_porcelain(repo_root: &Path, file: &Path) -> Result<String, Error> {
        let output = Command::new("git")
            .args(["status", "--porcelain", "--"])
            .arg(file)
            .current_dir(repo_root)
            .output()
            .map_err(|e| Error::GitCommand {
                command: "status --porcelain".to_string(),
                path: repo_root.to_path_buf(),
                stderr: e.to_string(),
            })?;

        if !output.status.success() {
            return Err(Error::GitCommand {
                command: "status --porcelain".to_string(),
                path: repo_root.to_path_buf(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl VersionControl for GitCli {
    fn has_uncommitted_changes(&self, path: &Path) -> bool {
        if !path.exists() {
            return false;
        }

        let Some(repo_root) = find_repo_root(path) else {
            debug!("{} is not inside a git repository", path.display());
            return false;
        };

        match Self::status_porcelain(&repo_root, path) {
            Ok(stdout) => !stdout.trim().is_empty(),
            Err(e) => {
                // Unknown status counts as dirty.
                warn!("{}", e);
                true
            }
        }
    }
}

/// Walk up from `path` to the nearest directory containing `.git`.
pub fn find_repo_root(path: &Path) -> Option<PathBuf> {
    let start = if path.is_dir() { path } else { path.parent()? };
    start
        .ancestors()
        .find(|dir| dir.join(".git").exists())
        .map(Path::to_path_buf)
}

/// Test double that reports a fixed set of files as dirty.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct FakeVersionControl {
    dirty: std::sync::Mutex<std::collections::HashSet<PathBuf>>,
}

#[cfg(test)]
impl FakeVersionControl {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn mark_dirty(&self, path: impl Into<PathBuf>) {
        self.dirty.lock().unwrap().insert(path.into());
    }

    pub(crate) fn commit_all(&self) {
        self.dirty.lock().unwrap().clear();
    }
}

#[cfg(test)]
impl VersionControl for FakeVersionControl {
    fn has_uncommitted_changes(&self, path: &Path) -> bool {
        self.dirty.lock().unwrap().contains(path)
    }
}
