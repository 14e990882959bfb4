//! Filesystem capability used by the pipeline
//!
//! The core never touches `std::fs` directly. Every read and write goes
//! through the [`FileSystem`] trait so that the CLI can work against the
//! real disk while tests run against [`MemoryFileSystem`].

use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::RwLock;

/// Operations the pipeline needs from a filesystem.
pub trait FileSystem: Send + Sync {
    /// Read a whole file as UTF-8 text.
    fn read_to_string(&self, path: &Path) -> Result<String>;

    /// Create or replace a file with `contents`.
    fn write(&self, path: &Path, contents: &str) -> Result<()>;

    /// Whether a file or directory exists at `path`.
    fn exists(&self, path: &Path) -> bool;

    /// Whether `path` is a directory.
    fn is_dir(&self, path: &Path) -> bool;

    /// Immediate children of a directory, sorted by path.
    fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>>;

    /// Create a directory and all missing parents.
    fn create_dir_all(&self, path: &Path) -> Result<()>;
}

/// Join a relative path onto a root.
pub fn join(root: &Path, relative: impl AsRef<Path>) -> PathBuf {
    root.join(relative)
}

/// Join a relative path onto a root after dropping every `..` and root
/// component, so the result can never point outside `root`.
pub fn join_contained(root: &Path, relative: impl AsRef<Path>) -> PathBuf {
    let mut joined = root.to_path_buf();
    for component in relative.as_ref().components() {
        if let Component::Normal(part) = component {
            joined.push(part);
        }
    }
    joined
}

/// [`FileSystem`] backed by the real disk.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiskFileSystem;

impl FileSystem for DiskFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        if !path.exists() {
            return Err(Error::NotFound {
                path: path.to_path_buf(),
            });
        }
        Ok(fs::read_to_string(path)?)
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        fs::write(path, contents)?;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let mut entries = fs::read_dir(path)?
            .map(|entry| entry.map(|e| e.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        entries.sort();
        Ok(entries)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path)?;
        Ok(())
    }
}

/// In-memory [`FileSystem`] for tests and dry runs
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
    /// Files stored as path -> content mapping
    files: RwLock<BTreeMap<PathBuf, String>>,
    /// Directories created explicitly
    dirs: RwLock<BTreeSet<PathBuf>>,
}

impl MemoryFileSystem {
    /// Create a new empty filesystem
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a file with string content, creating its parent directories
    pub fn add_file(&self, path: impl AsRef<Path>, content: &str) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            self.create_dir_all(parent)?;
        }
        self.write(path, content)
    }

    /// Get the content of a file, if present
    pub fn get_file(&self, path: impl AsRef<Path>) -> Option<String> {
        self.files.read().ok()?.get(path.as_ref()).cloned()
    }

    /// List all files
    pub fn list_files(&self) -> Vec<PathBuf> {
        self.files
            .read()
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Get the number of files
    pub fn len(&self) -> usize {
        self.files.read().map(|f| f.len()).unwrap_or(0)
    }

    /// Check if filesystem is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> Error {
        Error::Filesystem {
            message: "in-memory filesystem lock poisoned".to_string(),
        }
    }
}

impl FileSystem for MemoryFileSystem {
    fn read_to_string(&self, path: &Path) -> Result<String> {
        self.get_file(path).ok_or_else(|| Error::NotFound {
            path: path.to_path_buf(),
        })
    }

    fn write(&self, path: &Path, contents: &str) -> Result<()> {
        let mut files = self.files.write().map_err(|_| Self::poisoned())?;
        files.insert(path.to_path_buf(), contents.to_string());
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.get_file(path).is_some() || self.is_dir(path)
    }

    fn is_dir(&self, path: &Path) -> bool {
        let explicit = self
            .dirs
            .read()
            .map(|dirs| dirs.contains(path))
            .unwrap_or(false);
        explicit
            || self
                .list_files()
                .iter()
                .any(|file| file != path && file.starts_with(path))
    }

    fn list_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        if !self.is_dir(path) {
            return Err(Error::NotFound {
                path: path.to_path_buf(),
            });
        }

        let dirs = self.dirs.read().map_err(|_| Self::poisoned())?;
        let mut children = BTreeSet::new();
        for candidate in self.list_files().iter().chain(dirs.iter()) {
            if let Ok(rest) = candidate.strip_prefix(path) {
                if let Some(first) = rest.components().next() {
                    children.insert(path.join(first));
                }
            }
        }
        Ok(children.into_iter().collect())
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        let mut dirs = self.dirs.write().map_err(|_| Self::poisoned())?;
        for ancestor in path.ancestors() {
            if ancestor.as_os_str().is_empty() {
                break;
            }
            dirs.insert(ancestor.to_path_buf());
        }
        Ok(())
    }
}
