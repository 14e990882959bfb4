//! Workspace build lock
//!
//! Versioning reads the highest version on disk, decides, then writes. Two
//! builds doing that at once over the same workspace could both pick the
//! same next version, so a build holds an exclusive advisory lock on
//! `<root>/.layercfg.lock` for its whole run.
//!
//! Acquisition never blocks: a second build fails with [`Error::LockHeld`].
//! The lock is released when the guard is dropped.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use log::debug;

use crate::error::{Error, Result};

/// Lock file name at the workspace root.
pub const LOCK_FILE: &str = ".layercfg.lock";

/// Guard holding the workspace build lock.
#[derive(Debug)]
pub struct BuildLock {
    path: PathBuf,
    file: Option<File>,
}

impl BuildLock {
    /// Take the lock for the workspace at `root`.
    pub fn acquire(root: &Path) -> Result<Self> {
        let path = root.join(LOCK_FILE);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        match file.try_lock_exclusive() {
            Ok(()) => {
                debug!("Acquired build lock {}", path.display());
                Ok(Self {
                    path,
                    file: Some(file),
                })
            }
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Err(Error::LockHeld { path }),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                Err(Error::LockHeld { path })
            }
            Err(e) => Err(Error::Io(e)),
        }
    }

    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock before the guard goes out of scope.
    pub fn release(&mut self) -> Result<()> {
        if let Some(file) = self.file.take() {
            file.unlock()?;
            debug!("Released build lock {}", self.path.display());
        }
        Ok(())
    }
}

impl Drop for BuildLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = file.unlock();
        }
    }
}
