//! Serialization: write rendered documents
//!
//! Each document goes to the path its identifier maps to, creating parent
//! directories as needed. This is the only phase that writes.

use std::sync::Arc;

use log::{info, warn};

use super::Phase;
use crate::context::{PhaseKind, PipelineContext};
use crate::error::{Error, Result};
use crate::filesystem::FileSystem;

pub struct SerializationPhase {
    fs: Arc<dyn FileSystem>,
}

impl SerializationPhase {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }
}

impl Phase for SerializationPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Serialization
    }

    fn execute(&self, ctx: &mut PipelineContext<'_>) -> Result<()> {
        let rendered: Vec<_> = ctx
            .data
            .phase_entries(PhaseKind::OutputConversion)
            .filter_map(|(_, id, payload)| payload.text().map(|t| (id.to_string(), t.to_string())))
            .collect();

        for (id, text) in rendered {
            let Some(path) = ctx.config_sets.build_abs_file_path(&id) else {
                warn!("No config set owns {}; not writing it", id);
                continue;
            };

            if let Some(parent) = path.parent() {
                self.fs.create_dir_all(parent).map_err(|e| Error::Filesystem {
                    message: format!("Failed to create directory '{}': {}", parent.display(), e),
                })?;
            }
            self.fs.write(&path, &text).map_err(|e| Error::Filesystem {
                message: format!("Failed to write file '{}': {}", path.display(), e),
            })?;
            info!("Wrote {}", path.display());
        }
        Ok(())
    }
}
