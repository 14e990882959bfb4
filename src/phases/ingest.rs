//! Ingest: read the target document and everything it mentions
//!
//! ## Process
//!
//! 1. Read the target from the path its config set indexed it under. The
//!    target is a model, or a schema no model reaches.
//!    A missing or blank file ends the pipeline with an error.
//! 2. Scan the document for string values shaped like resource identifiers.
//!    Any string counts, not only `$ref`/`$refs` values.
//! 3. Read each identifier not loaded yet from the path it maps to and scan
//!    it the same way. An identifier that cannot be read, or whose file is
//!    blank, is reported against the document that mentions it.
//!
//! Every identifier is loaded at most once per run. Cycles are left to the
//! merge engine.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use log::{debug, warn};
use serde_json::Value as JsonValue;

use super::Phase;
use crate::context::{ErrorKind, Payload, PhaseKind, PipelineContext, ValidationError};
use crate::error::{Error, Result};
use crate::filesystem::FileSystem;
use crate::identifier::{category_of, looks_like_reference, Category};
use crate::locate::find_value;

/// Reads documents through the injected filesystem.
pub struct IngestPhase {
    fs: Arc<dyn FileSystem>,
}

impl IngestPhase {
    pub fn new(fs: Arc<dyn FileSystem>) -> Self {
        Self { fs }
    }

    fn read_target(&self, ctx: &PipelineContext<'_>) -> Result<(PathBuf, String)> {
        let path = ctx
            .config_set
            .file_path(&ctx.model_id)
            .map(PathBuf::from)
            .ok_or_else(|| Error::NotFound {
                path: ctx
                    .config_set
                    .build_abs_file_path(&ctx.model_id)
                    .unwrap_or_else(|| PathBuf::from(&ctx.model_id)),
            })?;

        let content = self.fs.read_to_string(&path)?;
        if is_blank(&content) {
            return Err(Error::EmptyFile { path });
        }
        Ok((path, content))
    }

    /// Load every reference found in `text` (the document `id`), depth first.
    fn load_references(
        &self,
        ctx: &mut PipelineContext<'_>,
        id: &str,
        text: &str,
        loaded: &mut HashSet<String>,
    ) {
        let document: JsonValue = match serde_json::from_str(text) {
            Ok(document) => document,
            Err(e) => {
                warn!("Skipping references of {}: not valid JSON ({})", id, e);
                return;
            }
        };

        for candidate in reference_candidates(&document) {
            if loaded.contains(&candidate) {
                continue;
            }

            match self.read_reference(ctx, &candidate) {
                Some((category, path, content)) => {
                    debug!("Loaded {} from {}", candidate, path.display());
                    loaded.insert(candidate.clone());
                    ctx.record_source(&candidate, &path);
                    ctx.data
                        .insert(PhaseKind::Ingest, category, &candidate, Payload::Raw(content.clone()));
                    self.load_references(ctx, &candidate, &content, loaded);
                }
                None => {
                    let error = ValidationError::new(
                        ErrorKind::UnresolvedReference,
                        ctx.source_path(id),
                        format!("Unable to resolve ref: {}", candidate),
                    )
                    .at_opt(find_value(text, &candidate));
                    ctx.push_error(error);
                }
            }
        }
    }

    fn read_reference(
        &self,
        ctx: &PipelineContext<'_>,
        id: &str,
    ) -> Option<(Category, PathBuf, String)> {
        let category = category_of(id)?;
        let path = ctx.config_sets.build_abs_file_path(id)?;
        match self.fs.read_to_string(&path) {
            Ok(content) if is_blank(&content) => {
                debug!("Ignoring blank {} for {}", path.display(), id);
                None
            }
            Ok(content) => Some((category, path, content)),
            Err(e) => {
                debug!("Cannot read {} for {}: {}", path.display(), id, e);
                None
            }
        }
    }
}

impl Phase for IngestPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Ingest
    }

    fn execute(&self, ctx: &mut PipelineContext<'_>) -> Result<()> {
        let model_id = ctx.model_id.clone();
        let (path, content) = self.read_target(ctx)?;

        ctx.record_source(&model_id, &path);
        ctx.data.insert(
            PhaseKind::Ingest,
            category_of(&model_id).unwrap_or(Category::Models),
            &model_id,
            Payload::Raw(content.clone()),
        );

        let mut loaded = HashSet::from([model_id.clone()]);
        self.load_references(ctx, &model_id, &content, &mut loaded);
        debug!("Ingested {} document(s) for {}", loaded.len(), model_id);
        Ok(())
    }
}

fn is_blank(content: &str) -> bool {
    let trimmed = content.trim();
    trimmed.is_empty() || trimmed == "\"\""
}

/// Identifier-shaped strings in `document`, in document order, once each.
pub fn reference_candidates(document: &JsonValue) -> Vec<String> {
    fn walk(value: &JsonValue, out: &mut Vec<String>) {
        match value {
            JsonValue::String(s) => {
                if looks_like_reference(s) && !out.contains(s) {
                    out.push(s.clone());
                }
            }
            JsonValue::Array(items) => items.iter().for_each(|item| walk(item, out)),
            JsonValue::Object(map) => map.values().for_each(|v| walk(v, out)),
            _ => {}
        }
    }

    let mut out = Vec::new();
    walk(document, &mut out);
    out
}
