//! Problem resolution: summarize diagnostics per file
//!
//! Runs after verification whether or not errors were found. It only reads
//! the error list.

use std::collections::BTreeMap;
use std::path::PathBuf;

use log::{debug, info};

use super::Phase;
use crate::context::{PhaseKind, PipelineContext, ValidationError};
use crate::error::Result;

pub struct ProblemResolutionPhase;

/// Diagnostics grouped by file, files in path order.
pub fn group_by_file(errors: &[ValidationError]) -> BTreeMap<PathBuf, Vec<&ValidationError>> {
    let mut grouped: BTreeMap<PathBuf, Vec<&ValidationError>> = BTreeMap::new();
    for error in errors {
        grouped.entry(error.file_path.clone()).or_default().push(error);
    }
    grouped
}

impl Phase for ProblemResolutionPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::ProblemResolution
    }

    fn execute(&self, ctx: &mut PipelineContext<'_>) -> Result<()> {
        if !ctx.has_errors() {
            debug!("No problems found for {}", ctx.model_id);
            return Ok(());
        }

        let grouped = group_by_file(&ctx.errors);
        info!(
            "{}: {} problem(s) in {} file(s)",
            ctx.model_id,
            ctx.errors.len(),
            grouped.len()
        );
        for (path, errors) in &grouped {
            info!("  {} ({})", path.display(), errors.len());
            for error in errors {
                debug!("    {}:{}: {}", error.line, error.column, error.message);
            }
        }
        Ok(())
    }
}
