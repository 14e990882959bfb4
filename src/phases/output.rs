//! Output conversion: pretty-print staged documents
//!
//! Every file ends with a newline so rewritten files diff cleanly.

use super::Phase;
use crate::context::{Payload, PhaseKind, PipelineContext};
use crate::error::Result;

pub struct OutputConversionPhase;

/// Text written for `value`.
pub fn render(value: &serde_json::Value) -> Result<String> {
    Ok(format!("{}\n", serde_json::to_string_pretty(value)?))
}

impl Phase for OutputConversionPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::OutputConversion
    }

    fn execute(&self, ctx: &mut PipelineContext<'_>) -> Result<()> {
        let staged: Vec<_> = ctx
            .data
            .phase_entries(PhaseKind::Versioning)
            .filter_map(|(category, id, payload)| {
                payload.value().map(|v| (category, id.to_string(), v.clone()))
            })
            .collect();

        for (category, id, value) in staged {
            let text = render(&value)?;
            ctx.data
                .insert(PhaseKind::OutputConversion, category, &id, Payload::Output(text));
        }
        Ok(())
    }
}
