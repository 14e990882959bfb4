//! Orchestrator for a single model's pipeline
//!
//! A [`Pipeline`] is an ordered list of phases built once and run for every
//! model. Before each phase it checks, in order:
//!
//! 1. the context's cancellation token, returning [`Error::Cancelled`] when set;
//! 2. the gating rule, stopping quietly before a gating phase once the
//!    context holds an error.
//!
//! The caller keeps ownership of the context and reads its errors and
//! blackboard after the run.

use log::debug;

use super::Phase;
use crate::context::{PhaseKind, PipelineContext};
use crate::error::{Error, Result};

/// Ordered phases.
#[derive(Default)]
pub struct Pipeline {
    phases: Vec<Box<dyn Phase>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a phase.
    pub fn with_phase(mut self, phase: impl Phase + 'static) -> Self {
        self.register(Box::new(phase));
        self
    }

    /// Append an already boxed phase.
    pub fn register(&mut self, phase: Box<dyn Phase>) {
        self.phases.push(phase);
    }

    /// Kinds of the registered phases, in run order.
    pub fn kinds(&self) -> Vec<PhaseKind> {
        self.phases.iter().map(|p| p.kind()).collect()
    }

    /// Run every phase over `ctx` in registration order.
    pub fn execute(&self, ctx: &mut PipelineContext<'_>) -> Result<()> {
        for phase in &self.phases {
            let kind = phase.kind();

            if ctx.is_cancelled() {
                return Err(Error::Cancelled {
                    phase: kind.to_string(),
                });
            }

            if kind.is_gating() && ctx.has_errors() {
                debug!(
                    "Halting {} before {}: {} error(s) recorded",
                    ctx.model_id,
                    kind,
                    ctx.errors.len()
                );
                return Ok(());
            }

            debug!("Running {} for {}", kind, ctx.model_id);
            phase.execute(ctx)?;
        }
        Ok(())
    }
}
