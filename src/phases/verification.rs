//! Verification: check built models and instances against their schemas
//!
//! The schemas a model is checked against are the schema identifiers among
//! its `$ref`/`$refs` targets. Both the model as authored and its flattened
//! instance are validated against each of them. A referenced schema that was
//! not built is skipped with a warning.

use log::{debug, warn};
use serde_json::Value as JsonValue;

use super::Phase;
use crate::context::{ErrorKind, PhaseKind, PipelineContext, ValidationError};
use crate::error::Result;
use crate::identifier::{is_schema_id, Category, ResourceId};
use crate::locate::find_field;
use crate::merge::collect_references;
use crate::schema::{validate_against, Violation};

pub struct VerificationPhase;

impl VerificationPhase {
    fn verify_model(ctx: &mut PipelineContext<'_>, id: &str, model: &JsonValue) -> Result<()> {
        let instance_id = ResourceId::parse(id)?.to_instance().map(|i| i.to_string());
        let instance = instance_id
            .as_deref()
            .and_then(|iid| ctx.value(PhaseKind::Build, Category::Instances, iid))
            .cloned();

        for schema_id in collect_references(model)
            .into_iter()
            .filter(|r| is_schema_id(r))
        {
            let Some(schema) = ctx
                .value(PhaseKind::Build, Category::Schemas, &schema_id)
                .cloned()
            else {
                warn!("Schema {} referenced by {} was not built; skipping", schema_id, id);
                continue;
            };

            debug!("Verifying {} against {}", id, schema_id);
            let mut violations = validate_against(&schema, model);
            if let Some(instance) = &instance {
                for violation in validate_against(&schema, instance) {
                    if !violations.contains(&violation) {
                        violations.push(violation);
                    }
                }
            }

            for violation in violations {
                let error = Self::diagnostic(ctx, id, &schema_id, &violation);
                ctx.push_error(error);
            }
        }
        Ok(())
    }

    fn diagnostic(ctx: &PipelineContext<'_>, id: &str, schema_id: &str, violation: &Violation) -> ValidationError {
        let detail = match &violation.missing_required {
            Some(field) => format!("Missing required field {}", field),
            None => violation.message.clone(),
        };
        let message = format!(
            "Validation failed against schema '{}' for field '{}': {}",
            schema_id, violation.field, detail
        );

        let leaf = violation.field.rsplit('.').next().unwrap_or_default();
        let span = ctx
            .raw(Category::Models, id)
            .and_then(|text| find_field(text, leaf));
        ValidationError::new(ErrorKind::SchemaValidation, ctx.source_path(id), message).at_opt(span)
    }
}

impl Phase for VerificationPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Verification
    }

    fn execute(&self, ctx: &mut PipelineContext<'_>) -> Result<()> {
        for (id, model) in ctx.values(PhaseKind::Build, Category::Models) {
            Self::verify_model(ctx, &id, &model)?;
        }
        Ok(())
    }
}
