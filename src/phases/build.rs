//! Build: flatten references
//!
//! ## Process
//!
//! 1. Merge every validated schema against the validated schemas.
//! 2. Merge every validated model against validated models and schemas,
//!    with the target model last. For each model store:
//!    - the model as authored, at `(build, models, id)`;
//!    - the merged copy with every reference stripped and its `$id` moved
//!      to the instances category, at `(build, instances, instance id)`.
//!
//! A reference that cannot be resolved fails only the entity that holds it.
//! Models pinned to a version (`set.models.name.N`) take part in merges but
//! are not built themselves.

use log::debug;
use serde_json::Value as JsonValue;

use super::Phase;
use crate::context::{ErrorKind, Payload, PhaseKind, PipelineContext, ValidationError};
use crate::error::{Error, Result};
use crate::identifier::{Category, ResourceId};
use crate::locate::find_value;
use crate::merge::{merge_entity, strip_references, MergeMode, Pool};

pub struct BuildPhase;

impl BuildPhase {
    fn build_schemas(ctx: &mut PipelineContext<'_>) -> Result<()> {
        let schemas = ctx.values(PhaseKind::Validation, Category::Schemas);
        let pool: Pool = schemas.iter().cloned().collect();

        for (id, schema) in &schemas {
            match merge_entity(schema, &pool, MergeMode::Schema) {
                Ok(built) => {
                    ctx.data
                        .insert(PhaseKind::Build, Category::Schemas, id, Payload::Built(built));
                }
                Err(e) => Self::report(ctx, id, schema, e)?,
            }
        }
        Ok(())
    }

    fn build_models(ctx: &mut PipelineContext<'_>) -> Result<()> {
        let mut models = ctx.values(PhaseKind::Validation, Category::Models);
        let mut pool: Pool = models.iter().cloned().collect();
        pool.extend(ctx.values(PhaseKind::Validation, Category::Schemas));

        let target = ctx.model_id.clone();
        models.sort_by_key(|(id, _)| *id == target);

        for (id, model) in &models {
            let resource = ResourceId::parse(id)?;
            if resource.version().is_some() {
                continue;
            }
            let Some(instance_id) = resource.to_instance() else {
                continue;
            };
            let instance_id = instance_id.to_string();

            match merge_entity(model, &pool, MergeMode::Model) {
                Ok(mut instance) => {
                    strip_references(&mut instance);
                    if let JsonValue::Object(map) = &mut instance {
                        map.insert("$id".to_string(), JsonValue::String(instance_id.clone()));
                    }
                    debug!("Built {} -> {}", id, instance_id);
                    ctx.data.insert(
                        PhaseKind::Build,
                        Category::Models,
                        id,
                        Payload::Built(model.clone()),
                    );
                    ctx.data.insert(
                        PhaseKind::Build,
                        Category::Instances,
                        &instance_id,
                        Payload::Built(instance),
                    );
                }
                Err(e) => Self::report(ctx, id, model, e)?,
            }
        }
        Ok(())
    }

    /// Turn a reference failure into a diagnostic. Other errors propagate.
    fn report(ctx: &mut PipelineContext<'_>, id: &str, entity: &JsonValue, error: Error) -> Result<()> {
        let (kind, message, offending) = match error {
            Error::CircularReference { id: target } => (
                ErrorKind::CircularReference,
                format!("[BUILD] Circular reference: {}", target),
                target,
            ),
            Error::UnresolvedReference { id: target } => (
                ErrorKind::UnresolvedReference,
                format!("[BUILD] Unresolved reference: {}", target),
                target,
            ),
            other => return Err(other),
        };

        let pretty = serde_json::to_string_pretty(entity)?;
        let path = ctx
            .config_sets
            .build_abs_file_path(id)
            .unwrap_or_else(|| ctx.source_path(id));
        let error = ValidationError::new(kind, path, message).at_opt(find_value(&pretty, &offending));
        ctx.push_error(error);
        Ok(())
    }
}

impl Phase for BuildPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Build
    }

    fn execute(&self, ctx: &mut PipelineContext<'_>) -> Result<()> {
        Self::build_schemas(ctx)?;
        Self::build_models(ctx)
    }
}
