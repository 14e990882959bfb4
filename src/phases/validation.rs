//! Validation: structural checks on parsed schemas and models
//!
//! ## Checks
//!
//! - `$id` is a string equal to the identifier implied by the file location.
//! - `$version` is a number.
//! - Every `$inheritsFrom` value, at any depth, names a parsed schema.
//! - Schema documents compile as JSON-Schema (when enabled).
//!
//! Documents that pass every check are promoted to the validation phase.
//! Documents that fail are reported and left out, so later phases never see
//! them.

use log::debug;
use serde_json::Value as JsonValue;

use super::Phase;
use crate::context::{ErrorKind, Payload, PhaseKind, PipelineContext, ValidationError};
use crate::error::Result;
use crate::identifier::Category;
use crate::locate::{find_field, find_value};
use crate::schema::check_schema_document;

/// Key naming a schema that another schema extends without merging.
pub const INHERITS_FROM_KEY: &str = "$inheritsFrom";

pub struct ValidationPhase {
    schema_check: bool,
}

impl ValidationPhase {
    pub fn new(schema_check: bool) -> Self {
        Self { schema_check }
    }

    fn check(&self, ctx: &PipelineContext<'_>, category: Category, id: &str, document: &JsonValue) -> Vec<ValidationError> {
        let path = ctx.source_path(id);
        let text = ctx.raw(category, id).unwrap_or_default();
        let expected = ctx
            .config_sets
            .get_config_set_by_resource_id(id)
            .and_then(|set| set.expected_id_for_path(&path))
            .unwrap_or_else(|| id.to_string());

        let mut errors = Vec::new();
        let structural = |message: String| ValidationError::new(ErrorKind::Structural, &path, message);

        match document.get("$id") {
            Some(JsonValue::String(found)) if *found == expected => {}
            Some(JsonValue::String(found)) => errors.push(
                structural(format!(
                    "Expected $id to be \"{}\", but found \"{}\".",
                    expected, found
                ))
                .at_opt(find_field(text, "$id")),
            ),
            _ => errors.push(
                structural(format!(
                    "Missing or invalid $id field. Expected: \"{}\"",
                    expected
                ))
                .at_opt(find_field(text, "$id")),
            ),
        }

        if !document.get("$version").is_some_and(JsonValue::is_number) {
            errors.push(
                structural("Missing or invalid $version. Expected a valid number.".to_string())
                    .at_opt(find_field(text, "$version")),
            );
        }

        for parent in inherits_from(document) {
            if !ctx.data.contains(PhaseKind::Conversion, Category::Schemas, &parent) {
                errors.push(
                    structural(format!(
                        "Reference error: '{}' refers to non-existent schema ID: {}",
                        INHERITS_FROM_KEY, parent
                    ))
                    .at_opt(find_value(text, &parent)),
                );
            }
        }

        if self.schema_check && category == Category::Schemas {
            for message in check_schema_document(document) {
                errors.push(ValidationError::new(
                    ErrorKind::SchemaValidation,
                    &path,
                    format!("JSON structure error: {}", message),
                ));
            }
        }

        errors
    }
}

impl Phase for ValidationPhase {
    fn kind(&self) -> PhaseKind {
        PhaseKind::Validation
    }

    fn execute(&self, ctx: &mut PipelineContext<'_>) -> Result<()> {
        for category in [Category::Schemas, Category::Models] {
            for (id, document) in ctx.values(PhaseKind::Conversion, category) {
                let errors = self.check(ctx, category, &id, &document);
                if errors.is_empty() {
                    ctx.data
                        .insert(PhaseKind::Validation, category, &id, Payload::Validated(document));
                } else {
                    debug!("{} failed validation with {} error(s)", id, errors.len());
                    errors.into_iter().for_each(|e| ctx.push_error(e));
                }
            }
        }
        Ok(())
    }
}

/// Every string under an `$inheritsFrom` key, at any depth.
fn inherits_from(document: &JsonValue) -> Vec<String> {
    fn walk(value: &JsonValue, out: &mut Vec<String>) {
        match value {
            JsonValue::Object(map) => {
                for (key, nested) in map {
                    if key == INHERITS_FROM_KEY {
                        match nested {
                            JsonValue::String(id) => out.push(id.clone()),
                            JsonValue::Array(ids) => out.extend(
                                ids.iter().filter_map(JsonValue::as_str).map(str::to_string),
                            ),
                            _ => {}
                        }
                    } else {
                        walk(nested, out);
                    }
                }
            }
            JsonValue::Array(items) => items.iter().for_each(|item| walk(item, out)),
            _ => {}
        }
    }

    let mut out = Vec::new();
    walk(document, &mut out);
    out
}
