//! JSON-Schema checks through the `jsonschema` crate
//!
//! Documents in a config set use `$id`, `$ref` and `$refs` with their own
//! meaning, which a standard validator would try to resolve as URIs. Every
//! schema is therefore compiled from a copy with those keywords removed.

use jsonschema::{Draft, JSONSchema, ValidationError as SchemaError};
use jsonschema::error::ValidationErrorKind;
use serde_json::Value as JsonValue;

use crate::merge::strip_references;

/// One validator failure, flattened to owned strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Dotted path of the offending field, or the missing property name for
    /// required-field failures.
    pub field: String,
    pub message: String,
    /// Set when the failure is a missing required property.
    pub missing_required: Option<String>,
}

impl Violation {
    fn from_error(error: &SchemaError<'_>) -> Self {
        let missing_required = match &error.kind {
            ValidationErrorKind::Required { property } => Some(
                property
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| property.to_string()),
            ),
            _ => required_from_message(&error.to_string()),
        };

        let pointer = error.instance_path.to_string();
        let field = if pointer.is_empty() || pointer == "/" {
            missing_required.clone().unwrap_or_else(|| "(root)".to_string())
        } else {
            pointer.trim_start_matches('/').replace('/', ".")
        };

        Self {
            field,
            message: error.to_string(),
            missing_required,
        }
    }
}

/// Pull a property name out of a required-field message.
fn required_from_message(message: &str) -> Option<String> {
    [
        r"must have required property '(.+?)'",
        r#""(.+?)" is a required property"#,
    ]
    .iter()
    .find_map(|pattern| {
        regex::Regex::new(pattern)
            .ok()?
            .captures(message)?
            .get(1)
            .map(|m| m.as_str().to_string())
    })
}

/// Copy of `schema` that a standard validator can compile.
fn compilable(schema: &JsonValue) -> JsonValue {
    let mut copy = schema.clone();
    strip_references(&mut copy);
    if let JsonValue::Object(map) = &mut copy {
        map.shift_remove("$id");
    }
    copy
}

fn compile(schema: &JsonValue) -> std::result::Result<JSONSchema, String> {
    JSONSchema::options()
        .with_draft(Draft::Draft7)
        .compile(&compilable(schema))
        .map_err(|e| e.to_string())
}

/// Problems that make `schema` an invalid JSON-Schema document.
///
/// Complaints about references are left to the merge engine.
pub fn check_schema_document(schema: &JsonValue) -> Vec<String> {
    match compile(schema) {
        Ok(_) => Vec::new(),
        Err(message) if message.contains("$ref") || message.contains("resolve") => Vec::new(),
        Err(message) => vec![message],
    }
}

/// Validate `instance` against `schema`.
///
/// A schema that fails to compile yields a single violation at the root.
pub fn validate_against(schema: &JsonValue, instance: &JsonValue) -> Vec<Violation> {
    let compiled = match compile(schema) {
        Ok(compiled) => compiled,
        Err(message) => {
            return vec![Violation {
                field: "(root)".to_string(),
                message,
                missing_required: None,
            }]
        }
    };

    let result = compiled.validate(instance);
    match result {
        Ok(()) => Vec::new(),
        Err(errors) => errors.map(|e| Violation::from_error(&e)).collect(),
    }
}
