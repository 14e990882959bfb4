//! JSON value helpers for reference merging
//!
//! - [`deep_merge`] layers one document over another.
//! - [`clean_references`] prunes `$ref`/`$refs` after a merge.
//! - [`strip_references`] removes every reference keyword, producing an instance.
//! - [`collect_references`] lists every reference keyword target in a document.

use serde_json::{Map, Value as JsonValue};

use crate::identifier::{is_model_id, is_schema_id};

/// Key holding a single inherited identifier.
pub const REF_KEY: &str = "$ref";
/// Key holding an ordered list of inherited identifiers.
pub const REFS_KEY: &str = "$refs";

/// Merge `source` into `target`, with `source` winning on conflicts.
///
/// For every key of `source`:
/// - arrays replace the target value wholesale
/// - empty objects replace the target value with `{}`
/// - non-empty objects merge recursively into the target value, which is
///   reset to `{}` first when it is not an object
/// - everything else overwrites
///
/// A non-object `source` replaces `target` entirely.
pub fn deep_merge(target: &mut JsonValue, source: &JsonValue) {
    let JsonValue::Object(source_map) = source else {
        *target = source.clone();
        return;
    };
    if !target.is_object() {
        *target = JsonValue::Object(Map::new());
    }
    let JsonValue::Object(target_map) = target else {
        return;
    };

    for (key, value) in source_map {
        match value {
            JsonValue::Object(nested) if nested.is_empty() => {
                target_map.insert(key.clone(), JsonValue::Object(Map::new()));
            }
            JsonValue::Object(_) => {
                let existing = target_map
                    .entry(key.clone())
                    .or_insert_with(|| JsonValue::Object(Map::new()));
                deep_merge(existing, value);
            }
            _ => {
                target_map.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Prune reference keywords after a merge.
///
/// Objects whose `$id` names a model keep only the `$refs` entries that
/// point at schemas, and lose a `$ref` that points at a model. Every other
/// object loses `$ref` and `$refs` entirely. Applied recursively.
pub fn clean_references(value: &mut JsonValue) {
    match value {
        JsonValue::Object(map) => {
            let is_model = map
                .get("$id")
                .and_then(JsonValue::as_str)
                .is_some_and(is_model_id);

            if is_model {
                let no_schema_refs = match map.get_mut(REFS_KEY) {
                    Some(JsonValue::Array(refs)) => {
                        refs.retain(|r| r.as_str().is_some_and(is_schema_id));
                        refs.is_empty()
                    }
                    _ => false,
                };
                if no_schema_refs {
                    map.shift_remove(REFS_KEY);
                }
                if map
                    .get(REF_KEY)
                    .and_then(JsonValue::as_str)
                    .is_some_and(is_model_id)
                {
                    map.shift_remove(REF_KEY);
                }
            } else {
                map.shift_remove(REF_KEY);
                map.shift_remove(REFS_KEY);
            }

            for nested in map.values_mut() {
                clean_references(nested);
            }
        }
        JsonValue::Array(items) => items.iter_mut().for_each(clean_references),
        _ => {}
    }
}

/// Remove every `$ref` and `$refs` key, at any depth.
pub fn strip_references(value: &mut JsonValue) {
    match value {
        JsonValue::Object(map) => {
            map.shift_remove(REF_KEY);
            map.shift_remove(REFS_KEY);
            for nested in map.values_mut() {
                strip_references(nested);
            }
        }
        JsonValue::Array(items) => items.iter_mut().for_each(strip_references),
        _ => {}
    }
}

/// Every identifier named by a `$ref` or `$refs` anywhere in `value`, in
/// document order, without duplicates.
pub fn collect_references(value: &JsonValue) -> Vec<String> {
    fn walk(value: &JsonValue, out: &mut Vec<String>) {
        match value {
            JsonValue::Object(map) => {
                for (key, nested) in map {
                    match (key.as_str(), nested) {
                        (REF_KEY, JsonValue::String(id)) => push_unique(out, id),
                        (REFS_KEY, JsonValue::Array(ids)) => ids
                            .iter()
                            .filter_map(JsonValue::as_str)
                            .for_each(|id| push_unique(out, id)),
                        _ => walk(nested, out),
                    }
                }
            }
            JsonValue::Array(items) => items.iter().for_each(|item| walk(item, out)),
            _ => {}
        }
    }

    fn push_unique(out: &mut Vec<String>, id: &str) {
        if !out.iter().any(|existing| existing == id) {
            out.push(id.to_string());
        }
    }

    let mut out = Vec::new();
    walk(value, &mut out);
    out
}

/// Structural equality where object key order does not matter.
pub fn json_equal(a: &JsonValue, b: &JsonValue) -> bool {
    match (a, b) {
        (JsonValue::Object(left), JsonValue::Object(right)) => {
            left.len() == right.len()
                && left
                    .iter()
                    .all(|(key, value)| right.get(key).is_some_and(|other| json_equal(value, other)))
        }
        (JsonValue::Array(left), JsonValue::Array(right)) => {
            left.len() == right.len() && left.iter().zip(right).all(|(l, r)| json_equal(l, r))
        }
        _ => a == b,
    }
}
