//! Reference resolution for `$ref` and `$refs`
//!
//! [`merge_entity`] flattens one schema or model against a pool of
//! candidates. It is a pure function of its inputs: the entity is copied,
//! the pool is never modified, and every call starts with a fresh visited
//! set.
//!
//! ## Process
//!
//! 1. Check that the entity's `$id` and every pool key has 3 or 4 segments.
//! 2. Walk the copied entity. At each object:
//!    - `$ref`: resolve the target, flatten it, and merge the object's own
//!      keys over it. In model mode a schema target is left in place.
//!    - `$refs`: resolve every target left to right, merging each over the
//!      previous ones, then merge the object's own keys on top. In model
//!      mode schema targets are kept aside and written back as `$refs`.
//!    - otherwise descend into every value.
//! 3. Prune leftover reference keywords with
//!    [`clean_references`](super::json::clean_references).

use std::collections::{BTreeMap, HashSet};

use log::debug;
use serde_json::{Map, Value as JsonValue};

use super::json::{clean_references, deep_merge, REFS_KEY, REF_KEY};
use crate::error::{Error, Result};
use crate::identifier::{has_mergeable_shape, is_schema_id};

/// Candidate documents keyed by identifier.
pub type Pool = BTreeMap<String, JsonValue>;

/// What is being merged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeMode {
    /// Schemas merge every reference, including schema-to-schema ones.
    Schema,
    /// Models merge model references and keep schema references intact.
    Model,
}

/// Which earlier visits make a reference circular.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisitScope {
    /// Any identifier reached before during the same top-level merge.
    /// Two branches sharing a base (a diamond) are reported as circular.
    #[default]
    WholeMerge,
    /// Only identifiers on the current resolution path. Diamonds merge.
    Ancestors,
}

/// Options for [`merge_entity_with`].
#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOptions {
    pub visit_scope: VisitScope,
}

/// Flatten `entity` against `pool` with the default options.
pub fn merge_entity(entity: &JsonValue, pool: &Pool, mode: MergeMode) -> Result<JsonValue> {
    merge_entity_with(entity, pool, mode, MergeOptions::default())
}

/// Flatten `entity` against `pool`.
///
/// Raises [`Error::CircularReference`] or [`Error::UnresolvedReference`]
/// for the first reference that cannot be resolved, and
/// [`Error::InvalidIdentifier`] when an identifier has the wrong shape.
pub fn merge_entity_with(
    entity: &JsonValue,
    pool: &Pool,
    mode: MergeMode,
    options: MergeOptions,
) -> Result<JsonValue> {
    let id = entity
        .get("$id")
        .and_then(JsonValue::as_str)
        .unwrap_or_default();
    if !has_mergeable_shape(id) {
        return Err(Error::InvalidIdentifier {
            id: id.to_string(),
            message: "entity $id must have 3 or 4 segments".to_string(),
        });
    }
    if let Some(bad) = pool.keys().find(|key| !has_mergeable_shape(key)) {
        return Err(Error::InvalidIdentifier {
            id: bad.clone(),
            message: "pool identifiers must have 3 or 4 segments".to_string(),
        });
    }

    debug!("Merging {} against {} candidates", id, pool.len());
    let mut resolver = Resolver {
        pool,
        mode,
        options,
        visited: HashSet::new(),
    };
    let mut merged = resolver.resolve_node(entity.clone())?;
    clean_references(&mut merged);
    Ok(merged)
}

struct Resolver<'p> {
    pool: &'p Pool,
    mode: MergeMode,
    options: MergeOptions,
    visited: HashSet<String>,
}

impl Resolver<'_> {
    fn resolve_node(&mut self, node: JsonValue) -> Result<JsonValue> {
        match node {
            JsonValue::Object(map) => {
                if let Some(JsonValue::String(target)) = map.get(REF_KEY) {
                    let target = target.clone();
                    return self.merge_single(map, &target);
                }
                if let Some(JsonValue::Array(targets)) = map.get(REFS_KEY) {
                    let targets: Vec<String> = targets
                        .iter()
                        .filter_map(JsonValue::as_str)
                        .map(str::to_string)
                        .collect();
                    return self.merge_many(map, &targets);
                }

                let mut resolved = Map::with_capacity(map.len());
                for (key, value) in map {
                    resolved.insert(key, self.resolve_node(value)?);
                }
                Ok(JsonValue::Object(resolved))
            }
            JsonValue::Array(items) => items
                .into_iter()
                .map(|item| self.resolve_node(item))
                .collect::<Result<Vec<_>>>()
                .map(JsonValue::Array),
            other => Ok(other),
        }
    }

    fn merge_single(&mut self, node: Map<String, JsonValue>, target: &str) -> Result<JsonValue> {
        if self.keeps_in_place(target) {
            return Ok(JsonValue::Object(node));
        }

        let mut merged = self.resolve_target(target)?;
        deep_merge(&mut merged, &JsonValue::Object(node));
        Ok(merged)
    }

    fn merge_many(&mut self, node: Map<String, JsonValue>, targets: &[String]) -> Result<JsonValue> {
        let mut merged = JsonValue::Object(Map::new());
        let mut kept = Vec::new();

        for target in targets {
            if self.already_visited(target) {
                return Err(Error::CircularReference { id: target.clone() });
            }
            if self.keeps_in_place(target) {
                kept.push(JsonValue::String(target.clone()));
                continue;
            }
            let resolved = self.resolve_target(target)?;
            deep_merge(&mut merged, &resolved);
        }

        deep_merge(&mut merged, &JsonValue::Object(node));
        if self.mode == MergeMode::Model && !kept.is_empty() {
            if let JsonValue::Object(map) = &mut merged {
                map.insert(REFS_KEY.to_string(), JsonValue::Array(kept));
            }
        }
        Ok(merged)
    }

    /// Schema references inside models are kept for verification.
    fn keeps_in_place(&self, target: &str) -> bool {
        self.mode == MergeMode::Model && is_schema_id(target)
    }

    /// Look up `target`, mark it visited, and flatten it.
    fn resolve_target(&mut self, target: &str) -> Result<JsonValue> {
        if self.already_visited(target) {
            return Err(Error::CircularReference {
                id: target.to_string(),
            });
        }
        let base = self
            .pool
            .get(target)
            .cloned()
            .ok_or_else(|| Error::UnresolvedReference {
                id: target.to_string(),
            })?;

        self.visited.insert(target.to_string());
        let resolved = self.resolve_node(base)?;
        if self.options.visit_scope == VisitScope::Ancestors {
            self.visited.remove(target);
        }
        Ok(resolved)
    }

    fn already_visited(&self, target: &str) -> bool {
        self.visited.contains(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn pool(entries: &[JsonValue]) -> Pool {
        entries
            .iter()
            .map(|e| (e["$id"].as_str().unwrap().to_string(), e.clone()))
            .collect()
    }

    #[test]
    fn test_entity_without_refs_is_unchanged() {
        let entity = json!({ "$id": "cs.models.m", "$version": 1, "a": { "b": [1, 2] } });
        let merged = merge_entity(&entity, &Pool::new(), MergeMode::Model).unwrap();
        assert_eq!(merged, entity);
    }

    #[test]
    fn test_single_model_ref_merges_base_under_own_keys() {
        let base = json!({ "$id": "cs.models.base", "$version": 1, "a": 1, "b": 1 });
        let entity = json!({ "$id": "cs.models.m", "$version": 2, "$ref": "cs.models.base", "b": 2 });

        let merged = merge_entity(&entity, &pool(&[base]), MergeMode::Model).unwrap();
        assert_eq!(merged, json!({ "$id": "cs.models.m", "$version": 2, "a": 1, "b": 2 }));
    }

    #[test]
    fn test_schema_ref_in_model_is_preserved() {
        let entity = json!({ "$id": "cs.models.m", "$ref": "cs.schemas.s", "a": 1 });
        let merged = merge_entity(&entity, &Pool::new(), MergeMode::Model).unwrap();
        assert_eq!(merged, entity);
    }

    #[test]
    fn test_schema_ref_in_schema_is_merged() {
        let base = json!({ "$id": "cs.schemas.base", "type": "object", "properties": { "a": { "type": "string" } } });
        let entity = json!({
            "$id": "cs.schemas.s",
            "$ref": "cs.schemas.base",
            "properties": { "b": { "type": "number" } },
        });

        let merged = merge_entity(&entity, &pool(&[base]), MergeMode::Schema).unwrap();
        assert_eq!(
            merged,
            json!({
                "$id": "cs.schemas.s",
                "type": "object",
                "properties": { "a": { "type": "string" }, "b": { "type": "number" } },
            })
        );
    }

    #[test]
    fn test_refs_later_entries_win_and_schema_refs_are_kept() {
        let first = json!({ "$id": "cs.models.first", "x": "first", "only_first": true });
        let second = json!({ "$id": "cs.models.second", "x": "second" });
        let entity = json!({
            "$id": "cs.models.m",
            "$refs": ["cs.schemas.s", "cs.models.first", "cs.models.second"],
            "own": 1,
        });

        let merged = merge_entity(&entity, &pool(&[first, second]), MergeMode::Model).unwrap();
        assert_eq!(merged["x"], json!("second"));
        assert_eq!(merged["only_first"], json!(true));
        assert_eq!(merged["own"], json!(1));
        assert_eq!(merged["$id"], json!("cs.models.m"));
        assert_eq!(merged["$refs"], json!(["cs.schemas.s"]));
    }

    #[test]
    fn test_nested_references_resolve_recursively() {
        let root = json!({ "$id": "cs.models.root", "depth": 0, "root_only": true });
        let middle = json!({ "$id": "cs.models.middle", "$ref": "cs.models.root", "depth": 1 });
        let entity = json!({ "$id": "cs.models.leaf", "$ref": "cs.models.middle", "depth": 2 });

        let merged = merge_entity(&entity, &pool(&[root, middle]), MergeMode::Model).unwrap();
        assert_eq!(merged["depth"], json!(2));
        assert_eq!(merged["root_only"], json!(true));
        assert!(merged.get("$ref").is_none());
    }

    #[test]
    fn test_missing_reference_is_unresolved() {
        let entity = json!({ "$id": "cs.models.m", "$ref": "cs.models.ghost" });
        let err = merge_entity(&entity, &Pool::new(), MergeMode::Model).unwrap_err();
        assert!(matches!(err, Error::UnresolvedReference { id } if id == "cs.models.ghost"));
    }

    #[test]
    fn test_cycle_is_circular() {
        let a = json!({ "$id": "cs.models.a", "$ref": "cs.models.b" });
        let b = json!({ "$id": "cs.models.b", "$ref": "cs.models.a" });
        let err = merge_entity(&a, &pool(&[a.clone(), b]), MergeMode::Model).unwrap_err();
        assert!(matches!(err, Error::CircularReference { .. }));
    }

    #[test]
    fn test_diamond_is_reported_as_circular_by_default() {
        let base = json!({ "$id": "cs.models.base", "v": 0 });
        let left = json!({ "$id": "cs.models.left", "$ref": "cs.models.base", "l": 1 });
        let right = json!({ "$id": "cs.models.right", "$ref": "cs.models.base", "r": 1 });
        let entity = json!({ "$id": "cs.models.top", "$refs": ["cs.models.left", "cs.models.right"] });
        let candidates = pool(&[base, left, right]);

        let err = merge_entity(&entity, &candidates, MergeMode::Model).unwrap_err();
        assert!(matches!(err, Error::CircularReference { id } if id == "cs.models.base"));

        let options = MergeOptions {
            visit_scope: VisitScope::Ancestors,
        };
        let merged = merge_entity_with(&entity, &candidates, MergeMode::Model, options).unwrap();
        assert_eq!(merged["v"], json!(0));
        assert_eq!(merged["l"], json!(1));
        assert_eq!(merged["r"], json!(1));
    }

    #[test]
    fn test_ancestor_scope_still_detects_cycles() {
        let a = json!({ "$id": "cs.models.a", "$ref": "cs.models.b" });
        let b = json!({ "$id": "cs.models.b", "$ref": "cs.models.a" });
        let options = MergeOptions {
            visit_scope: VisitScope::Ancestors,
        };
        let err = merge_entity_with(&a, &pool(&[a.clone(), b]), MergeMode::Model, options).unwrap_err();
        assert!(matches!(err, Error::CircularReference { .. }));
    }

    #[test]
    fn test_invalid_identifiers_are_internal_errors() {
        let entity = json!({ "$id": "cs.models", "a": 1 });
        assert!(matches!(
            merge_entity(&entity, &Pool::new(), MergeMode::Model),
            Err(Error::InvalidIdentifier { .. })
        ));

        let entity = json!({ "$id": "cs.models.m" });
        let mut candidates = Pool::new();
        candidates.insert("bad".to_string(), json!({}));
        assert!(matches!(
            merge_entity(&entity, &candidates, MergeMode::Model),
            Err(Error::InvalidIdentifier { .. })
        ));
    }

    #[test]
    fn test_pool_is_not_modified() {
        let base = json!({ "$id": "cs.models.base", "nested": { "a": 1 } });
        let candidates = pool(&[base.clone()]);
        let entity = json!({ "$id": "cs.models.m", "$ref": "cs.models.base", "nested": { "b": 2 } });

        merge_entity(&entity, &candidates, MergeMode::Model).unwrap();
        assert_eq!(candidates["cs.models.base"], base);
    }

    #[test]
    fn test_demo_extended_model() {
        let base_model = json!({
            "$id": "demo.models.base-model",
            "$version": 1,
            "$ref": "demo.schemas.base-schema",
            "some_prop": "x",
        });
        let extended = json!({
            "$id": "demo.models.extended-model",
            "$version": 1,
            "$refs": ["demo.schemas.extended-schema", "demo.models.base-model"],
            "name": "y",
        });

        let merged = merge_entity(&extended, &pool(&[base_model]), MergeMode::Model).unwrap();
        assert_eq!(
            merged,
            json!({
                "$id": "demo.models.extended-model",
                "$version": 1,
                "$ref": "demo.schemas.base-schema",
                "some_prop": "x",
                "$refs": ["demo.schemas.extended-schema"],
                "name": "y",
            })
        );
    }
}
