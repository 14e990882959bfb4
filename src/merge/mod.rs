//! Reference merging for schemas and models
//!
//! Entities inherit from each other through two keywords:
//!
//! - `$ref`: a single identifier whose document is layered under the
//!   referencing object.
//! - `$refs`: an ordered list of identifiers, merged left to right, with the
//!   referencing object applied last.
//!
//! ## Modules
//!
//! - `json`: value-level helpers ([`deep_merge`], keyword cleanup, equality).
//! - `references`: the resolver that walks an entity and flattens its
//!   references against a pool of candidates ([`merge_entity`]).

pub mod json;
pub mod references;

pub use json::{
    clean_references, collect_references, deep_merge, json_equal, strip_references, REFS_KEY,
    REF_KEY,
};
pub use references::{merge_entity, merge_entity_with, MergeMode, MergeOptions, Pool, VisitScope};
