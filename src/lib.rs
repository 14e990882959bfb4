//! # layercfg
//!
//! This library compiles versioned JSON configuration. A workspace holds
//! *config sets*: directories with `schemas/`, `models/` and `instances/`
//! folders. Models and schemas inherit from each other through `$ref` and
//! `$refs`; building a model flattens those references into an *instance*,
//! checks it against the schemas the model names, and writes versioned
//! copies next to every output.
//!
//! ## Quick Example
//!
//! ```
//! use layercfg::merge::{merge_entity, MergeMode, Pool};
//! use serde_json::json;
//!
//! let mut pool = Pool::new();
//! pool.insert(
//!     "shop.models.base".to_string(),
//!     json!({ "$id": "shop.models.base", "currency": "EUR", "vat": 20 }),
//! );
//!
//! let model = json!({
//!     "$id": "shop.models.fr",
//!     "$ref": "shop.models.base",
//!     "vat": 21,
//! });
//!
//! let merged = merge_entity(&model, &pool, MergeMode::Model).unwrap();
//! assert_eq!(merged["currency"], "EUR");
//! assert_eq!(merged["vat"], 21);
//! ```
//!
//! ## Core Concepts
//!
//! - **Identifiers (`identifier`)**: `configset.category.name[.version]`
//!   strings naming every document.
//! - **Config sets (`configset`)**: discovery of sets on disk and the mapping
//!   between identifiers and files.
//! - **Merge engine (`merge`)**: flattens `$ref`/`$refs` against a pool of
//!   documents, detecting cycles and missing targets.
//! - **Phases (`phases`)**: the per-model pipeline, from reading files to
//!   writing versioned output.
//! - **Manager (`manager`)**: runs the pipeline over every model and collects
//!   the diagnostics.
//!
//! ## Execution Flow
//!
//! For each model, [`phases::Pipeline`] runs:
//!
//! 1.  **Ingest**: read the model and every document it mentions.
//! 2.  **Conversion**: parse the text as JSON.
//! 3.  **Validation**: check `$id`, `$version` and `$inheritsFrom`.
//! 4.  **Build**: merge references into schemas, models and instances.
//! 5.  **Verification**: validate models and instances against their schemas.
//! 6.  **Problem Resolution**: summarize diagnostics.
//! 7.  **Versioning**: decide which versioned files change.
//! 8.  **Output Conversion** and **Serialization**: write the files.
//!
//! Filesystem and version-control access are injected through the
//! [`filesystem::FileSystem`] and [`git::VersionControl`] traits.

pub mod config;
pub mod configset;
pub mod context;
pub mod error;
pub mod filesystem;
pub mod git;
pub mod identifier;
pub mod locate;
pub mod lock;
pub mod manager;
pub mod merge;
pub mod output;
pub mod phases;
pub mod schema;
