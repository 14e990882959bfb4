//! The phases of a model build.
//!
//! ## Overview
//!
//! Every model is built by running a [`Pipeline`] over a fresh
//! [`PipelineContext`]:
//! 1. Ingest - Read the model and every document it mentions
//! 2. Conversion - Parse the raw text as JSON
//! 3. Validation - Check `$id`, `$version`, `$inheritsFrom` and schema shape
//! 4. Build - Merge references into built schemas, models and instances
//! 5. Verification - Validate models and instances against their schemas
//! 6. Problem Resolution - Summarize diagnostics per file
//! 7. Versioning - Decide which versioned files to write
//! 8. Output Conversion - Pretty-print staged documents
//! 9. Serialization - Write staged documents to disk
//!
//! Conversion, Validation, Build and Verification are gating: the pipeline
//! stops before them once the context holds an error. Phases communicate only
//! through the context's blackboard.

use std::sync::Arc;

use crate::context::{PhaseKind, PipelineContext};
use crate::error::Result;
use crate::filesystem::FileSystem;
use crate::git::VersionControl;

pub mod build;
pub mod conversion;
pub mod ingest;
pub mod orchestrator;
pub mod output;
pub mod problem_resolution;
pub mod serialize;
pub mod validation;
pub mod verification;
pub mod versioning;

pub use build::BuildPhase;
pub use conversion::ConversionPhase;
pub use ingest::IngestPhase;
pub use orchestrator::Pipeline;
pub use output::OutputConversionPhase;
pub use problem_resolution::ProblemResolutionPhase;
pub use serialize::SerializationPhase;
pub use validation::ValidationPhase;
pub use verification::VerificationPhase;
pub use versioning::{VersionAction, VersioningPhase};

/// One step of a pipeline.
pub trait Phase {
    fn kind(&self) -> PhaseKind;

    /// Read earlier results from `ctx` and store this phase's own.
    ///
    /// Problems with individual documents go to the context's error list.
    /// An `Err` ends the pipeline for this model.
    fn execute(&self, ctx: &mut PipelineContext<'_>) -> Result<()>;
}

/// Ingest through Verification. Nothing is written.
pub fn validation_pipeline(fs: Arc<dyn FileSystem>, schema_check: bool) -> Pipeline {
    Pipeline::new()
        .with_phase(IngestPhase::new(fs))
        .with_phase(ConversionPhase)
        .with_phase(ValidationPhase::new(schema_check))
        .with_phase(BuildPhase)
        .with_phase(VerificationPhase)
}

/// Every phase, ending with writes to `fs`.
///
/// With `strict` set, any versioning decision other than a no-op fails the
/// run before anything is written.
pub fn build_pipeline(
    fs: Arc<dyn FileSystem>,
    vcs: Arc<dyn VersionControl>,
    schema_check: bool,
    strict: bool,
) -> Pipeline {
    validation_pipeline(fs.clone(), schema_check)
        .with_phase(ProblemResolutionPhase)
        .with_phase(VersioningPhase::new(fs.clone(), vcs, strict))
        .with_phase(OutputConversionPhase)
        .with_phase(SerializationPhase::new(fs))
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Shared fixtures for phase tests.

    use std::path::Path;

    use crate::configset::{ConfigSet, ConfigSetManager};
    use crate::filesystem::{FileSystem, MemoryFileSystem};

    pub const ROOT: &str = "/ws/demo";

    /// An in-memory `demo` config set holding `files` (relative path, content).
    pub fn demo_set(files: &[(&str, &str)]) -> (MemoryFileSystem, ConfigSetManager) {
        let fs = MemoryFileSystem::new();
        for category in ["schemas", "models", "instances"] {
            fs.create_dir_all(&Path::new(ROOT).join(category)).unwrap();
        }
        for (path, content) in files {
            fs.add_file(Path::new(ROOT).join(path), content).unwrap();
        }
        let mut manager = ConfigSetManager::new();
        manager.insert(ConfigSet::load(&fs, Path::new(ROOT)).unwrap());
        (fs, manager)
    }

    pub const BASE_SCHEMA: &str = r#"{
  "$id": "demo.schemas.base-schema",
  "$version": 1,
  "type": "object",
  "properties": { "some_prop": { "type": "string" } }
}"#;

    pub const EXTENDED_SCHEMA: &str = r#"{
  "$id": "demo.schemas.extended-schema",
  "$version": 1,
  "$inheritsFrom": "demo.schemas.base-schema",
  "type": "object",
  "properties": { "name": { "type": "string" } }
}"#;

    pub const BASE_MODEL: &str = r#"{
  "$id": "demo.models.base-model",
  "$version": 1,
  "$ref": "demo.schemas.base-schema",
  "some_prop": "x"
}"#;

    pub const EXTENDED_MODEL: &str = r#"{
  "$id": "demo.models.extended-model",
  "$version": 1,
  "$refs": ["demo.schemas.extended-schema", "demo.models.base-model"],
  "name": "y"
}"#;

    /// The four-document demo set.
    pub fn demo_files() -> Vec<(&'static str, &'static str)> {
        vec![
            ("schemas/base-schema.json", BASE_SCHEMA),
            ("schemas/extended-schema.json", EXTENDED_SCHEMA),
            ("models/base-model.json", BASE_MODEL),
            ("models/extended-model.json", EXTENDED_MODEL),
        ]
    }
}
