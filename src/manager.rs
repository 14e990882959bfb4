//! # Manager
//!
//! The [`Manager`] is what hosts talk to. It owns the discovered config
//! sets and the injected filesystem and version-control capabilities, and
//! runs a pipeline once per model. A schema that no model in its set
//! mentions gets a run of its own afterwards.
//!
//! ## Operations
//!
//! - [`Manager::validate_all`]: Ingest through Verification for every model.
//!   Nothing is written.
//! - [`Manager::build_all`]: every phase for every model, under the workspace
//!   build lock. In strict mode the first model whose output would change
//!   stops the run.
//! - Scaffolding: [`Manager::create_config_set`], [`Manager::create_schema`],
//!   [`Manager::create_model`], [`Manager::create_demo_config_set`].
//!
//! Results carry every model's diagnostics. [`PipelineResults::errors`]
//! merges them across models, dropping repeats of the same message on the
//! same file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::{debug, info, warn};
use serde::Serialize;
use serde_json::json;

use crate::config::{self, Settings};
use crate::configset::{ConfigSet, ConfigSetManager};
use crate::context::{CancellationToken, ErrorKind, PhaseKind, PipelineContext, ValidationError};
use crate::error::{Error, Result};
use crate::filesystem::FileSystem;
use crate::git::VersionControl;
use crate::identifier::Category;
use crate::lock::BuildLock;
use crate::phases::{build_pipeline, validation_pipeline, Pipeline};

/// Name of the config set written by [`Manager::create_demo_config_set`].
pub const DEMO_CONFIG_SET: &str = "demo-configset";

/// Outcome of one model's pipeline.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResult {
    pub model_id: String,
    pub success: bool,
    pub errors: Vec<ValidationError>,
}

/// Outcome of a run over many models.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineResults {
    pub results: Vec<PipelineResult>,
    pub has_errors: bool,
}

impl PipelineResults {
    fn from_results(results: Vec<PipelineResult>) -> Self {
        let has_errors = results.iter().any(|r| !r.success);
        Self { results, has_errors }
    }

    /// Every diagnostic once per `(file, message)`, in first-seen order.
    pub fn errors(&self) -> Vec<&ValidationError> {
        let mut seen = HashSet::new();
        self.results
            .iter()
            .flat_map(|r| r.errors.iter())
            .filter(|e| seen.insert((e.file_path.clone(), e.message.clone())))
            .collect()
    }
}

/// Entry point for validating and building a workspace.
pub struct Manager {
    root: PathBuf,
    fs: Arc<dyn FileSystem>,
    vcs: Arc<dyn VersionControl>,
    settings: Settings,
    config_sets: ConfigSetManager,
    cancellation: CancellationToken,
}

impl Manager {
    /// Load settings and discover the config sets under `root`.
    pub fn new(root: impl Into<PathBuf>, fs: Arc<dyn FileSystem>, vcs: Arc<dyn VersionControl>) -> Result<Self> {
        let root = root.into();
        let settings = config::load(fs.as_ref(), &root)?;
        let mut manager = Self {
            root,
            fs,
            vcs,
            settings,
            config_sets: ConfigSetManager::new(),
            cancellation: CancellationToken::new(),
        };
        manager.refresh()?;
        Ok(manager)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Token that stops a running validation or build when cancelled.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Rediscover config sets from disk.
    pub fn refresh(&mut self) -> Result<()> {
        self.config_sets
            .discover(self.fs.as_ref(), &self.root, &self.settings)?;
        Ok(())
    }

    pub fn get_config_sets(&self) -> &[ConfigSet] {
        self.config_sets.config_sets()
    }

    pub fn get_config_set_by_resource_id(&self, id: &str) -> Option<&ConfigSet> {
        self.config_sets.get_config_set_by_resource_id(id)
    }

    pub fn create_config_set(&mut self, name: &str) -> Result<&ConfigSet> {
        self.config_sets
            .create_config_set(self.fs.as_ref(), &self.root, name)
    }

    pub fn create_schema(&mut self, config_set: &str, name: &str) -> Result<String> {
        let fs = self.fs.clone();
        self.config_set_mut(config_set)?
            .create_schema(fs.as_ref(), name)
    }

    pub fn create_model(&mut self, config_set: &str, name: &str) -> Result<String> {
        let fs = self.fs.clone();
        self.config_set_mut(config_set)?
            .create_model(fs.as_ref(), name)
    }

    fn config_set_mut(&mut self, name: &str) -> Result<&mut ConfigSet> {
        self.config_sets
            .get_by_name_mut(name)
            .ok_or_else(|| Error::ConfigSet {
                message: format!("Unknown config set: {}", name),
            })
    }

    /// Create [`DEMO_CONFIG_SET`] with two schemas and two models that
    /// inherit from each other.
    pub fn create_demo_config_set(&mut self) -> Result<&ConfigSet> {
        let fs = self.fs.clone();
        self.create_config_set(DEMO_CONFIG_SET)?;
        let set = self.config_set_mut(DEMO_CONFIG_SET)?;
        let id = |category: Category, name: &str| format!("{}.{}.{}", DEMO_CONFIG_SET, category, name);

        set.create_resource_with(
            fs.as_ref(),
            Category::Schemas,
            "base-schema",
            &json!({
                "$id": id(Category::Schemas, "base-schema"),
                "$version": 1,
                "type": "object",
                "properties": { "some_prop": { "type": "string" } }
            }),
        )?;
        set.create_resource_with(
            fs.as_ref(),
            Category::Schemas,
            "extended-schema",
            &json!({
                "$id": id(Category::Schemas, "extended-schema"),
                "$version": 1,
                "$inheritsFrom": id(Category::Schemas, "base-schema"),
                "type": "object",
                "properties": { "name": { "type": "string" } }
            }),
        )?;
        set.create_resource_with(
            fs.as_ref(),
            Category::Models,
            "base-model",
            &json!({
                "$id": id(Category::Models, "base-model"),
                "$version": 1,
                "$ref": id(Category::Schemas, "base-schema"),
                "some_prop": "x"
            }),
        )?;
        set.create_resource_with(
            fs.as_ref(),
            Category::Models,
            "extended-model",
            &json!({
                "$id": id(Category::Models, "extended-model"),
                "$version": 1,
                "$refs": [
                    id(Category::Schemas, "extended-schema"),
                    id(Category::Models, "base-model")
                ],
                "name": "y"
            }),
        )?;

        info!("Created demo config set {}", DEMO_CONFIG_SET);
        self.config_sets
            .get_by_name(DEMO_CONFIG_SET)
            .ok_or_else(|| Error::ConfigSet {
                message: format!("Config set {} vanished after creation", DEMO_CONFIG_SET),
            })
    }

    /// Check every model without writing anything.
    pub fn validate_all(&self) -> Result<PipelineResults> {
        let pipeline = validation_pipeline(self.fs.clone(), self.settings.schema_check);
        self.run_all(&pipeline)
    }

    /// Build every model and every unreferenced schema, and write the
    /// versioned output.
    ///
    /// With `strict` set, the run stops at the first document whose output
    /// would change, before anything is written for it.
    pub fn build_all(&mut self, strict: bool) -> Result<PipelineResults> {
        let _lock = BuildLock::acquire(&self.root)?;
        let pipeline = build_pipeline(
            self.fs.clone(),
            self.vcs.clone(),
            self.settings.schema_check,
            strict,
        );
        let results = self.run_all(&pipeline)?;
        self.refresh()?;
        Ok(results)
    }

    fn run_all(&self, pipeline: &Pipeline) -> Result<PipelineResults> {
        let mut results = Vec::new();

        'sets: for set in self.config_sets.config_sets() {
            let mut reached: HashSet<String> = HashSet::new();

            for model_id in set.model_ids() {
                let (result, stop) = self.run_one(pipeline, set, model_id, &mut reached)?;
                results.push(result);
                if stop {
                    break 'sets;
                }
            }

            // Schemas no model mentions still get validated, versioned and written.
            for schema_id in set.schema_ids() {
                if reached.contains(&schema_id) {
                    continue;
                }
                let (result, stop) = self.run_one(pipeline, set, schema_id, &mut reached)?;
                results.push(result);
                if stop {
                    break 'sets;
                }
            }
        }

        let results = PipelineResults::from_results(results);
        info!(
            "Processed {} document(s), {} with problems",
            results.results.len(),
            results.results.iter().filter(|r| !r.success).count()
        );
        Ok(results)
    }

    /// Run `pipeline` for one target, adding every schema it ingested to
    /// `reached`. The flag asks the caller to stop after a strict-mode conflict.
    fn run_one(
        &self,
        pipeline: &Pipeline,
        set: &ConfigSet,
        target: String,
        reached: &mut HashSet<String>,
    ) -> Result<(PipelineResult, bool)> {
        if self.cancellation.is_cancelled() {
            return Err(Error::Cancelled {
                phase: PhaseKind::Ingest.to_string(),
            });
        }

        debug!("Running pipeline for {}", target);
        let mut ctx = PipelineContext::new(
            target.clone(),
            set,
            &self.config_sets,
            self.cancellation.clone(),
        );

        let mut stop = false;
        match pipeline.execute(&mut ctx) {
            Ok(()) => {}
            Err(e @ Error::Cancelled { .. }) => return Err(e),
            Err(e @ Error::VersioningConflict { .. }) => {
                warn!("{}", e);
                stop = true;
            }
            Err(e) => {
                let path = set
                    .file_path(&target)
                    .map(Path::to_path_buf)
                    .unwrap_or_else(|| ctx.source_path(&target));
                ctx.push_error(ValidationError::new(ErrorKind::Io, path, e.to_string()));
            }
        }

        reached.extend(
            ctx.data
                .category_entries(PhaseKind::Ingest, Category::Schemas)
                .map(|(id, _)| id.to_string()),
        );

        let errors = std::mem::take(&mut ctx.errors);
        Ok((
            PipelineResult {
                model_id: target,
                success: errors.is_empty(),
                errors,
            },
            stop,
        ))
    }
}
