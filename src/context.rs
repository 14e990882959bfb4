//! # Pipeline Context
//!
//! A [`PipelineContext`] is the scratch space for one model's pipeline run.
//! Phases communicate through its blackboard: each phase reads what an
//! earlier phase stored under `(phase, category, id)` and writes its own
//! results under its own phase key. Diagnostics accumulate in
//! [`PipelineContext::errors`] and are only acted upon by the orchestrator's
//! gating rule.
//!
//! A context is created fresh for every model and dropped when the run ends.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;

use serde::Serialize;
use serde_json::Value;

use crate::configset::{ConfigSet, ConfigSetManager};
use crate::identifier::Category;
use crate::locate::Span;

/// How serious a diagnostic is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// Which kind of problem a diagnostic reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ErrorKind {
    /// Malformed JSON.
    Parse,
    /// Bad or missing `$id`/`$version`, dangling `$inheritsFrom`.
    Structural,
    /// A JSON-Schema violation.
    SchemaValidation,
    UnresolvedReference,
    CircularReference,
    /// Missing or unreadable file.
    Io,
    /// A change found while builds must not change anything.
    VersioningConflict,
}

/// A diagnostic attached to a file.
///
/// `line` and `column` are 0-based except for parse errors, whose line is
/// 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationError {
    pub file_path: PathBuf,
    pub line: usize,
    pub column: usize,
    pub end_column: usize,
    pub message: String,
    pub severity: Severity,
    pub kind: ErrorKind,
}

impl ValidationError {
    /// An error at the start of `file_path`.
    pub fn new(kind: ErrorKind, file_path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self {
            file_path: file_path.into(),
            line: 0,
            column: 0,
            end_column: 0,
            message: message.into(),
            severity: Severity::Error,
            kind,
        }
    }

    /// Move the diagnostic to `span`.
    pub fn at(mut self, span: Span) -> Self {
        self.line = span.line;
        self.column = span.column;
        self.end_column = span.end_column;
        self
    }

    /// Move the diagnostic to `span` when one was found.
    pub fn at_opt(self, span: Option<Span>) -> Self {
        self.at(span.unwrap_or_default())
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}: {}",
            self.file_path.display(),
            self.line,
            self.column,
            self.message
        )
    }
}

/// The phases a pipeline can contain, in their canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PhaseKind {
    Ingest,
    Conversion,
    Validation,
    Build,
    Verification,
    ProblemResolution,
    Versioning,
    OutputConversion,
    Serialization,
}

impl PhaseKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseKind::Ingest => "ingest",
            PhaseKind::Conversion => "conversion",
            PhaseKind::Validation => "validation",
            PhaseKind::Build => "build",
            PhaseKind::Verification => "verification",
            PhaseKind::ProblemResolution => "problem-resolution",
            PhaseKind::Versioning => "versioning",
            PhaseKind::OutputConversion => "output-conversion",
            PhaseKind::Serialization => "serialization",
        }
    }

    /// Gating phases refuse to run once the context holds an error.
    pub fn is_gating(&self) -> bool {
        matches!(
            self,
            PhaseKind::Conversion
                | PhaseKind::Validation
                | PhaseKind::Build
                | PhaseKind::Verification
        )
    }
}

impl fmt::Display for PhaseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a phase stored on the blackboard.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// File text as read from disk.
    Raw(String),
    /// Parsed JSON.
    Parsed(Value),
    /// JSON that passed structural checks.
    Validated(Value),
    /// Built schema, authored model, or flattened instance.
    Built(Value),
    /// Version-stamped content staged for writing.
    Versioned(Value),
    /// Serialized text ready to be written.
    Output(String),
}

impl Payload {
    /// The JSON value carried by this payload, if it carries one.
    pub fn value(&self) -> Option<&Value> {
        match self {
            Payload::Parsed(v) | Payload::Validated(v) | Payload::Built(v) | Payload::Versioned(v) => {
                Some(v)
            }
            Payload::Raw(_) | Payload::Output(_) => None,
        }
    }

    /// The text carried by this payload, if it carries text.
    pub fn text(&self) -> Option<&str> {
        match self {
            Payload::Raw(s) | Payload::Output(s) => Some(s),
            _ => None,
        }
    }
}

/// Blackboard key.
pub type EntryKey = (PhaseKind, Category, String);

/// A stored payload and when it was written.
#[derive(Debug, Clone)]
pub struct Entry {
    pub payload: Payload,
    pub timestamp: SystemTime,
}

/// Insertion-ordered table of phase outputs.
///
/// Replacing an existing key keeps its original position.
#[derive(Debug, Default)]
pub struct Blackboard {
    entries: Vec<(EntryKey, Entry)>,
    index: HashMap<EntryKey, usize>,
}

impl Blackboard {
    pub fn insert(&mut self, phase: PhaseKind, category: Category, id: &str, payload: Payload) {
        let key = (phase, category, id.to_string());
        let entry = Entry {
            payload,
            timestamp: SystemTime::now(),
        };
        match self.index.get(&key) {
            Some(&pos) => self.entries[pos].1 = entry,
            None => {
                self.index.insert(key.clone(), self.entries.len());
                self.entries.push((key, entry));
            }
        }
    }

    pub fn get(&self, phase: PhaseKind, category: Category, id: &str) -> Option<&Payload> {
        let key = (phase, category, id.to_string());
        self.index.get(&key).map(|&pos| &self.entries[pos].1.payload)
    }

    pub fn contains(&self, phase: PhaseKind, category: Category, id: &str) -> bool {
        self.get(phase, category, id).is_some()
    }

    /// Entries written by `phase`, in insertion order.
    pub fn phase_entries(&self, phase: PhaseKind) -> impl Iterator<Item = (Category, &str, &Payload)> {
        self.entries
            .iter()
            .filter(move |((p, _, _), _)| *p == phase)
            .map(|((_, category, id), entry)| (*category, id.as_str(), &entry.payload))
    }

    /// Entries written by `phase` for one category, in insertion order.
    pub fn category_entries(
        &self,
        phase: PhaseKind,
        category: Category,
    ) -> impl Iterator<Item = (&str, &Payload)> {
        self.phase_entries(phase)
            .filter(move |(c, _, _)| *c == category)
            .map(|(_, id, payload)| (id, payload))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Shared flag checked between phases and between models.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Per-model workspace threaded through every phase.
pub struct PipelineContext<'a> {
    /// Model this run builds.
    pub model_id: String,
    /// Config set owning the model.
    pub config_set: &'a ConfigSet,
    /// Every known config set, for references that cross sets.
    pub config_sets: &'a ConfigSetManager,
    /// Phase outputs.
    pub data: Blackboard,
    /// Diagnostics collected so far.
    pub errors: Vec<ValidationError>,
    sources: HashMap<String, PathBuf>,
    cancellation: CancellationToken,
}

impl<'a> PipelineContext<'a> {
    pub fn new(
        model_id: impl Into<String>,
        config_set: &'a ConfigSet,
        config_sets: &'a ConfigSetManager,
        cancellation: CancellationToken,
    ) -> Self {
        Self {
            model_id: model_id.into(),
            config_set,
            config_sets,
            data: Blackboard::default(),
            errors: Vec::new(),
            sources: HashMap::new(),
            cancellation,
        }
    }

    pub fn push_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Remember the file an identifier was read from.
    pub fn record_source(&mut self, id: &str, path: &Path) {
        self.sources.insert(id.to_string(), path.to_path_buf());
    }

    /// File an identifier was read from, or the path its id maps to.
    pub fn source_path(&self, id: &str) -> PathBuf {
        self.sources
            .get(id)
            .cloned()
            .or_else(|| self.config_sets.build_abs_file_path(id))
            .unwrap_or_else(|| PathBuf::from(id))
    }

    /// Raw text stored by ingestion.
    pub fn raw(&self, category: Category, id: &str) -> Option<&str> {
        self.data
            .get(PhaseKind::Ingest, category, id)
            .and_then(Payload::text)
    }

    /// JSON value stored by `phase`.
    pub fn value(&self, phase: PhaseKind, category: Category, id: &str) -> Option<&Value> {
        self.data.get(phase, category, id).and_then(Payload::value)
    }

    /// `(id, value)` pairs stored by `phase` for `category`, cloned out of
    /// the blackboard so the caller can keep mutating the context.
    pub fn values(&self, phase: PhaseKind, category: Category) -> Vec<(String, Value)> {
        self.data
            .category_entries(phase, category)
            .filter_map(|(id, payload)| payload.value().map(|v| (id.to_string(), v.clone())))
            .collect()
    }
}
