//! # Error Handling
//!
//! This module defines the centralized error type for `layercfg`. It uses
//! `thiserror` to build one `Error` enum covering every failure that aborts
//! an operation, as opposed to the per-document diagnostics collected in
//! [`crate::context::ValidationError`], which accumulate and are reported
//! together.
//!
//! ## Key Components
//!
//! - **`Error`**: every hard failure the library can raise. Reference
//!   resolution failures (`UnresolvedReference`, `CircularReference`) are
//!   raised by the merge engine and converted into diagnostics by the build
//!   phase; the remaining variants usually end the current operation.
//!
//! - **`Result<T>`**: a type alias for `std::result::Result<T, Error>`.

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for layercfg operations
#[derive(Error, Debug)]
pub enum Error {
    /// A `$ref`/`$refs` target is not part of the resolution pool.
    #[error("Unresolved reference: {id}")]
    UnresolvedReference { id: String },

    /// A reference was reached twice during one merge.
    #[error("Circular reference: {id}")]
    CircularReference { id: String },

    /// An identifier does not have the `configset.category.name[.version]` shape.
    #[error("Invalid resource identifier '{id}': {message}")]
    InvalidIdentifier { id: String, message: String },

    /// A file required by the operation does not exist.
    #[error("File not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// A file required by the operation exists but has no content.
    #[error("File is empty: {}", path.display())]
    EmptyFile { path: PathBuf },

    /// A build in "fail on change" mode found an artifact that would change.
    #[error("Versioning conflict for {id}: {action}")]
    VersioningConflict { id: String, action: String },

    /// An error occurred while running a git command.
    #[error("Git command failed in {}: {command} - {stderr}", path.display())]
    GitCommand {
        command: String,
        path: PathBuf,
        stderr: String,
    },

    /// A config set could not be created, found or scanned.
    #[error("Config set error: {message}")]
    ConfigSet { message: String },

    /// The `.layercfg.yaml` settings file is invalid.
    #[error("Configuration parsing error: {message}{}", hint.as_ref().map(|h| format!("\n  hint: {}", h)).unwrap_or_default())]
    ConfigParse {
        message: String,
        /// Optional hint for how to fix the configuration issue
        hint: Option<String>,
    },

    /// An error occurred with a filesystem capability operation.
    #[error("Filesystem operation error: {message}")]
    Filesystem { message: String },

    /// Another build already holds the workspace lock.
    #[error("Build lock held by another process: {}", path.display())]
    LockHeld { path: PathBuf },

    /// The operation was cancelled between two phases.
    #[error("Operation cancelled before phase '{phase}'")]
    Cancelled { phase: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A JSON serialization error, wrapped from `serde_json::Error`.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A regular expression error, wrapped from `regex::Error`.
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_circular_reference() {
        let error = Error::CircularReference {
            id: "demo.models.base".to_string(),
        };
        assert_eq!(format!("{}", error), "Circular reference: demo.models.base");
    }

    #[test]
    fn test_error_display_unresolved_reference() {
        let error = Error::UnresolvedReference {
            id: "demo.schemas.missing".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Unresolved reference: demo.schemas.missing"
        );
    }

    #[test]
    fn test_error_display_invalid_identifier() {
        let error = Error::InvalidIdentifier {
            id: "a.b".to_string(),
            message: "expected 3 or 4 segments".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Invalid resource identifier 'a.b'"));
        assert!(display.contains("expected 3 or 4 segments"));
    }

    #[test]
    fn test_error_display_not_found() {
        let error = Error::NotFound {
            path: PathBuf::from("/tmp/demo/models/x.json"),
        };
        assert!(format!("{}", error).contains("/tmp/demo/models/x.json"));
    }

    #[test]
    fn test_error_display_versioning_conflict() {
        let error = Error::VersioningConflict {
            id: "demo.models.base".to_string(),
            action: "would create version 2".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Versioning conflict for demo.models.base"));
        assert!(display.contains("would create version 2"));
    }

    #[test]
    fn test_error_display_git_command() {
        let error = Error::GitCommand {
            command: "status --porcelain".to_string(),
            path: PathBuf::from("/repo"),
            stderr: "fatal: not a git repository".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Git command failed in /repo"));
        assert!(display.contains("status --porcelain"));
        assert!(display.contains("not a git repository"));
    }

    #[test]
    fn test_error_config_parse_with_hint() {
        let error = Error::ConfigParse {
            message: "unknown field `excludes`".to_string(),
            hint: Some("Did you mean `exclude`?".to_string()),
        };
        let display = format!("{}", error);
        assert!(display.contains("Configuration parsing error"));
        assert!(display.contains("hint:"));
    }

    #[test]
    fn test_error_from_io_error() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "File not found");
        let error: Error = io_error.into();
        let display = format!("{}", error);
        assert!(display.contains("I/O error"));
        assert!(display.contains("File not found"));
    }

    #[test]
    fn test_error_from_json_error() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: Error = json_error.into();
        assert!(format!("{}", error).contains("JSON error"));
    }

    #[test]
    fn test_error_from_yaml_error() {
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>("invalid: [unclosed").unwrap_err();
        let error: Error = yaml_error.into();
        assert!(format!("{}", error).contains("YAML parsing error"));
    }

    #[test]
    fn test_error_from_regex_error() {
        let regex_error = regex::Error::Syntax("Invalid regex".to_string());
        let error: Error = regex_error.into();
        assert!(format!("{}", error).contains("Regex error"));
    }

    #[test]
    fn test_error_cancelled() {
        let error = Error::Cancelled {
            phase: "build".to_string(),
        };
        assert_eq!(
            format!("{}", error),
            "Operation cancelled before phase 'build'"
        );
    }
}
