//! # CLI Command Implementations
//!
//! Each subcommand of `layercfg` lives in its own file with:
//! - an `Args` struct derived with `clap`, when the command takes arguments;
//! - an `execute` function that opens a [`Manager`] on the workspace root,
//!   calls into the library and prints the outcome.
//!
//! Commands that run pipelines print every diagnostic as
//! `path:line:col: message` and fail when any remain.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};

use layercfg::filesystem::DiskFileSystem;
use layercfg::git::GitCli;
use layercfg::manager::{Manager, PipelineResults};
use layercfg::output::{format_diagnostic, marker, Marker, OutputConfig};

pub mod build_all;
pub mod completions;
pub mod create_configset;
pub mod create_resource;
pub mod get_configsets;
pub mod init_demo;
pub mod validate_all;

/// A manager over the real disk and the `git` binary.
pub(crate) fn open_manager(root: &Path) -> Result<Manager> {
    let root = root
        .canonicalize()
        .with_context(|| format!("Workspace root not found: {}", root.display()))?;
    Manager::new(&root, Arc::new(DiskFileSystem), Arc::new(GitCli))
        .with_context(|| format!("Failed to open workspace at {}", root.display()))
}

/// Print every diagnostic, then a summary. Fails when any diagnostic exists.
pub(crate) fn report(out: &OutputConfig, results: &PipelineResults, action: &str) -> Result<()> {
    let errors = results.errors();
    for error in &errors {
        println!("{}", format_diagnostic(out, error));
    }

    if errors.is_empty() {
        println!(
            "{} {} {} document(s)",
            marker(out, Marker::Ok),
            action,
            results.results.len()
        );
        return Ok(());
    }

    let failed = results.results.iter().filter(|r| !r.success).count();
    println!(
        "{} {} problem(s) in {} of {} document(s)",
        marker(out, Marker::Error),
        errors.len(),
        failed,
        results.results.len()
    );
    anyhow::bail!("{} failed with {} problem(s)", action, errors.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use layercfg::context::{ErrorKind, ValidationError};
    use layercfg::manager::PipelineResult;
    use tempfile::TempDir;

    fn results(errors: Vec<ValidationError>) -> PipelineResults {
        PipelineResults {
            has_errors: !errors.is_empty(),
            results: vec![PipelineResult {
                model_id: "cs.models.m".to_string(),
                success: errors.is_empty(),
                errors,
            }],
        }
    }

    #[test]
    fn test_report_clean_run() {
        let out = OutputConfig::from_env_and_flag("never");
        assert!(report(&out, &results(Vec::new()), "Validated").is_ok());
    }

    #[test]
    fn test_report_fails_on_diagnostics() {
        let out = OutputConfig::from_env_and_flag("never");
        let error = ValidationError::new(ErrorKind::Structural, "/cs/models/m.json", "bad");
        let err = report(&out, &results(vec![error]), "Validated").unwrap_err();
        assert_eq!(err.to_string(), "Validated failed with 1 problem(s)");
    }

    #[test]
    fn test_open_manager_requires_existing_root() {
        let temp = TempDir::new().unwrap();
        assert!(open_manager(temp.path()).is_ok());
        assert!(open_manager(&temp.path().join("missing")).is_err());
    }

    #[test]
    fn test_scaffold_then_build_through_commands() {
        let temp = TempDir::new().unwrap();
        init_demo::execute(temp.path(), "never").unwrap();
        create_configset::execute(
            create_configset::CreateConfigsetArgs {
                name: "extra".to_string(),
            },
            temp.path(),
            "never",
        )
        .unwrap();
        create_resource::execute(
            create_resource::CreateResourceArgs {
                configset: "extra".to_string(),
                name: "m".to_string(),
            },
            layercfg::identifier::Category::Models,
            temp.path(),
            "never",
        )
        .unwrap();

        validate_all::execute(temp.path(), "never").unwrap();
        build_all::execute(build_all::BuildAllArgs { strict: false }, temp.path(), "never").unwrap();
        build_all::execute(build_all::BuildAllArgs { strict: true }, temp.path(), "never").unwrap();
        assert!(temp.path().join("extra/instances/m.json").exists());
        assert!(temp
            .path()
            .join("demo-configset/instances/extended-model.json")
            .exists());
    }
}
