//! CLI argument parsing and command dispatch

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// layercfg - Build, validate and version layered JSON config sets
#[derive(Parser, Debug)]
#[command(name = "layercfg")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Workspace root searched for config sets
    #[arg(
        long,
        global = true,
        value_name = "DIR",
        env = "LAYERCFG_ROOT",
        default_value = "."
    )]
    root: PathBuf,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(
        long,
        global = true,
        value_name = "LEVEL",
        env = "LAYERCFG_LOG_LEVEL",
        default_value = "info"
    )]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a new config set under the workspace root
    CreateConfigset(commands::create_configset::CreateConfigsetArgs),

    /// List the config sets found under a directory
    GetConfigsets(commands::get_configsets::GetConfigsetsArgs),

    /// Add an empty schema to a config set
    CreateSchema(commands::create_resource::CreateResourceArgs),

    /// Add an empty model to a config set
    CreateModel(commands::create_resource::CreateResourceArgs),

    /// Validate and build every model without writing anything
    ValidateAll,

    /// Build every model and write versioned output
    BuildAll(commands::build_all::BuildAllArgs),

    /// Fail if building would change any file (for CI)
    VerifyBuild,

    /// Write a small demo config set to start from
    InitDemo,

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);

        let root = self.root;
        let color = self.color.as_str();
        match self.command {
            Commands::CreateConfigset(args) => commands::create_configset::execute(args, &root, color),
            Commands::GetConfigsets(args) => commands::get_configsets::execute(args, &root, color),
            Commands::CreateSchema(args) => {
                commands::create_resource::execute(args, layercfg::identifier::Category::Schemas, &root, color)
            }
            Commands::CreateModel(args) => {
                commands::create_resource::execute(args, layercfg::identifier::Category::Models, &root, color)
            }
            Commands::ValidateAll => commands::validate_all::execute(&root, color),
            Commands::BuildAll(args) => commands::build_all::execute(args, &root, color),
            Commands::VerifyBuild => commands::build_all::execute(
                commands::build_all::BuildAllArgs { strict: true },
                &root,
                color,
            ),
            Commands::InitDemo => commands::init_demo::execute(&root, color),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}

/// Route `log` records to stderr at `level`. `RUST_LOG` refines it when set.
fn init_logging(level: &str) {
    let mut builder = env_logger::Builder::new();
    builder
        .parse_filters(level)
        .format_timestamp(None)
        .format_target(false);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verify_build_takes_no_strict_flag() {
        assert!(Cli::try_parse_from(["layercfg", "verify-build"]).is_ok());
        assert!(Cli::try_parse_from(["layercfg", "verify-build", "--strict"]).is_err());
        assert!(Cli::try_parse_from(["layercfg", "build-all", "--strict"]).is_ok());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["layercfg", "validate-all", "--root", "/tmp/ws", "--color", "never"])
            .unwrap();
        assert_eq!(cli.root, PathBuf::from("/tmp/ws"));
        assert_eq!(cli.color, "never");
    }
}
