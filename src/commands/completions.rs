//! # Completions Command Implementation
//!
//! Prints a completion script covering every `layercfg` subcommand and the
//! global `--root`, `--color` and `--log-level` flags.
//!
//! ```bash
//! layercfg completions bash > ~/.local/share/bash-completion/completions/layercfg
//! layercfg completions zsh > ~/.zfunc/_layercfg
//! ```

use std::io::{self, Write};

use anyhow::Result;
use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};

use crate::cli::Cli;

/// Generate shell completion scripts
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Execute the `completions` command.
pub fn execute(args: CompletionsArgs) -> Result<()> {
    write_script(args.shell, &mut io::stdout());
    Ok(())
}

/// Write the script for `shell`, named after the binary clap knows.
fn write_script(shell: Shell, out: &mut dyn Write) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, out);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn script(shell: Shell) -> String {
        let mut out = Vec::new();
        write_script(shell, &mut out);
        String::from_utf8(out).unwrap()
    }

    fn subcommands() -> Vec<String> {
        Cli::command()
            .get_subcommands()
            .map(|c| c.get_name().to_string())
            .filter(|name| name != "help")
            .collect()
    }

    #[test]
    fn test_every_shell_lists_every_subcommand() {
        for shell in [Shell::Bash, Shell::Zsh, Shell::Fish, Shell::PowerShell, Shell::Elvish] {
            let text = script(shell);
            for name in subcommands() {
                assert!(text.contains(&name), "{} script is missing {}", shell, name);
            }
        }
    }

    #[test]
    fn test_global_flags_are_completed() {
        let text = script(Shell::Bash);
        for flag in ["--root", "--color", "--log-level"] {
            assert!(text.contains(flag), "missing {}", flag);
        }
    }
}
