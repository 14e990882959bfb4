//! # Terminal Output
//!
//! Helpers for printing command results: status markers and diagnostics,
//! colored only when the user and the terminal allow it.
//!
//! ## Respecting User Preferences
//!
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals

use std::env;

use console::style;

use crate::context::{Severity, ValidationError};

/// Whether output may use color and symbols.
#[derive(Debug, Clone)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    /// Resolve the `--color` flag against the environment.
    ///
    /// `always` and `never` win outright. Anything else detects support:
    /// `NO_COLOR`, `CLICOLOR=0` and `TERM=dumb` disable color,
    /// `CLICOLOR_FORCE` enables it, and otherwise stdout decides.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };
        Self { use_color }
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }
        console::Term::stdout().features().colors_supported()
    }

    #[cfg(test)]
    pub fn with_color() -> Self {
        Self { use_color: true }
    }

    #[cfg(test)]
    pub fn without_color() -> Self {
        Self { use_color: false }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Status shown in front of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    Ok,
    Error,
    Warning,
    Info,
}

/// The prefix for `marker`: a colored symbol, or a bracketed word without color.
pub fn marker(config: &OutputConfig, marker: Marker) -> String {
    if !config.use_color {
        return match marker {
            Marker::Ok => "[OK]",
            Marker::Error => "[ERR]",
            Marker::Warning => "[WARN]",
            Marker::Info => "[INFO]",
        }
        .to_string();
    }
    match marker {
        Marker::Ok => style("✔").green().to_string(),
        Marker::Error => style("✖").red().to_string(),
        Marker::Warning => style("⚠").yellow().to_string(),
        Marker::Info => style("ℹ").cyan().to_string(),
    }
}

/// `path:line:col: message`, with the location dimmed when colored.
pub fn format_diagnostic(config: &OutputConfig, error: &ValidationError) -> String {
    let location = format!(
        "{}:{}:{}:",
        error.file_path.display(),
        error.line,
        error.column
    );
    if !config.use_color {
        return format!("{} {}", location, error.message);
    }

    let message = match error.severity {
        Severity::Error => style(&error.message).red(),
        Severity::Warning => style(&error.message).yellow(),
    };
    format!("{} {}", style(location).bold(), message)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ErrorKind;

    #[test]
    fn test_color_flags() {
        assert!(OutputConfig::from_env_and_flag("always").use_color);
        assert!(!OutputConfig::from_env_and_flag("never").use_color);
        assert!(OutputConfig::from_env_and_flag("ALWAYS").use_color);
    }

    #[test]
    fn test_plain_markers() {
        let config = OutputConfig::without_color();
        assert_eq!(marker(&config, Marker::Ok), "[OK]");
        assert_eq!(marker(&config, Marker::Error), "[ERR]");
    }

    #[test]
    fn test_colored_marker_contains_symbol() {
        let config = OutputConfig::with_color();
        assert!(marker(&config, Marker::Ok).contains('✔'));
    }

    mod env_tests {
        use super::*;
        use serial_test::serial;
        use std::env;

        const VARS: [&str; 4] = ["NO_COLOR", "CLICOLOR", "CLICOLOR_FORCE", "TERM"];

        /// Run `f` with exactly `vars` set among the color variables.
        fn with_env(vars: &[(&str, &str)], f: impl FnOnce()) {
            let saved: Vec<_> = VARS.iter().map(|k| (*k, env::var_os(k))).collect();
            VARS.iter().for_each(|k| env::remove_var(k));
            vars.iter().for_each(|(k, v)| env::set_var(k, v));
            f();
            for (key, value) in saved {
                match value {
                    Some(value) => env::set_var(key, value),
                    None => env::remove_var(key),
                }
            }
        }

        #[test]
        #[serial]
        fn test_no_color_disables_auto() {
            with_env(&[("NO_COLOR", "1"), ("CLICOLOR_FORCE", "1")], || {
                assert!(!OutputConfig::from_env_and_flag("auto").use_color);
                assert!(OutputConfig::from_env_and_flag("always").use_color);
            });
        }

        #[test]
        #[serial]
        fn test_clicolor_force_enables_auto() {
            with_env(&[("CLICOLOR_FORCE", "1")], || {
                assert!(OutputConfig::from_env_and_flag("auto").use_color);
                assert!(!OutputConfig::from_env_and_flag("never").use_color);
            });
        }

        #[test]
        #[serial]
        fn test_dumb_terminal_disables_auto() {
            with_env(&[("TERM", "dumb")], || {
                assert!(!OutputConfig::default().use_color);
            });
        }
    }

    #[test]
    fn test_plain_diagnostic() {
        let mut error = ValidationError::new(ErrorKind::Parse, "/cs/models/m.json", "JSON parsing error");
        error.line = 3;
        error.column = 7;
        assert_eq!(
            format_diagnostic(&OutputConfig::without_color(), &error),
            "/cs/models/m.json:3:7: JSON parsing error"
        );
    }
}
