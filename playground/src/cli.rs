//! Command-line argument parsing and launch configuration.
//!
//! This module handles CLI argument parsing using clap, and applies
//! launch-time overrides to the persisted settings.

use crate::settings::PlaygroundSettings;
use clap::{Parser, Subcommand};
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};

/// CLI arguments for python-playground
#[derive(Parser, Debug, Clone)]
#[command(
    name = "python-playground",
    about = "Run, test, and share Python snippets in an embedded interpreter"
)]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Read settings from this file instead of ~/.python-playground/config.json
    #[arg(long, global = true, value_name = "PATH", env = "PLAYGROUND_CONFIG")]
    pub config_path: Option<PathBuf>,
    /// Timeout for a plain run, in milliseconds
    #[arg(long, global = true, value_name = "MS", env = "PLAYGROUND_RUN_TIMEOUT_MS")]
    pub run_timeout_ms: Option<u64>,
    /// Deadline for a whole test batch, in milliseconds
    #[arg(long, global = true, value_name = "MS", env = "PLAYGROUND_TEST_TIMEOUT_MS")]
    pub test_timeout_ms: Option<u64>,
    /// Timeout for each REPL entry, in milliseconds
    #[arg(long, global = true, value_name = "MS", env = "PLAYGROUND_REPL_TIMEOUT_MS")]
    pub repl_timeout_ms: Option<u64>,
    /// Reject sources longer than this many characters
    #[arg(long, global = true, value_name = "CHARS", env = "PLAYGROUND_MAX_SOURCE_CHARS")]
    pub max_source_chars: Option<usize>,
    /// Truncate run output after this many characters
    #[arg(long, global = true, value_name = "CHARS", env = "PLAYGROUND_MAX_OUTPUT_CHARS")]
    pub max_output_chars: Option<usize>,
    /// Global names kept across a session reset (comma-separated)
    #[arg(
        long = "preserve",
        global = true,
        value_delimiter = ',',
        value_name = "NAME[,NAME...]",
        env = "PLAYGROUND_PRESERVED_BINDINGS"
    )]
    pub preserved_bindings: Option<Vec<String>>,
    /// Page that share links point to
    #[arg(long, global = true, value_name = "URL", env = "PLAYGROUND_SHARE_BASE_URL")]
    pub share_base_url: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Execute code and print its output and last expression value
    Run {
        /// Code, @path/to/file.py, or @- for stdin
        #[arg(value_name = "CODE_OR_@FILE")]
        source: String,
    },
    /// Discover and run the tests defined in the code
    Test {
        #[arg(value_name = "CODE_OR_@FILE")]
        source: String,
        /// Print the raw result JSON instead of the formatted report
        #[arg(long)]
        json: bool,
    },
    /// Check code without executing it
    Validate {
        #[arg(value_name = "CODE_OR_@FILE")]
        source: String,
        /// Apply the test-run checks as well
        #[arg(long)]
        tests: bool,
    },
    /// Print a share link for the code
    Share {
        #[arg(value_name = "CODE_OR_@FILE")]
        source: String,
    },
    /// Print the code carried by a share link
    Open {
        /// Full link, query string, or bare `code` value
        link: String,
        /// Execute the decoded code instead of printing it
        #[arg(long)]
        run: bool,
    },
    /// Interactive session
    Repl,
    /// Print the effective settings
    Config {
        /// Persist the effective settings to the config file
        #[arg(long)]
        save: bool,
    },
}

/// Read a value that may be a literal string, a @path reference to a file,
/// or `@-` for standard input
pub fn read_value_or_file(raw: &str) -> Result<String, String> {
    match raw.strip_prefix('@') {
        Some("-") => {
            let mut contents = String::new();
            std::io::stdin()
                .read_to_string(&mut contents)
                .map_err(|e| format!("Failed to read stdin: {}", e))?;
            Ok(contents)
        }
        Some(path) => fs::read_to_string(Path::new(path))
            .map_err(|e| format!("Failed to read {}: {}", path, e)),
        None => Ok(raw.to_string()),
    }
}

/// Apply CLI overrides to settings without persisting them.
pub fn apply_cli_overrides(args: &CliArgs, settings: &mut PlaygroundSettings) {
    if let Some(v) = args.run_timeout_ms {
        settings.run_timeout_ms = v;
    }
    if let Some(v) = args.test_timeout_ms {
        settings.test_timeout_ms = v;
    }
    if let Some(v) = args.repl_timeout_ms {
        settings.repl_timeout_ms = v;
    }
    if let Some(v) = args.max_source_chars {
        settings.max_source_chars = v;
    }
    if let Some(v) = args.max_output_chars {
        settings.max_output_chars = v;
    }
    if let Some(names) = &args.preserved_bindings {
        settings.preserved_bindings = names
            .iter()
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
    }
    if let Some(url) = &args.share_base_url {
        settings.share_base_url = url.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(args).expect("arguments should parse")
    }

    #[test]
    fn test_subcommands_parse() {
        let args = parse(&["python-playground", "test", "@tests.py", "--json"]);
        assert!(matches!(args.command, Command::Test { ref source, json: true } if source == "@tests.py"));

        let args = parse(&["python-playground", "open", "?code=abc", "--run"]);
        assert!(matches!(args.command, Command::Open { run: true, .. }));

        let args = parse(&["python-playground", "validate", "print(1)", "--tests"]);
        assert!(matches!(args.command, Command::Validate { tests: true, .. }));
    }

    #[test]
    fn test_overrides_apply_on_top_of_settings() {
        let args = parse(&[
            "python-playground",
            "--run-timeout-ms",
            "5000",
            "--preserve",
            "sys, math",
            "run",
            "print(1)",
        ]);
        let mut settings = PlaygroundSettings::default();
        apply_cli_overrides(&args, &mut settings);

        assert_eq!(settings.run_timeout_ms, 5000);
        assert_eq!(settings.test_timeout_ms, 30_000);
        assert_eq!(settings.preserved_bindings, vec!["sys".to_string(), "math".to_string()]);
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let args = parse(&["python-playground", "run", "print(1)", "--max-output-chars", "20"]);
        assert_eq!(args.max_output_chars, Some(20));
    }

    #[test]
    fn test_read_value_or_file() {
        assert_eq!(read_value_or_file("print(1)").unwrap(), "print(1)");

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "x = 42\n").unwrap();
        let reference = format!("@{}", file.path().display());
        assert_eq!(read_value_or_file(&reference).unwrap(), "x = 42\n");

        assert!(read_value_or_file("@/definitely/not/here.py").is_err());
    }
}
