//! Command handlers for the CLI.
//!
//! This module organizes the subcommands by domain:
//! - `run`: plain execution (`run`, `open --run`)
//! - `test`: test discovery and execution
//! - `validate`: static checks without executing
//! - `share`: share link encoding and decoding
//! - `repl`: interactive session
//! - `config`: effective configuration
//!
//! Handlers build a `CommandOutput` instead of printing directly so the
//! rendering can be checked in tests.

pub mod config;
pub mod repl;
pub mod run;
pub mod share;
pub mod validate;

use std::process::ExitCode;

use crate::app_state::AppState;
use crate::cli::{read_value_or_file, CliArgs, Command};
use crate::protocol::ValidationReport;
use crate::settings::PlaygroundSettings;

/// Process exit status: 0 success, 1 execution or test failure, 2 invalid input
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExitStatus {
    #[default]
    Success,
    Failure,
    Invalid,
}

impl ExitStatus {
    pub fn code(self) -> u8 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failure => 1,
            ExitStatus::Invalid => 2,
        }
    }
}

impl From<ExitStatus> for ExitCode {
    fn from(status: ExitStatus) -> Self {
        ExitCode::from(status.code())
    }
}

/// What a command wants written to stdout and stderr
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    pub status: ExitStatus,
}

impl CommandOutput {
    pub fn emit(&self) -> ExitStatus {
        print!("{}", self.stdout);
        eprint!("{}", self.stderr);
        self.status
    }

    pub(crate) fn push_stdout(&mut self, text: &str) {
        push_line(&mut self.stdout, text);
    }

    pub(crate) fn push_stderr(&mut self, text: &str) {
        push_line(&mut self.stderr, text);
    }
}

fn push_line(buffer: &mut String, text: &str) {
    buffer.push_str(text);
    if !text.is_empty() && !text.ends_with('\n') {
        buffer.push('\n');
    }
}

/// Validation errors and warnings as shown before a run
pub(crate) fn render_report(report: &ValidationReport, out: &mut CommandOutput) {
    for error in &report.errors {
        out.push_stderr(&format!("❌ {}", error));
    }
    for warning in &report.warnings {
        out.push_stderr(&format!("⚠️ {}", warning));
    }
}

fn start_app(settings: PlaygroundSettings) -> Result<AppState, String> {
    AppState::start(settings).map_err(|e| e.to_string())
}

/// Execute the parsed command with the effective settings
pub async fn dispatch(args: &CliArgs, settings: PlaygroundSettings) -> Result<ExitStatus, String> {
    let status = match &args.command {
        Command::Run { source } => {
            let source = read_value_or_file(source)?;
            let app = start_app(settings)?;
            run::run_code(&app, &source).await?.emit()
        }
        Command::Test { source, json } => {
            let source = read_value_or_file(source)?;
            let app = start_app(settings)?;
            test::run_tests(&app, &source, *json).await?.emit()
        }
        Command::Validate { source, tests } => {
            let source = read_value_or_file(source)?;
            validate::validate(&settings, &source, *tests).emit()
        }
        Command::Share { source } => {
            let source = read_value_or_file(source)?;
            share::share(&settings, &source).emit()
        }
        Command::Open { link, run: execute } => {
            let link = read_value_or_file(link)?;
            match share::decode_link(&link) {
                Ok(source) if *execute => {
                    let app = start_app(settings)?;
                    run::run_code(&app, &source).await?.emit()
                }
                decoded => share::render_open(decoded).emit(),
            }
        }
        Command::Repl => {
            let app = start_app(settings)?;
            repl::run_repl(&app).await?
        }
        Command::Config { save } => {
            config::show_config(&settings, args.config_path.as_deref(), *save)
                .await?
                .emit()
        }
    };
    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_codes() {
        assert_eq!(ExitStatus::Success.code(), 0);
        assert_eq!(ExitStatus::Failure.code(), 1);
        assert_eq!(ExitStatus::Invalid.code(), 2);
    }

    #[test]
    fn test_push_line_terminates_lines() {
        let mut out = CommandOutput::default();
        out.push_stdout("one");
        out.push_stdout("two\n");
        out.push_stdout("");
        assert_eq!(out.stdout, "one\ntwo\n");
    }

    #[test]
    fn test_render_report() {
        let report = ValidationReport::from_findings(
            vec!["Code is empty".to_string()],
            vec!["Possible infinite loop".to_string()],
        );
        let mut out = CommandOutput::default();
        render_report(&report, &mut out);
        assert_eq!(out.stderr, "❌ Code is empty\n⚠️ Possible infinite loop\n");
    }
}
