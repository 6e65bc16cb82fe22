//! Interactive loop against the shared session.
//!
//! Lines starting with `:` are meta-commands. A first line ending with `:`
//! opens a block that continues until a blank line.

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tracing::debug;

use crate::app_state::AppState;
use crate::backend::ExecutionBackend;

use super::{CommandOutput, ExitStatus};

pub const PROMPT: &str = ">>> ";
pub const CONTINUATION_PROMPT: &str = "... ";

const HELP_TEXT: &str = "Commands:
  :reset    Clear all user variables from the session
  :history  Show the entries run so far
  :help     Show this help
  :quit     Leave the REPL (also :exit)

Run any Python code:
  >>> 2 + 2
  >>> import math; math.pi
  >>> [x**2 for x in range(10)]";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaCommand {
    Reset,
    History,
    Help,
    Quit,
    Unknown(String),
}

impl MetaCommand {
    fn parse(name: &str) -> Self {
        match name {
            "reset" => MetaCommand::Reset,
            "history" => MetaCommand::History,
            "help" => MetaCommand::Help,
            "quit" | "exit" => MetaCommand::Quit,
            other => MetaCommand::Unknown(other.to_string()),
        }
    }
}

/// What one input line amounts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplInput {
    Empty,
    /// Inside a block; more lines are needed
    Pending,
    Meta(MetaCommand),
    Source(String),
}

/// Collects block statements across lines
#[derive(Debug, Default)]
pub struct LineBuffer {
    lines: Vec<String>,
}

impl LineBuffer {
    pub fn is_pending(&self) -> bool {
        !self.lines.is_empty()
    }

    pub fn push(&mut self, line: &str) -> ReplInput {
        let line = line.trim_end_matches(['\r', '\n']);

        if self.is_pending() {
            if line.trim().is_empty() {
                let source = self.lines.join("\n");
                self.lines.clear();
                return ReplInput::Source(source);
            }
            self.lines.push(line.to_string());
            return ReplInput::Pending;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            return ReplInput::Empty;
        }
        if let Some(name) = trimmed.strip_prefix(':') {
            return ReplInput::Meta(MetaCommand::parse(name.trim()));
        }
        if trimmed.ends_with(':') {
            self.lines.push(line.to_string());
            return ReplInput::Pending;
        }
        ReplInput::Source(line.to_string())
    }
}

/// Result of feeding one line to the REPL
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplStep {
    Output(CommandOutput),
    Pending,
    Quit,
}

pub struct Repl {
    backend: Arc<dyn ExecutionBackend>,
    timeout: Duration,
    buffer: LineBuffer,
    history: Vec<String>,
}

impl Repl {
    pub fn new(backend: Arc<dyn ExecutionBackend>, timeout: Duration) -> Self {
        Self {
            backend,
            timeout,
            buffer: LineBuffer::default(),
            history: Vec::new(),
        }
    }

    pub fn prompt(&self) -> &'static str {
        if self.buffer.is_pending() {
            CONTINUATION_PROMPT
        } else {
            PROMPT
        }
    }

    pub async fn handle_line(&mut self, line: &str) -> Result<ReplStep, String> {
        let mut out = CommandOutput::default();

        match self.buffer.push(line) {
            ReplInput::Empty => {}
            ReplInput::Pending => return Ok(ReplStep::Pending),
            ReplInput::Meta(MetaCommand::Quit) => return Ok(ReplStep::Quit),
            ReplInput::Meta(MetaCommand::Help) => out.push_stdout(HELP_TEXT),
            ReplInput::Meta(MetaCommand::History) => {
                for (i, entry) in self.history.iter().enumerate() {
                    out.push_stdout(&format!("{}. {}", i + 1, entry));
                }
            }
            ReplInput::Meta(MetaCommand::Reset) => {
                self.backend.reset().await.map_err(|e| e.to_string())?;
                out.push_stdout("Session reset: all user variables cleared");
            }
            ReplInput::Meta(MetaCommand::Unknown(name)) => {
                out.push_stderr(&format!("Unknown command :{} (try :help)", name));
            }
            ReplInput::Source(source) => {
                debug!(lines = source.lines().count(), "repl entry");
                self.history.push(source.clone());
                let result = self
                    .backend
                    .execute(&source, self.timeout)
                    .await
                    .map_err(|e| e.to_string())?;

                out.push_stdout(&result.output);
                if result.success {
                    if let Some(value) = &result.result {
                        out.push_stdout(value);
                    }
                } else {
                    out.push_stderr(result.error_text());
                }
            }
        }

        Ok(ReplStep::Output(out))
    }
}

/// Feed lines from `reader` until end of input or `:quit`
pub async fn drive<R: AsyncBufRead + Unpin>(repl: &mut Repl, reader: R) -> Result<(), String> {
    let mut lines = reader.lines();
    loop {
        print!("{}", repl.prompt());
        std::io::stdout().flush().map_err(|e| e.to_string())?;

        let Some(line) = lines.next_line().await.map_err(|e| e.to_string())? else {
            println!();
            return Ok(());
        };

        match repl.handle_line(&line).await? {
            ReplStep::Output(out) => {
                out.emit();
            }
            ReplStep::Pending => {}
            ReplStep::Quit => return Ok(()),
        }
    }
}

pub async fn run_repl(app: &AppState) -> Result<ExitStatus, String> {
    eprintln!("Python playground. Type :help for commands, :quit to leave.");
    let mut repl = Repl::new(app.backend.clone(), app.settings.repl_timeout());
    drive(&mut repl, BufReader::new(tokio::io::stdin())).await?;
    Ok(ExitStatus::Success)
}
