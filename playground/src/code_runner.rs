//! Plain runs of user code against the shared session.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::backend::ExecutionBackend;
use crate::error::BackendError;
use crate::protocol::{ExecutionResult, ValidationReport};
use crate::validation::{validate_code, ValidationLimits};

pub const DEFAULT_RUN_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_OUTPUT_CHARS: usize = 10_000;
pub const TRUNCATION_MARKER: &str = "\n\n[... output truncated ...]";

#[derive(Debug, Clone, PartialEq)]
pub enum CodeRunOutcome {
    /// Validation failed; nothing was executed
    Invalid(ValidationReport),
    Executed {
        warnings: Vec<String>,
        result: ExecutionResult,
    },
}

/// Keep at most `max_chars` characters, marking the cut
pub fn limit_output(output: &str, max_chars: usize) -> String {
    match output.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{}", &output[..cut], TRUNCATION_MARKER),
        None => output.to_string(),
    }
}

#[derive(Clone)]
pub struct CodeRunner {
    backend: Arc<dyn ExecutionBackend>,
    limits: ValidationLimits,
    timeout: Duration,
    max_output_chars: usize,
}

impl CodeRunner {
    pub fn new(backend: Arc<dyn ExecutionBackend>) -> Self {
        Self {
            backend,
            limits: ValidationLimits::default(),
            timeout: DEFAULT_RUN_TIMEOUT,
            max_output_chars: DEFAULT_MAX_OUTPUT_CHARS,
        }
    }

    pub fn with_limits(mut self, limits: ValidationLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_output_chars(mut self, max_output_chars: usize) -> Self {
        self.max_output_chars = max_output_chars;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn run(&self, source: &str) -> Result<CodeRunOutcome, BackendError> {
        let report = validate_code(source, self.limits);
        if !report.valid {
            return Ok(CodeRunOutcome::Invalid(report));
        }

        let mut result = self.backend.execute(source, self.timeout).await?;
        result.output = limit_output(&result.output, self.max_output_chars);
        debug!(
            success = result.success,
            duration_ms = result.duration_ms,
            "code run finished"
        );

        Ok(CodeRunOutcome::Executed {
            warnings: report.warnings,
            result,
        })
    }

    /// Clear user bindings. Callers must not overlap this with a run.
    pub async fn reset(&self) -> Result<(), BackendError> {
        self.backend.reset().await?;
        info!("session reset");
        Ok(())
    }
}
