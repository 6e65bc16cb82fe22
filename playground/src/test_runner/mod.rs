//! Test discovery and execution against the shared session.
//!
//! A run goes through the same steps for both conventions:
//! 1. Validate the source (invalid sources never reach the backend)
//! 2. Install the `_pg_` harness and define the user's code
//! 3. Discover test handles with the convention's strategy
//! 4. Execute them and decode the harness' JSON back into a summary
//!
//! Every backend call in one run draws from a single batch deadline.

mod simple;
mod structured;

pub use simple::SimpleStrategy;
pub use structured::StructuredStrategy;

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{is_timeout, timed_out, ExecutionBackend};
use crate::error::BackendError;
use crate::protocol::{Convention, ExecutionResult, TestHandle, TestRunSummary, ValidationReport};
use crate::validation::{validate_test_code, ValidationLimits};

/// Python helpers shared by both strategies
pub const HARNESS_SOURCE: &str = include_str!("harness.py");

/// Default deadline for a whole test batch
pub const DEFAULT_BATCH_TIMEOUT: Duration = Duration::from_secs(30);

/// A completed run: the summary plus everything the code printed
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestRun {
    pub convention: Convention,
    pub summary: TestRunSummary,
    pub output: String,
}

/// What a test run produced. Only an unavailable runtime is an `Err`.
#[derive(Debug, Clone, PartialEq)]
pub enum TestRunOutcome {
    Completed(TestRun),
    /// The source was rejected before anything executed
    Invalid(ValidationReport),
    /// The backend reported `success == false` outside of a single test
    ExecutionFailed { error: String, output: String },
    /// The backend succeeded but its value was not a well-formed summary
    DecodeFailed { error: String, output: String },
}

/// Why a batch stopped early
#[derive(Debug, Error)]
pub enum BatchError {
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("{0}")]
    Execution(String),
    #[error("{0}")]
    Decode(String),
}

/// Backend access for one batch: shared deadline and accumulated output
pub struct BatchContext<'a> {
    backend: &'a dyn ExecutionBackend,
    timeout: Duration,
    deadline: Instant,
    output: String,
}

impl<'a> BatchContext<'a> {
    pub fn new(backend: &'a dyn ExecutionBackend, timeout: Duration) -> Self {
        Self {
            backend,
            timeout,
            deadline: Instant::now() + timeout,
            output: String::new(),
        }
    }

    /// Execute with whatever time is left in the batch.
    ///
    /// Python-level failures come back as data; running past the deadline
    /// is a `BatchError::Execution`.
    pub async fn execute(&mut self, source: &str) -> Result<ExecutionResult, BatchError> {
        let remaining = self.deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(BatchError::Execution(timed_out(self.timeout).error_text().to_string()));
        }

        let result = self.backend.execute(source, remaining).await?;
        self.output.push_str(&result.output);

        if is_timeout(&result) {
            warn!(timeout_ms = self.timeout.as_millis() as u64, "test batch timed out");
            return Err(BatchError::Execution(timed_out(self.timeout).error_text().to_string()));
        }
        Ok(result)
    }

    /// Execute and treat any Python-level failure as fatal for the batch
    pub async fn execute_checked(&mut self, source: &str) -> Result<ExecutionResult, BatchError> {
        let result = self.execute(source).await?;
        if !result.success {
            return Err(BatchError::Execution(result.error_text().to_string()));
        }
        Ok(result)
    }

    /// Evaluate a harness call and return its string value
    pub async fn evaluate(&mut self, call: &str) -> Result<String, BatchError> {
        let result = self.execute_checked(call).await?;
        result
            .result
            .ok_or_else(|| BatchError::Decode("Could not parse test results: harness returned no value".to_string()))
    }
}

/// One discovery convention
#[async_trait]
pub trait TestStrategy: Send + Sync {
    fn convention(&self) -> Convention;

    /// Message reported when discovery finds nothing
    fn empty_message(&self) -> &'static str;

    /// Run the user's source so its tests exist in the session
    async fn define(&self, ctx: &mut BatchContext<'_>, source: &str) -> Result<(), BatchError> {
        ctx.execute_checked(source).await.map(|_| ())
    }

    /// Enumerate tests defined in the session, in definition order
    async fn discover(&self, ctx: &mut BatchContext<'_>) -> Result<Vec<TestHandle>, BatchError>;

    /// Run the discovered tests and build the summary
    async fn execute(
        &self,
        ctx: &mut BatchContext<'_>,
        handles: &[TestHandle],
    ) -> Result<TestRunSummary, BatchError>;
}

/// Decode a JSON list of names produced by a `_pg_discover_*` helper
pub(crate) fn decode_handles(raw: &str) -> Result<Vec<TestHandle>, BatchError> {
    serde_json::from_str(raw)
        .map_err(|e| BatchError::Decode(format!("Could not parse test results: {}", e)))
}

/// Python string literal for a test name
pub(crate) fn python_literal(text: &str) -> String {
    serde_json::to_string(text).unwrap_or_else(|_| "''".to_string())
}

pub fn strategy_for(convention: Convention) -> Box<dyn TestStrategy> {
    match convention {
        Convention::Simple => Box::new(SimpleStrategy),
        Convention::Structured => Box::new(StructuredStrategy),
    }
}

/// Drives test runs against a shared backend
#[derive(Clone)]
pub struct TestRunner {
    backend: Arc<dyn ExecutionBackend>,
    limits: ValidationLimits,
    batch_timeout: Duration,
}

impl TestRunner {
    pub fn new(backend: Arc<dyn ExecutionBackend>) -> Self {
        Self {
            backend,
            limits: ValidationLimits::default(),
            batch_timeout: DEFAULT_BATCH_TIMEOUT,
        }
    }

    pub fn with_limits(mut self, limits: ValidationLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_batch_timeout(mut self, batch_timeout: Duration) -> Self {
        self.batch_timeout = batch_timeout;
        self
    }

    pub async fn run(&self, source: &str) -> Result<TestRunOutcome, BackendError> {
        let report = validate_test_code(source, self.limits);
        if !report.valid {
            debug!(errors = ?report.errors, "test source rejected");
            return Ok(TestRunOutcome::Invalid(report));
        }

        let run_id = Uuid::new_v4();
        let strategy = strategy_for(report.convention());
        debug!(%run_id, convention = ?strategy.convention(), "test run started");
        let mut ctx = BatchContext::new(self.backend.as_ref(), self.batch_timeout);

        match run_batch(strategy.as_ref(), &mut ctx, source).await {
            Ok(summary) => {
                info!(
                    %run_id,
                    convention = ?strategy.convention(),
                    total = summary.total,
                    passed = summary.passed,
                    "test run finished"
                );
                Ok(TestRunOutcome::Completed(TestRun {
                    convention: strategy.convention(),
                    summary,
                    output: ctx.output,
                }))
            }
            Err(BatchError::Backend(e)) => Err(e),
            Err(BatchError::Execution(error)) => Ok(TestRunOutcome::ExecutionFailed {
                error,
                output: ctx.output,
            }),
            Err(BatchError::Decode(error)) => {
                warn!(%run_id, %error, "test results could not be decoded");
                Ok(TestRunOutcome::DecodeFailed {
                    error,
                    output: ctx.output,
                })
            }
        }
    }
}

async fn run_batch(
    strategy: &dyn TestStrategy,
    ctx: &mut BatchContext<'_>,
    source: &str,
) -> Result<TestRunSummary, BatchError> {
    ctx.execute_checked(HARNESS_SOURCE).await?;
    strategy.define(ctx, source).await?;

    let handles = strategy.discover(ctx).await?;
    debug!(count = handles.len(), convention = ?strategy.convention(), "tests discovered");
    if handles.is_empty() {
        return Ok(TestRunSummary::no_tests(
            strategy.convention(),
            strategy.empty_message(),
        ));
    }

    strategy.execute(ctx, &handles).await
}
