//! The execution backend contract.
//!
//! The test runner and code runner only ever talk to Python through this
//! trait, so the sharing of interpreter state is visible in the signature:
//! every call goes to the same session until `reset` is called.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::BackendError;
use crate::protocol::ExecutionResult;

#[async_trait]
pub trait ExecutionBackend: Send + Sync {
    /// Execute source against the shared session.
    ///
    /// Python-level failures and timeouts come back as `Ok` with
    /// `success == false`; `Err` means the runtime itself is unavailable.
    async fn execute(&self, source: &str, timeout: Duration) -> Result<ExecutionResult, BackendError>;

    /// Clear user bindings, keeping the system allow-list
    async fn reset(&self) -> Result<(), BackendError>;

    async fn is_alive(&self) -> bool;
}

/// Prefix of the error text for executions that ran out of time
pub const TIMEOUT_PREFIX: &str = "Timeout:";

pub fn is_timeout(result: &ExecutionResult) -> bool {
    result
        .error
        .as_deref()
        .map(|e| e.starts_with(TIMEOUT_PREFIX))
        .unwrap_or(false)
}

/// Result reported when the caller stopped waiting for an execution
pub fn timed_out(timeout: Duration) -> ExecutionResult {
    ExecutionResult::failed(
        String::new(),
        format!(
            "{} execution exceeded {}s; the Python session was restarted",
            TIMEOUT_PREFIX,
            format_seconds(timeout)
        ),
    )
}

fn format_seconds(timeout: Duration) -> String {
    let secs = timeout.as_secs_f64();
    if secs.fract() == 0.0 {
        format!("{}", secs as u64)
    } else {
        format!("{:.1}", secs)
    }
}
