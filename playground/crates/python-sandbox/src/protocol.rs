//! Protocol types for host-session communication
//!
//! These types define the JSON-compatible contract between the host and the
//! persistent Python session.

use serde::{Deserialize, Serialize};

/// Names that survive a session reset unless configured otherwise
pub const DEFAULT_PRESERVED_BINDINGS: &[&str] = &["sys"];

/// Configuration for a persistent Python session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Global bindings kept by `reset()` in addition to `_`-prefixed names
    pub preserved_bindings: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            preserved_bindings: DEFAULT_PRESERVED_BINDINGS
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Result of executing one source text in the session
///
/// Exactly one of `success == true` or `error.is_some()` holds; use the
/// constructors rather than building the struct by hand.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    /// Whether the source ran to completion
    pub success: bool,
    /// Captured stdout followed by captured stderr
    pub output: String,
    /// Serialized value of the trailing expression statement (if any)
    pub result: Option<String>,
    /// Traceback or failure description
    pub error: Option<String>,
    /// Wall-clock time spent in the interpreter
    #[serde(default)]
    pub duration_ms: u64,
}

impl ExecutionResult {
    /// Create a result for a source text that ran to completion
    pub fn completed(output: impl Into<String>, result: Option<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
            result,
            error: None,
            duration_ms: 0,
        }
    }

    /// Create a result indicating an error
    pub fn failed(output: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
            result: None,
            error: Some(error.into()),
            duration_ms: 0,
        }
    }

    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Error text, or an empty string for successful results
    pub fn error_text(&self) -> &str {
        self.error.as_deref().unwrap_or_default()
    }
}
