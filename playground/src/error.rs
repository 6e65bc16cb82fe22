//! Error types shared across the playground.
//!
//! Expected outcomes of a run (invalid source, failing tests, undecodable
//! results) are modelled as outcome enums, not as these errors. The types
//! here cover conditions the caller cannot do anything about at the point
//! of the call.

use thiserror::Error;

/// The execution backend itself could not be reached
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Python session is unavailable: {0}")]
    Unavailable(String),

    #[error("failed to start Python session thread: {0}")]
    Spawn(#[from] std::io::Error),

    #[error("session reset failed: {0}")]
    Reset(String),
}

/// Loading, validating, or saving settings failed
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to access config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to serialize settings: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("invalid preserved binding: {0}")]
    InvalidBinding(String),

    #[error("{field} must be greater than zero")]
    ZeroLimit { field: &'static str },
}

/// A share link could not be decoded
#[derive(Debug, Error)]
pub enum ShareError {
    #[error("no `code` parameter in share link")]
    MissingCode,

    #[error("share link is not valid base64: {0}")]
    Base64(#[from] base64::DecodeError),

    #[error("share link does not contain UTF-8 text")]
    Utf8(#[from] std::string::FromUtf8Error),
}
