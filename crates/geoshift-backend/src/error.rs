use std::io;

use geoshift_core::{ErrorOutcome, classify};
use thiserror::Error;

/// Error raised by a backend call, carrying the raw backend error code.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{code}: {message}")]
pub struct BackendError {
    /// Raw code such as `ERROR 002557`.
    pub code: String,
    pub message: String,
}

impl BackendError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Semantic outcome of this error.
    pub fn outcome(&self) -> ErrorOutcome {
        classify(&self.code)
    }
}

/// Result type for backend calls.
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Errors loading or saving a workspace snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] geoshift_core::Error),
}
