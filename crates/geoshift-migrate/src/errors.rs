use geoshift_backend::BackendError;
use geoshift_core::ValidationReport;
use thiserror::Error;

use crate::orchestrator::Step;
use crate::report::MigrationReport;

/// Errors emitted by the migration engines.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("schema error: {0}")]
    Schema(String),
    #[error("migration plan is invalid ({} error(s))", .0.errors.len())]
    InvalidPlan(ValidationReport),
    #[error("cannot acquire a schema lock on {0}")]
    LockUnavailable(String),
    #[error("{context}: {source}")]
    Backend {
        context: String,
        #[source]
        source: BackendError,
    },
    #[error("invalid migration state: {0}")]
    InvalidState(String),
    #[error("migration aborted during {step}")]
    Aborted {
        step: Step,
        report: Box<MigrationReport>,
    },
}

impl MigrationError {
    pub(crate) fn backend(context: impl Into<String>, source: BackendError) -> Self {
        MigrationError::Backend {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, MigrationError>;
