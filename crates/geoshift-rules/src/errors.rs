use std::path::PathBuf;

use geoshift_backend::BackendError;
use geoshift_core::ValidationReport;
use thiserror::Error;

/// Errors raised while loading or applying rule catalogs.
#[derive(Debug, Error)]
pub enum RuleError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("schema error: {0}")]
    Schema(String),
    #[error("rule file not found: {}", .0.display())]
    ExpressionNotFound(PathBuf),
    #[error("rule catalog is invalid ({} error(s))", .0.errors.len())]
    Invalid(ValidationReport),
    #[error("cannot read fields of {table}: {source}")]
    Fields {
        table: String,
        #[source]
        source: BackendError,
    },
    #[error("rule {rule} on {table} failed: {source}")]
    Backend {
        table: String,
        rule: String,
        #[source]
        source: BackendError,
    },
}
