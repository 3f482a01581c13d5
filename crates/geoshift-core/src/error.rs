use thiserror::Error;

/// Core error type shared across Geoshift crates.
#[derive(Debug, Error)]
pub enum Error {
    /// The workspace snapshot violates internal invariants.
    #[error("invalid snapshot: {0}")]
    InvalidSnapshot(String),
    /// The snapshot was written by an incompatible contract version.
    #[error("unsupported snapshot version '{found}' (expected '{expected}')")]
    UnsupportedSnapshotVersion { found: String, expected: String },
}

/// Convenience alias for results returned by Geoshift crates.
pub type Result<T> = std::result::Result<T, Error>;
