//! Classification of raw backend error codes.
//!
//! Every "the backend failed, but was the target state already reached?"
//! decision goes through [`classify`].

use std::fmt;

use serde::{Deserialize, Serialize};

/// Backend error codes with a known meaning.
pub mod codes {
    /// Field already exists or was already altered.
    pub const FIELD_ALREADY_EXISTS: &str = "ERROR 002557";
    /// Field does not exist within the table.
    pub const FIELD_NOT_FOUND: &str = "ERROR 000728";
    /// Domain does not exist in the workspace.
    pub const DOMAIN_NOT_FOUND: &str = "ERROR 000800";
    /// Coded value is already a member of the domain.
    pub const CODED_VALUE_EXISTS: &str = "ERROR 000353";
    /// Field group does not exist on the table.
    pub const FIELD_GROUP_NOT_FOUND: &str = "ERROR 002585";
    /// Attribute rule with the same name already exists.
    pub const RULE_ALREADY_EXISTS: &str = "ERROR 002541";
    /// Attribute rule does not exist.
    pub const RULE_NOT_FOUND: &str = "ERROR 002556";
    /// Dataset is already registered as versioned.
    pub const ALREADY_VERSIONED: &str = "ERROR 000429";
    /// Dataset is not registered as versioned.
    pub const NOT_VERSIONED: &str = "ERROR 000430";
    /// The connected user lacks the privilege for the operation.
    pub const INSUFFICIENT_PRIVILEGES: &str = "ERROR 000584";
}

/// Semantic outcome of a backend error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorOutcome {
    /// The change the caller asked for is already in place.
    AlreadyApplied,
    /// The object the caller wanted gone is already gone.
    AlreadyRemoved,
    /// The caller lacks the privilege for the operation.
    PermissionDenied,
    /// Anything else; must be treated as a real failure.
    Unclassified,
}

impl ErrorOutcome {
    /// True when the target state already matches the desired end state.
    pub fn is_idempotent_skip(self) -> bool {
        matches!(self, ErrorOutcome::AlreadyApplied | ErrorOutcome::AlreadyRemoved)
    }
}

impl fmt::Display for ErrorOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorOutcome::AlreadyApplied => f.write_str("already applied"),
            ErrorOutcome::AlreadyRemoved => f.write_str("already removed"),
            ErrorOutcome::PermissionDenied => f.write_str("permission denied"),
            ErrorOutcome::Unclassified => f.write_str("unclassified"),
        }
    }
}

const KNOWN_CODES: &[(&str, ErrorOutcome)] = &[
    (codes::FIELD_ALREADY_EXISTS, ErrorOutcome::AlreadyApplied),
    (codes::FIELD_NOT_FOUND, ErrorOutcome::AlreadyRemoved),
    (codes::DOMAIN_NOT_FOUND, ErrorOutcome::AlreadyRemoved),
    (codes::CODED_VALUE_EXISTS, ErrorOutcome::AlreadyApplied),
    (codes::FIELD_GROUP_NOT_FOUND, ErrorOutcome::AlreadyRemoved),
    (codes::RULE_ALREADY_EXISTS, ErrorOutcome::AlreadyApplied),
    (codes::RULE_NOT_FOUND, ErrorOutcome::AlreadyRemoved),
    (codes::ALREADY_VERSIONED, ErrorOutcome::AlreadyApplied),
    (codes::NOT_VERSIONED, ErrorOutcome::AlreadyRemoved),
    (codes::INSUFFICIENT_PRIVILEGES, ErrorOutcome::PermissionDenied),
];

/// Map a raw backend error code (or a message starting with one) to its outcome.
pub fn classify(raw: &str) -> ErrorOutcome {
    let raw = raw.trim_start();
    KNOWN_CODES
        .iter()
        .find(|(code, _)| raw.starts_with(code))
        .map(|(_, outcome)| *outcome)
        .unwrap_or(ErrorOutcome::Unclassified)
}
