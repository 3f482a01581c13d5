//! Core contracts and helpers for Geoshift.
//!
//! This crate defines the canonical geodatabase types, attribute-rule
//! descriptors, the backend error classifier, validation reports, and
//! snapshot validation shared by the backend, the engines, and the CLI.

pub mod classify;
pub mod error;
pub mod issues;
pub mod rules;
pub mod schema;
pub mod types;
pub mod validation;

pub use classify::{ErrorOutcome, classify, codes};
pub use error::{Error, Result};
pub use issues::{IssueSeverity, ValidationIssue, ValidationReport};
pub use rules::{
    AttributeRuleDefinition, BackendRuleType, Editability, RuleDescriptor, RuleErrorSpec,
    RuleKind, TriggerEvent,
};
pub use schema::{
    DatasetSnapshot, EditorTrackingFields, FieldGroup, SourceSnapshot, TableKind, TableSnapshot,
    VersioningState, WorkspaceSnapshot,
};
pub use types::{
    CodedValue, ContingentEntry, ContingentValue, Domain, Field, FieldDefinition, FieldType,
    FieldValue, Row, ValueKey,
};
pub use validation::validate_snapshot;

/// Current contract version for workspace snapshot artifacts.
pub const SNAPSHOT_VERSION: &str = "0.1";

/// Last segment of a qualified table name or table path
/// (`db.owner.Name` and `conn.sde/db.owner.Name` -> `Name`).
pub fn unqualified(name: &str) -> &str {
    name.rsplit(['.', '/', '\\']).next().unwrap_or(name)
}

#[cfg(test)]
mod tests {
    use super::unqualified;

    #[test]
    fn unqualified_strips_owner_and_workspace_path() {
        assert_eq!(unqualified("UICWell"), "UICWell");
        assert_eq!(unqualified("UDEQ.UICADMIN.UICWell"), "UICWell");
        assert_eq!(
            unqualified("localhost.udeq@uicadmin/UDEQ.UICADMIN.UICWell"),
            "UICWell"
        );
        assert_eq!(unqualified(r"C:\gis\uic.sde\UICFacility"), "UICFacility");
    }
}
