//! Attribute-rule catalog loading, validation, and reconciliation.

pub mod errors;
pub mod loader;
pub mod model;
pub mod reconcile;
pub mod schema;
pub mod triggers;
pub mod validate;

pub use errors::RuleError;
pub use geoshift_core::{IssueSeverity, ValidationIssue, ValidationReport};
pub use loader::{LoadedCatalog, RuleRegistry, RuleSet, load_catalog, load_catalog_value};
pub use model::{RuleCatalog, RuleEntry, TableRules};
pub use reconcile::{RuleAction, RuleGroup, RuleGroupReport, RuleOutcome};
pub use schema::catalog_json_schema;
pub use triggers::triggering_fields;
pub use validate::{validate_catalog, validate_catalog_json};

/// Current contract version for rule catalogs.
pub const CATALOG_VERSION: &str = "1";
