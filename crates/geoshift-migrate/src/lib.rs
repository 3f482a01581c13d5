//! Schema migration orchestration for versioned geodatabases.
//!
//! The [`Migrator`] drives a fixed sequence of idempotent steps against a
//! [`geoshift_backend::Backend`]; [`transfer`] moves one column between
//! correlated tables and [`refresh_reference`] reloads reference tables.

pub mod contingent;
pub mod discovery;
pub mod errors;
pub mod model;
pub mod orchestrator;
pub mod reference;
pub mod report;
pub mod schema;
pub mod transfer;
pub mod validate;

pub use contingent::{contingent_combinations, rebuild_contingent_values};
pub use discovery::{discover_tables, is_skipped};
pub use errors::{MigrationError, Result};
pub use model::{
    ContingentGroupSpec, DomainChangeSpec, FieldTransferSpec, MigrationPlan, ReferenceSource,
    SchemaChangeSpec,
};
pub use orchestrator::{Migrator, Step};
pub use reference::{RefreshReport, RefreshStatus, RefreshedTable, refresh_reference};
pub use report::{ItemFailure, MigrationReport, StepReport, StepStatus};
pub use schema::plan_json_schema;
pub use transfer::{TransferResult, TransferStatus, transfer};
pub use validate::{ValidatedPlan, load_plan, validate_plan, validate_plan_json};

/// Current contract version for migration plans.
pub const PLAN_VERSION: &str = "1";
