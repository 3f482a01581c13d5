use schemars::schema::RootSchema;
use schemars::schema_for;

use crate::model::MigrationPlan;

/// Emit the JSON Schema for `migration.json`.
pub fn plan_json_schema() -> RootSchema {
    schema_for!(MigrationPlan)
}
