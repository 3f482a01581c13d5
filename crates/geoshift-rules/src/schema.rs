use schemars::schema::RootSchema;
use schemars::schema_for;

use crate::model::RuleCatalog;

/// Emit the JSON Schema for `rules.json`.
pub fn catalog_json_schema() -> RootSchema {
    schema_for!(RuleCatalog)
}
