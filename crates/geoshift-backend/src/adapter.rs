use geoshift_core::{
    AttributeRuleDefinition, BackendRuleType, CodedValue, ContingentEntry, Domain,
    EditorTrackingFields, Field, FieldValue, Row, VersioningState,
};

use crate::error::BackendResult;

/// Operations consumed from a geodatabase service.
///
/// All calls are synchronous. Table arguments are table or feature class
/// names, or paths under the workspace; resolving them is the backend's job.
pub trait Backend {
    /// Workspace identity used in progress output.
    fn workspace(&self) -> &str;

    fn compress(&mut self) -> BackendResult<()>;
    fn analyze(&mut self) -> BackendResult<()>;

    /// Whether an exclusive schema lock could be acquired on the table right now.
    fn test_schema_lock(&mut self, table: &str) -> bool;

    /// Standalone tables at the workspace root.
    fn list_tables(&mut self) -> BackendResult<Vec<String>>;
    /// Feature datasets at the workspace root.
    fn list_datasets(&mut self) -> BackendResult<Vec<String>>;
    /// Feature classes at the workspace root, or inside `dataset` when given.
    fn list_feature_classes(&mut self, dataset: Option<&str>) -> BackendResult<Vec<String>>;

    /// Delete a table or feature class; deleting a missing one succeeds.
    fn delete_table(&mut self, table: &str) -> BackendResult<()>;
    fn truncate_table(&mut self, table: &str) -> BackendResult<()>;
    /// Append rows from an opaque source locator, returning the appended count.
    fn append(&mut self, source: &str, target: &str) -> BackendResult<u64>;

    /// Current registration and editor tracking of a table.
    fn versioning_state(&mut self, table: &str) -> BackendResult<VersioningState>;
    fn register_as_versioned(&mut self, table: &str) -> BackendResult<()>;
    fn unregister_as_versioned(&mut self, table: &str) -> BackendResult<()>;
    fn enable_editor_tracking(
        &mut self,
        table: &str,
        fields: &EditorTrackingFields,
    ) -> BackendResult<()>;
    fn disable_editor_tracking(&mut self, table: &str) -> BackendResult<()>;

    fn list_fields(&mut self, table: &str) -> BackendResult<Vec<Field>>;
    fn add_field(&mut self, table: &str, field: &Field) -> BackendResult<()>;
    fn assign_default(
        &mut self,
        table: &str,
        field: &str,
        default: Option<&FieldValue>,
    ) -> BackendResult<()>;
    fn delete_fields(&mut self, table: &str, fields: &[String]) -> BackendResult<()>;

    fn list_domains(&mut self) -> BackendResult<Vec<Domain>>;
    fn delete_domain(&mut self, domain: &str) -> BackendResult<()>;
    fn add_coded_value(&mut self, domain: &str, value: &CodedValue) -> BackendResult<()>;

    fn create_field_group(&mut self, table: &str, name: &str, fields: &[String])
    -> BackendResult<()>;
    fn delete_field_group(&mut self, table: &str, name: &str) -> BackendResult<()>;
    fn add_contingent_value(
        &mut self,
        table: &str,
        group: &str,
        values: &[ContingentEntry],
    ) -> BackendResult<()>;

    /// Read-only scan projecting `fields`; `None` selects every row.
    fn search(
        &mut self,
        table: &str,
        fields: &[String],
        predicate: Option<&str>,
    ) -> BackendResult<Vec<Row>>;

    /// Write cursor over every row of the table, projecting `fields`.
    fn update_cursor<'a>(
        &'a mut self,
        table: &str,
        fields: &[String],
    ) -> BackendResult<Box<dyn UpdateCursor + 'a>>;

    /// Cheap existence check for a rule; `None` when the backend cannot answer.
    fn attribute_rule_exists(&mut self, _table: &str, _name: &str) -> Option<bool> {
        None
    }
    fn add_attribute_rule(
        &mut self,
        table: &str,
        rule: &AttributeRuleDefinition,
    ) -> BackendResult<()>;
    fn alter_attribute_rule(
        &mut self,
        table: &str,
        rule: &AttributeRuleDefinition,
    ) -> BackendResult<()>;
    fn delete_attribute_rule(
        &mut self,
        table: &str,
        name: &str,
        rule_type: BackendRuleType,
    ) -> BackendResult<()>;
}

/// Write cursor yielding rows and accepting replacements for the current row.
pub trait UpdateCursor {
    /// Advance to the next row; `None` once the table is exhausted.
    fn next_row(&mut self) -> Option<BackendResult<Row>>;

    /// Replace the values of the row last returned by [`UpdateCursor::next_row`].
    fn update_row(&mut self, row: Row) -> BackendResult<()>;
}
