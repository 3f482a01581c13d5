use geoshift_core::{EditorTrackingFields, Field, FieldDefinition, FieldValue};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Declarative migration plan (`migration.json`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct MigrationPlan {
    /// Plan contract version.
    pub plan_version: String,
    /// Obsolete tables removed before any schema change.
    #[serde(default)]
    pub tables_to_delete: Vec<String>,
    /// Tables left alone by un-versioning and re-versioning, matched by
    /// unqualified name.
    #[serde(default)]
    pub skip_tables: Vec<String>,
    /// Audit fields restored by re-versioning.
    #[serde(default)]
    pub editor_tracking: EditorTrackingFields,
    #[serde(default)]
    pub table_modifications: Vec<SchemaChangeSpec>,
    /// Domain deletions (applied before field migration) and coded-value
    /// additions (applied after contingent values).
    #[serde(default)]
    pub domain_changes: Vec<DomainChangeSpec>,
    /// Column moves, applied in order.
    #[serde(default)]
    pub field_transfers: Vec<FieldTransferSpec>,
    #[serde(default)]
    pub contingent_groups: Vec<ContingentGroupSpec>,
}

/// Fields to drop and add on one table.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct SchemaChangeSpec {
    pub table: String,
    /// Deleted in one batch, before any addition.
    #[serde(default)]
    pub delete_fields: Vec<String>,
    /// Added one at a time, in order.
    #[serde(default)]
    pub add_fields: Vec<Field>,
}

/// One coded-value domain change.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum DomainChangeSpec {
    Delete {
        domain: String,
    },
    AddCodedValue {
        domain: String,
        code: FieldValue,
        label: String,
    },
}

impl DomainChangeSpec {
    pub fn domain(&self) -> &str {
        match self {
            DomainChangeSpec::Delete { domain } | DomainChangeSpec::AddCodedValue { domain, .. } => {
                domain
            }
        }
    }
}

/// Moves one column from a source table to a correlated destination table.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FieldTransferSpec {
    pub source_table: String,
    pub destination_table: String,
    /// Join key on the source side (usually its GUID).
    pub source_key: String,
    /// Join key on the destination side (the foreign key).
    pub destination_key: String,
    pub source_field: String,
    /// Destination field name; defaults to the source field name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rename: Option<String>,
    /// Definition used when the destination field has to be created.
    pub destination: FieldDefinition,
}

impl FieldTransferSpec {
    pub fn destination_field(&self) -> &str {
        self.rename.as_deref().unwrap_or(&self.source_field)
    }
}

/// Field group rebuilt from a domain's coded values.
///
/// The class of each code is its first character; codes whose class equals
/// `reserved_class` get no combination.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct ContingentGroupSpec {
    pub table: String,
    pub group_name: String,
    pub class_field: String,
    pub subclass_field: String,
    /// Domain holding the subclass codes.
    pub domain: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reserved_class: Option<FieldValue>,
}

/// Reference table reloaded from an external source.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct ReferenceSource {
    pub table: String,
    /// Opaque locator resolved by the backend.
    pub source: String,
}
