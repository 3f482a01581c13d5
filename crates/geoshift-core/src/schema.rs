use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::rules::AttributeRuleDefinition;
use crate::types::{ContingentEntry, Domain, Field, Row};

/// Serializable state of a whole geodatabase workspace.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct WorkspaceSnapshot {
    /// Contract version for this snapshot format.
    pub snapshot_version: String,
    /// Workspace identity (connection file or database name).
    pub workspace: String,
    /// Standalone tables and top-level feature classes.
    #[serde(default)]
    pub tables: Vec<TableSnapshot>,
    /// Feature datasets and the feature classes nested under them.
    #[serde(default)]
    pub datasets: Vec<DatasetSnapshot>,
    /// Coded-value domains.
    #[serde(default)]
    pub domains: Vec<Domain>,
    /// External row sources used by reference refreshes, keyed by locator.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<SourceSnapshot>,
}

impl WorkspaceSnapshot {
    pub fn empty(workspace: impl Into<String>) -> Self {
        Self {
            snapshot_version: crate::SNAPSHOT_VERSION.to_string(),
            workspace: workspace.into(),
            tables: Vec::new(),
            datasets: Vec::new(),
            domains: Vec::new(),
            sources: Vec::new(),
        }
    }
}

/// Kind of table-like object.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Table,
    FeatureClass,
}

/// A table or feature class with its schema, rows, and versioning state.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TableSnapshot {
    pub name: String,
    pub kind: TableKind,
    pub fields: Vec<Field>,
    #[serde(default)]
    pub rows: Vec<Row>,
    /// Registered as versioned.
    #[serde(default)]
    pub versioned: bool,
    /// Editor tracking configuration when enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor_tracking: Option<EditorTrackingFields>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_groups: Vec<FieldGroup>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attribute_rules: Vec<AttributeRuleDefinition>,
}

impl TableSnapshot {
    pub fn new(name: impl Into<String>, kind: TableKind, fields: Vec<Field>) -> Self {
        Self {
            name: name.into(),
            kind,
            fields,
            rows: Vec::new(),
            versioned: false,
            editor_tracking: None,
            field_groups: Vec::new(),
            attribute_rules: Vec::new(),
        }
    }

    /// Position of a field, compared case-insensitively.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.is_named(name))
    }
}

/// A feature dataset grouping feature classes.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DatasetSnapshot {
    pub name: String,
    #[serde(default)]
    pub feature_classes: Vec<TableSnapshot>,
}

/// Rows published under an opaque locator for reference refreshes.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SourceSnapshot {
    pub locator: String,
    pub fields: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Row>,
}

/// Field group with its allowed value combinations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct FieldGroup {
    pub name: String,
    pub fields: Vec<String>,
    #[serde(default)]
    pub contingent_values: Vec<Vec<ContingentEntry>>,
}

/// Audit fields populated by editor tracking.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct EditorTrackingFields {
    pub creator: String,
    pub creation_date: String,
    pub last_editor: String,
    pub last_edit_date: String,
}

impl Default for EditorTrackingFields {
    fn default() -> Self {
        Self {
            creator: "CreatedBy".to_string(),
            creation_date: "CreatedOn".to_string(),
            last_editor: "EditedBy".to_string(),
            last_edit_date: "ModifiedOn".to_string(),
        }
    }
}

impl EditorTrackingFields {
    pub fn names(&self) -> [&str; 4] {
        [
            &self.creator,
            &self.creation_date,
            &self.last_editor,
            &self.last_edit_date,
        ]
    }
}

/// Per-table versioning state as reported by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VersioningState {
    pub versioned: bool,
    pub fields: Option<EditorTrackingFields>,
}
