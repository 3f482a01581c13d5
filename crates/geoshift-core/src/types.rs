use std::cmp::Ordering;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Storage type of a geodatabase field.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Short,
    Long,
    Float,
    Double,
    Date,
    Guid,
    GlobalId,
    Oid,
    Geometry,
    Blob,
}

impl FieldType {
    /// Identifier columns that the backend maintains on its own.
    pub fn is_identifier(self) -> bool {
        matches!(self, FieldType::Oid | FieldType::Guid | FieldType::GlobalId)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FieldType::Text => "TEXT",
            FieldType::Short => "SHORT",
            FieldType::Long => "LONG",
            FieldType::Float => "FLOAT",
            FieldType::Double => "DOUBLE",
            FieldType::Date => "DATE",
            FieldType::Guid => "GUID",
            FieldType::GlobalId => "GLOBALID",
            FieldType::Oid => "OID",
            FieldType::Geometry => "GEOMETRY",
            FieldType::Blob => "BLOB",
        };
        f.write_str(label)
    }
}

/// Everything needed to create a field except its name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct FieldDefinition {
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub precision: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default = "default_nullable")]
    pub nullable: bool,
    /// Coded-value domain assigned to the field.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Default value assigned after the field is created.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<FieldValue>,
}

fn default_nullable() -> bool {
    true
}

impl FieldDefinition {
    /// Nullable field of the given type with no other attributes.
    pub fn of_type(field_type: FieldType) -> Self {
        Self {
            field_type,
            length: None,
            precision: None,
            scale: None,
            alias: None,
            nullable: true,
            domain: None,
            default: None,
        }
    }
}

/// A named field, as listed by the backend or declared for creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Field {
    pub name: String,
    #[serde(flatten)]
    pub definition: FieldDefinition,
}

impl Field {
    pub fn new(name: impl Into<String>, definition: FieldDefinition) -> Self {
        Self {
            name: name.into(),
            definition,
        }
    }

    pub fn field_type(&self) -> FieldType {
        self.definition.field_type
    }

    /// Case-insensitive name comparison, matching backend semantics.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// A single cell value read from or written to a table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
}

/// One row of values, ordered like the field list that produced it.
pub type Row = Vec<FieldValue>;

/// Hashable identity of a non-null [`FieldValue`]. Floats key on their bits.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    Int(i64),
    Float(u64),
    Text(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    /// Canonical string used to key values in hash maps.
    pub fn key(&self) -> String {
        match self {
            FieldValue::Null => "<null>".to_string(),
            FieldValue::Int(value) => value.to_string(),
            FieldValue::Float(value) => value.to_string(),
            FieldValue::Text(value) => value.clone(),
        }
    }

    /// Type-aware hash key for join matching; `None` for null.
    ///
    /// Values of different variants never share a key, so `Int(1)` does not
    /// match `Text("1")`.
    pub fn join_key(&self) -> Option<ValueKey> {
        match self {
            FieldValue::Null => None,
            FieldValue::Int(value) => Some(ValueKey::Int(*value)),
            FieldValue::Float(value) => {
                let normalized = if *value == 0.0 { 0.0_f64 } else { *value };
                Some(ValueKey::Float(normalized.to_bits()))
            }
            FieldValue::Text(value) => Some(ValueKey::Text(value.clone())),
        }
    }

    /// Ordering used for coded values: numeric when both sides are numeric,
    /// otherwise by canonical key.
    pub fn code_cmp(&self, other: &FieldValue) -> Ordering {
        match (self.as_f64(), other.as_f64()) {
            (Some(left), Some(right)) => left.total_cmp(&right),
            _ => self.key().cmp(&other.key()),
        }
    }

    fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(value) => Some(*value as f64),
            FieldValue::Float(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str("NULL"),
            other => f.write_str(&other.key()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

/// A `(code, label)` pair of a coded-value domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct CodedValue {
    pub code: FieldValue,
    pub label: String,
}

/// A coded-value domain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Domain {
    pub name: String,
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub coded_values: Vec<CodedValue>,
}

impl Domain {
    pub fn contains_code(&self, code: &FieldValue) -> bool {
        let key = code.key();
        self.coded_values.iter().any(|value| value.code.key() == key)
    }
}

/// Allowed value for one field of a contingent value combination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ContingentValue {
    /// Any value of the field's domain.
    Any,
    /// The field must be null.
    Null,
    /// A single coded value.
    Coded(FieldValue),
}

/// One field/value pair of a contingent value combination.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct ContingentEntry {
    pub field: String,
    pub value: ContingentValue,
}

impl ContingentEntry {
    pub fn new(field: impl Into<String>, value: ContingentValue) -> Self {
        Self {
            field: field.into(),
            value,
        }
    }
}
