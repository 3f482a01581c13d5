use geoshift_core::{Editability, RuleErrorSpec, RuleKind, TriggerEvent};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Rule catalog document (`rules.json`).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RuleCatalog {
    /// Catalog contract version.
    pub catalog_version: String,
    /// Managed tables, reconciled in declared order.
    #[serde(default)]
    pub tables: Vec<TableRules>,
}

/// Rules declared for one table.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct TableRules {
    /// Table name, qualified or not.
    pub table: String,
    /// Rules applied in declared order.
    #[serde(default)]
    pub rules: Vec<RuleEntry>,
}

/// A single rule as authored in the catalog.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct RuleEntry {
    /// Rule name, unique within its table.
    pub name: String,
    /// Field the rule computes or guards.
    pub field: String,
    pub kind: RuleKind,
    /// Inline expression body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression: Option<String>,
    /// Expression file relative to the catalog directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expression_file: Option<String>,
    /// Triggering events; defaults to insert.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub triggers: Option<Vec<TriggerEvent>>,
    /// Defaults from the rule kind.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editable: Option<Editability>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<RuleErrorSpec>,
    /// Defaults to the rule name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}
