//! Declarative attribute-rule descriptors and the definitions sent to the backend.
//!
//! Expression bodies are opaque payloads: nothing in Geoshift parses or
//! rewrites them.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Kind of declarative rule.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// Computes a field value from an expression.
    Calculation,
    /// Rejects edits whose expression evaluates to false.
    Constraint,
    /// Calculation that assigns a fixed value once.
    Constant,
}

impl RuleKind {
    /// Rule type understood by the backend; constants are calculations.
    pub fn backend_type(self) -> BackendRuleType {
        match self {
            RuleKind::Calculation | RuleKind::Constant => BackendRuleType::Calculation,
            RuleKind::Constraint => BackendRuleType::Constraint,
        }
    }

    pub fn default_editability(self) -> Editability {
        match self {
            RuleKind::Constant => Editability::NonEditable,
            RuleKind::Calculation | RuleKind::Constraint => Editability::Editable,
        }
    }
}

/// Rule types the backend stores.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum BackendRuleType {
    Calculation,
    Constraint,
}

impl fmt::Display for BackendRuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendRuleType::Calculation => f.write_str("CALCULATION"),
            BackendRuleType::Constraint => f.write_str("CONSTRAINT"),
        }
    }
}

/// Edit events that trigger rule evaluation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum TriggerEvent {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for TriggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TriggerEvent::Insert => f.write_str("INSERT"),
            TriggerEvent::Update => f.write_str("UPDATE"),
            TriggerEvent::Delete => f.write_str("DELETE"),
        }
    }
}

/// Whether editors may override a calculated value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Editability {
    Editable,
    NonEditable,
}

/// Error number and message reported when a constraint rejects an edit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct RuleErrorSpec {
    pub number: i32,
    pub message: String,
}

/// Immutable description of one attribute rule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuleDescriptor {
    pub name: String,
    pub field: String,
    pub kind: RuleKind,
    /// Expression text, passed through unchanged.
    pub expression: String,
    pub triggers: Vec<TriggerEvent>,
    pub editable: Editability,
    pub error: Option<RuleErrorSpec>,
    pub description: String,
    pub tags: Vec<String>,
}

impl RuleDescriptor {
    /// Build the backend definition with a freshly derived set of triggering fields.
    pub fn to_definition(&self, triggering_fields: &[String]) -> AttributeRuleDefinition {
        AttributeRuleDefinition {
            name: self.name.clone(),
            rule_type: self.kind.backend_type(),
            field: self.field.clone(),
            expression: self.expression.clone(),
            triggering_events: self.triggers.clone(),
            triggering_fields: triggering_fields.to_vec(),
            editable: self.editable,
            error_number: self.error.as_ref().map(|error| error.number),
            error_message: self.error.as_ref().map(|error| error.message.clone()),
            description: self.description.clone(),
            tags: self.tags.clone(),
        }
    }
}

/// Attribute rule as stored by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct AttributeRuleDefinition {
    pub name: String,
    pub rule_type: BackendRuleType,
    pub field: String,
    pub expression: String,
    pub triggering_events: Vec<TriggerEvent>,
    #[serde(default)]
    pub triggering_fields: Vec<String>,
    pub editable: Editability,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_number: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}
