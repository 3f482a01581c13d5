use std::fs;
use std::path::Path;

use geoshift_core::{RuleDescriptor, TriggerEvent, ValidationIssue, unqualified};
use serde_json::Value;
use tracing::debug;

use crate::errors::RuleError;
use crate::model::{RuleCatalog, RuleEntry};
use crate::schema::catalog_json_schema;
use crate::validate::{validate_catalog, validate_catalog_json};

/// Ordered rule descriptors for one table.
#[derive(Debug, Clone)]
pub struct RuleSet {
    pub table: String,
    pub rules: Vec<RuleDescriptor>,
}

/// Immutable mapping from table to its ordered rules, loaded once per run.
#[derive(Debug, Clone, Default)]
pub struct RuleRegistry {
    sets: Vec<RuleSet>,
}

impl RuleRegistry {
    pub fn new(sets: Vec<RuleSet>) -> Self {
        Self { sets }
    }

    /// Rule sets in catalog order.
    pub fn iter(&self) -> impl Iterator<Item = &RuleSet> {
        self.sets.iter()
    }

    /// Look up a table's rules by unqualified, case-insensitive name.
    pub fn get(&self, table: &str) -> Option<&RuleSet> {
        let wanted = unqualified(table);
        self.sets
            .iter()
            .find(|set| unqualified(&set.table).eq_ignore_ascii_case(wanted))
    }

    pub fn len(&self) -> usize {
        self.sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sets.is_empty()
    }
}

/// Catalog ready for reconciliation, plus non-fatal findings.
#[derive(Debug, Clone)]
pub struct LoadedCatalog {
    pub registry: RuleRegistry,
    pub warnings: Vec<ValidationIssue>,
}

/// Load, validate, and resolve a `rules.json` catalog from disk.
///
/// `expression_file` entries are read relative to the catalog's directory.
pub fn load_catalog(path: &Path) -> Result<LoadedCatalog, RuleError> {
    let contents = fs::read_to_string(path)?;
    let json: Value = serde_json::from_str(&contents)?;
    let base = path.parent().unwrap_or_else(|| Path::new("."));
    load_catalog_value(&json, base)
}

/// Validate and resolve an already-parsed catalog document.
pub fn load_catalog_value(json: &Value, base: &Path) -> Result<LoadedCatalog, RuleError> {
    let schema = serde_json::to_value(catalog_json_schema())?;
    let mut report = validate_catalog_json(json, &schema)?;
    if !report.is_ok() {
        return Err(RuleError::Invalid(report));
    }

    let catalog: RuleCatalog = serde_json::from_value(json.clone())?;
    report.merge(validate_catalog(&catalog));
    if !report.is_ok() {
        return Err(RuleError::Invalid(report));
    }

    let mut sets = Vec::with_capacity(catalog.tables.len());
    for table in catalog.tables {
        let rules = table
            .rules
            .into_iter()
            .map(|entry| resolve_rule(entry, base))
            .collect::<Result<Vec<_>, _>>()?;
        debug!(table = %table.table, rules = rules.len(), "loaded rule set");
        sets.push(RuleSet {
            table: table.table,
            rules,
        });
    }

    Ok(LoadedCatalog {
        registry: RuleRegistry::new(sets),
        warnings: report.warnings,
    })
}

fn resolve_rule(entry: RuleEntry, base: &Path) -> Result<RuleDescriptor, RuleError> {
    let expression = match (entry.expression, entry.expression_file) {
        (Some(expression), _) => expression,
        (None, Some(file)) => {
            let path = base.join(file);
            if !path.is_file() {
                return Err(RuleError::ExpressionNotFound(path));
            }
            fs::read_to_string(&path)?
        }
        (None, None) => String::new(),
    };

    Ok(RuleDescriptor {
        description: entry.description.unwrap_or_else(|| entry.name.clone()),
        editable: entry
            .editable
            .unwrap_or_else(|| entry.kind.default_editability()),
        triggers: entry.triggers.unwrap_or_else(|| vec![TriggerEvent::Insert]),
        name: entry.name,
        field: entry.field,
        kind: entry.kind,
        expression,
        error: entry.error,
        tags: entry.tags,
    })
}
