use geoshift_backend::Backend;
use geoshift_core::{ContingentEntry, ContingentValue, Domain, ErrorOutcome, FieldValue};
use tracing::{debug, info};

use crate::errors::{MigrationError, Result};
use crate::model::ContingentGroupSpec;

/// Class of a subclass code: its first character, as an integer when it is a digit.
fn class_of(code: &FieldValue) -> Option<FieldValue> {
    let first = code.key().chars().next()?;
    Some(match first.to_digit(10) {
        Some(digit) => FieldValue::Int(i64::from(digit)),
        None => FieldValue::Text(first.to_string()),
    })
}

/// Combinations for a group: one wildcard (any class, null subclass) followed
/// by one entry per coded value in ascending code order, reserved class excluded.
pub fn contingent_combinations(
    spec: &ContingentGroupSpec,
    domain: &Domain,
) -> Vec<Vec<ContingentEntry>> {
    let reserved = spec.reserved_class.as_ref().map(FieldValue::key);

    let mut codes: Vec<(FieldValue, &FieldValue)> = domain
        .coded_values
        .iter()
        .filter_map(|value| class_of(&value.code).map(|class| (class, &value.code)))
        .filter(|(class, _)| reserved.as_deref() != Some(class.key().as_str()))
        .collect();
    codes.sort_by(|(_, left), (_, right)| left.code_cmp(right));

    let mut combinations = Vec::with_capacity(codes.len() + 1);
    combinations.push(vec![
        ContingentEntry::new(&spec.class_field, ContingentValue::Any),
        ContingentEntry::new(&spec.subclass_field, ContingentValue::Null),
    ]);
    for (class, code) in codes {
        combinations.push(vec![
            ContingentEntry::new(&spec.class_field, ContingentValue::Coded(class)),
            ContingentEntry::new(&spec.subclass_field, ContingentValue::Coded(code.clone())),
        ]);
    }
    combinations
}

/// Drop and recreate the field group, then add every combination.
///
/// Returns the number of combinations added.
pub fn rebuild_contingent_values<B: Backend + ?Sized>(
    backend: &mut B,
    spec: &ContingentGroupSpec,
) -> Result<usize> {
    info!(table = %spec.table, group = %spec.group_name, "creating contingent field group");

    let domains = backend
        .list_domains()
        .map_err(|source| MigrationError::backend("listing domains", source))?;
    let domain = domains
        .iter()
        .find(|domain| domain.name.eq_ignore_ascii_case(&spec.domain))
        .ok_or_else(|| MigrationError::InvalidState(format!("domain {} not found", spec.domain)))?;
    let combinations = contingent_combinations(spec, domain);

    match backend.delete_field_group(&spec.table, &spec.group_name) {
        Ok(()) => debug!(group = %spec.group_name, "dropped existing field group"),
        Err(err) if err.outcome() == ErrorOutcome::AlreadyRemoved => {}
        Err(source) => {
            return Err(MigrationError::backend(
                format!("dropping field group {}", spec.group_name),
                source,
            ));
        }
    }

    let fields = [spec.class_field.clone(), spec.subclass_field.clone()];
    backend
        .create_field_group(&spec.table, &spec.group_name, &fields)
        .map_err(|source| {
            MigrationError::backend(format!("creating field group {}", spec.group_name), source)
        })?;

    info!(group = %spec.group_name, combinations = combinations.len(), "adding contingent values");
    for combination in &combinations {
        backend
            .add_contingent_value(&spec.table, &spec.group_name, combination)
            .map_err(|source| {
                MigrationError::backend(
                    format!("adding contingent value to {}", spec.group_name),
                    source,
                )
            })?;
    }
    Ok(combinations.len())
}
