use geoshift_core::Field;

/// Audit columns maintained by editor tracking; never triggers.
const AUDIT_FIELDS: [&str; 3] = ["createdon", "modifiedon", "editedby"];

/// Every field of a table that may trigger a rule, in table order.
///
/// Audit columns and identifier-typed columns (object ids, GUIDs, global ids)
/// are excluded. Recomputed on every reconcile so new columns become triggers.
pub fn triggering_fields(fields: &[Field]) -> Vec<String> {
    fields
        .iter()
        .filter(|field| !field.field_type().is_identifier())
        .filter(|field| {
            !AUDIT_FIELDS
                .iter()
                .any(|audit| field.name.eq_ignore_ascii_case(audit))
        })
        .map(|field| field.name.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use geoshift_core::{FieldDefinition, FieldType};

    use super::*;

    fn field(name: &str, field_type: FieldType) -> Field {
        Field::new(name, FieldDefinition::of_type(field_type))
    }

    #[test]
    fn excludes_audit_and_identifier_columns() {
        let fields = vec![
            field("GUID", FieldType::Guid),
            field("CreatedOn", FieldType::Date),
            field("ModifiedOn", FieldType::Date),
            field("EditedBy", FieldType::Text),
            field("Name", FieldType::Text),
            field("Status", FieldType::Text),
        ];

        assert_eq!(triggering_fields(&fields), vec!["Name", "Status"]);
    }

    #[test]
    fn keeps_creator_and_matches_case_insensitively() {
        let fields = vec![
            field("OBJECTID", FieldType::Oid),
            field("GlobalID", FieldType::GlobalId),
            field("CREATEDON", FieldType::Date),
            field("CreatedBy", FieldType::Text),
        ];

        assert_eq!(triggering_fields(&fields), vec!["CreatedBy"]);
    }
}
