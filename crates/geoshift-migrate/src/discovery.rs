use geoshift_backend::{Backend, BackendResult};
use geoshift_core::unqualified;

/// Every versionable table in the workspace.
///
/// Top-level feature classes, then standalone tables, then the feature
/// classes of each feature dataset in listing order.
pub fn discover_tables<B: Backend + ?Sized>(backend: &mut B) -> BackendResult<Vec<String>> {
    let mut tables = backend.list_feature_classes(None)?;
    tables.extend(backend.list_tables()?);
    for dataset in backend.list_datasets()? {
        tables.extend(backend.list_feature_classes(Some(&dataset))?);
    }
    Ok(tables)
}

/// Skip-list membership by unqualified, case-insensitive name.
pub fn is_skipped(table: &str, skip_tables: &[String]) -> bool {
    let name = unqualified(table);
    skip_tables
        .iter()
        .any(|skip| unqualified(skip).eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skip_list_matches_last_segment() {
        let skip = vec!["Counties".to_string(), "SDE_compress_log".to_string()];

        assert!(is_skipped("UDEQ.UICADMIN.Counties", &skip));
        assert!(is_skipped("udeq.uicadmin.COUNTIES", &skip));
        assert!(is_skipped("SDE_compress_log", &skip));
        assert!(!is_skipped("UDEQ.UICADMIN.UICWell", &skip));
        assert!(!is_skipped("UDEQ.Counties.UICWell", &skip));
    }
}
