use std::collections::{BTreeMap, BTreeSet};

use geoshift_core::unqualified;

use crate::error::{BackendError, BackendResult};

/// Failures injected into a [`super::MemoryBackend`].
///
/// Operation faults are keyed by operation name (`compress`, `add_field`, ...)
/// and optionally by target (table, domain, or rule name). They stay armed
/// until [`Faults::clear`] is called.
#[derive(Debug, Clone, Default)]
pub struct Faults {
    operations: BTreeMap<String, String>,
    denied_locks: BTreeSet<String>,
    row_writes: BTreeSet<(String, usize)>,
}

impl Faults {
    /// Make `operation` (on `target`, or on any target) fail with `code`.
    pub fn fail_operation(&mut self, operation: &str, target: Option<&str>, code: &str) {
        self.operations
            .insert(fault_key(operation, target), code.to_string());
    }

    /// Refuse schema locks on the table.
    pub fn deny_lock(&mut self, table: &str) {
        self.denied_locks.insert(normalize(table));
    }

    /// Fail the write of the row at `row` (zero-based storage order).
    pub fn fail_row_write(&mut self, table: &str, row: usize) {
        self.row_writes.insert((normalize(table), row));
    }

    pub fn clear(&mut self) {
        self.operations.clear();
        self.denied_locks.clear();
        self.row_writes.clear();
    }

    pub(crate) fn check(&self, operation: &str, target: Option<&str>) -> BackendResult<()> {
        let specific = target.and_then(|_| self.operations.get(&fault_key(operation, target)));
        match specific.or_else(|| self.operations.get(operation)) {
            Some(code) => Err(BackendError::new(
                code.clone(),
                format!("injected failure for {operation}"),
            )),
            None => Ok(()),
        }
    }

    pub(crate) fn lock_denied(&self, table: &str) -> bool {
        self.denied_locks.contains(&normalize(table))
    }

    pub(crate) fn failing_rows(&self, table: &str) -> BTreeSet<usize> {
        let table = normalize(table);
        self.row_writes
            .iter()
            .filter(|(name, _)| *name == table)
            .map(|(_, row)| *row)
            .collect()
    }
}

fn normalize(name: &str) -> String {
    unqualified(name).to_lowercase()
}

fn fault_key(operation: &str, target: Option<&str>) -> String {
    match target {
        Some(target) => format!("{operation}:{}", normalize(target)),
        None => operation.to_string(),
    }
}
