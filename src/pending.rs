//! Pending edits - unsaved checkbox toggles awaiting a batch save
//!
//! Toggling a checkbox in a boolean table records the new value here instead
//! of writing through. A save sends everything recorded as one `updateBatch`.
//!
//! Recording the same cell twice keeps a single entry holding the latest
//! value. Batches are built in ascending row order, and within a row in the
//! order its columns were first toggled.

use crate::messages::BatchEntry;
use crate::row::RowHandle;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct PendingEdits {
    rows: BTreeMap<RowHandle, Vec<(String, bool)>>,
}

impl PendingEdits {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a toggle and return the number of pending cells
    pub fn record(&mut self, handle: RowHandle, column: &str, value: bool) -> usize {
        let columns = self.rows.entry(handle).or_default();
        match columns.iter_mut().find(|(name, _)| name == column) {
            Some((_, existing)) => *existing = value,
            None => columns.push((column.to_string(), value)),
        }
        self.len()
    }

    pub fn get(&self, handle: RowHandle, column: &str) -> Option<bool> {
        self.rows
            .get(&handle)?
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| *value)
    }

    /// Number of pending cells
    pub fn len(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn clear(&mut self) {
        self.rows.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (RowHandle, &str, bool)> {
        self.rows.iter().flat_map(|(handle, columns)| {
            columns
                .iter()
                .map(move |(column, value)| (*handle, column.as_str(), *value))
        })
    }

    /// Batch entries for everything pending
    pub fn to_updates(&self) -> Vec<BatchEntry> {
        self.iter()
            .map(|(handle, column, value)| BatchEntry::new(handle, column, value))
            .collect()
    }
}
