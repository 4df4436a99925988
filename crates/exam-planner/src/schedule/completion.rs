use super::domain::{CompletionField, CompletionMap, CompletionStatus, ExamRecord, SelectionMap};
use super::keys;

/// Milestone acknowledgements for every committed record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompletionTracker {
    statuses: CompletionMap,
}

impl CompletionTracker {
    pub fn new(statuses: CompletionMap) -> Self {
        Self { statuses }
    }

    /// Flips one flag under `key`, creating an all-false entry on first touch.
    pub fn toggle(&mut self, key: &str, field: CompletionField) -> CompletionStatus {
        let status = self.statuses.entry(key.to_string()).or_default();
        status.toggle(field);
        *status
    }

    pub fn status(&self, key: &str) -> CompletionStatus {
        self.statuses.get(key).copied().unwrap_or_default()
    }

    pub fn status_for(&self, record: &ExamRecord) -> CompletionStatus {
        keys::lookup_status(&self.statuses, record)
    }

    /// Re-keys and prunes against `selections`; returns true when the map changed.
    pub fn reconcile(&mut self, selections: &SelectionMap) -> bool {
        let migrated = keys::migrate(&self.statuses, selections);
        if migrated == self.statuses {
            return false;
        }
        self.statuses = migrated;
        true
    }

    pub fn clear(&mut self) {
        self.statuses.clear();
    }

    pub fn len(&self) -> usize {
        self.statuses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.statuses.is_empty()
    }

    pub fn as_map(&self) -> &CompletionMap {
        &self.statuses
    }
}
