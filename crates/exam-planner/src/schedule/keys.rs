//! Record identities and the versioned completion-key schema.
//!
//! Completion flags were first keyed by `examDate__schoolName`. A school can hold two
//! exams on one date, so the key gained the exam name. [`migrate`] rewrites a stored
//! map into the three-part form for the current selections, dropping orphans.

use tracing::debug;

use super::domain::{CompletionMap, CompletionStatus, ExamRecord, SelectionMap};

const SEPARATOR: &str = "__";

/// Identity of a record within one loaded batch; `ordinal` disambiguates exact duplicates.
pub fn record_identity(record: &ExamRecord, ordinal: Option<usize>) -> String {
    let base = completion_key(record);
    match ordinal {
        Some(index) => format!("{base}{SEPARATOR}{index}"),
        None => base,
    }
}

pub fn completion_key(record: &ExamRecord) -> String {
    format!(
        "{}{SEPARATOR}{}{SEPARATOR}{}",
        record.exam_date, record.school_name, record.exam_name
    )
}

pub fn legacy_completion_key(record: &ExamRecord) -> String {
    format!("{}{SEPARATOR}{}", record.exam_date, record.school_name)
}

/// Rebuilds the completion map for `selections`, preferring current keys over legacy ones.
pub fn migrate(existing: &CompletionMap, selections: &SelectionMap) -> CompletionMap {
    let mut upgraded = CompletionMap::new();

    for record in selections.values() {
        let key = completion_key(record);
        let status = existing
            .get(&key)
            .or_else(|| existing.get(&legacy_completion_key(record)))
            .copied()
            .unwrap_or_default();
        upgraded.insert(key, status);
    }

    let dropped = existing
        .keys()
        .filter(|key| !upgraded.contains_key(*key))
        .count();
    if dropped > 0 {
        debug!(dropped, "pruned completion entries without a selection");
    }

    upgraded
}

/// Status for `record`, tolerating maps that still carry legacy keys.
pub fn lookup_status(map: &CompletionMap, record: &ExamRecord) -> CompletionStatus {
    map.get(&completion_key(record))
        .or_else(|| map.get(&legacy_completion_key(record)))
        .copied()
        .unwrap_or_default()
}
