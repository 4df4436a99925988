//! Exam-date selection among competing entrance exams and deadline tracking.
//!
//! Records are grouped by exam date into an [`ExamBoard`]; a [`ScheduleSession`] walks
//! the dates in order, committing one record (or the decline sentinel) per date and
//! tracking four acknowledgement flags per committed record.

pub mod calendar;
mod completion;
pub mod deviation;
pub mod domain;
pub mod keys;
pub mod loader;
mod session;
pub mod store;

#[cfg(test)]
mod tests;

pub use calendar::{
    admission_date, admission_order, compare_dates, dday_label, group_by_date, order_dates,
    DateGroups, ExamBoard,
};
pub use completion::CompletionTracker;
pub use deviation::{sort_candidates, DeviationBand, SortOrder};
pub use domain::{
    CompletionField, CompletionMap, CompletionStatus, ExamRecord, MonthDay, SelectionMap,
    UserProfile, DECLINE_LABEL,
};
pub use keys::{completion_key, legacy_completion_key, migrate, record_identity};
pub use loader::{load_records_from_csv, load_records_from_json, load_records_from_path, LoadError};
pub use session::{MilestoneView, Phase, ScheduleError, ScheduleSession, SummaryEntry};
pub use store::{FileStore, MemoryStore, Store, StoreError, StoreKey};
