use std::sync::Arc;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use super::calendar::{dday_label, ExamBoard};
use super::completion::CompletionTracker;
use super::deviation::{sort_candidates, DeviationBand, SortOrder};
use super::domain::{
    CompletionField, CompletionMap, CompletionStatus, ExamRecord, SelectionMap, UserProfile,
    DEFAULT_USER_DEVIATION,
};
use super::keys::completion_key;
use super::store::{read_json, write_json, Store, StoreKey};

/// Where the user is in the date-by-date selection flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Start,
    Select,
    Summary,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScheduleError {
    #[error("exam date '{0}' is not part of the loaded schedule")]
    UnknownDate(String),
    #[error("record dated '{record_date}' cannot be committed to '{date}'")]
    DateMismatch { date: String, record_date: String },
    #[error("date index {index} is out of range ({len} dates loaded)")]
    CursorOutOfRange { index: usize, len: usize },
    #[error("nothing has been selected for '{0}'")]
    NotSelected(String),
}

/// One milestone line of a summary card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MilestoneView {
    pub field: CompletionField,
    pub label: &'static str,
    pub date: String,
    pub dday: String,
    pub done: bool,
}

/// A committed (non-declined) school in the summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryEntry {
    pub date: String,
    pub key: String,
    pub record: ExamRecord,
    pub status: CompletionStatus,
    pub band: DeviationBand,
    pub milestones: Vec<MilestoneView>,
}

/// Per-date selection state, completion flags and the persisted user profile.
///
/// Every mutation is written back through the injected [`Store`]; write failures are
/// logged and otherwise ignored, load failures start from empty state.
pub struct ScheduleSession<S> {
    board: ExamBoard,
    store: Arc<S>,
    selections: SelectionMap,
    completions: CompletionTracker,
    profile: UserProfile,
    phase: Phase,
    cursor: usize,
}

impl<S> ScheduleSession<S>
where
    S: Store + 'static,
{
    pub fn open(board: ExamBoard, store: Arc<S>) -> Self {
        let selections: SelectionMap = load_or_default(store.as_ref(), StoreKey::Selections);
        let completions: CompletionMap = load_or_default(store.as_ref(), StoreKey::Completions);
        let profile = load_profile(store.as_ref());

        let mut session = Self {
            board,
            store,
            selections,
            completions: CompletionTracker::new(completions),
            profile,
            phase: Phase::Start,
            cursor: 0,
        };
        session.reconcile_completions();

        info!(
            dates = session.board.dates().len(),
            selected = session.selections.len(),
            "schedule session opened"
        );
        session
    }

    pub fn board(&self) -> &ExamBoard {
        &self.board
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn profile(&self) -> &UserProfile {
        &self.profile
    }

    pub fn selections(&self) -> &SelectionMap {
        &self.selections
    }

    pub fn completions(&self) -> &CompletionTracker {
        &self.completions
    }

    pub fn selection(&self, date: &str) -> Option<&ExamRecord> {
        self.selections.get(date)
    }

    /// Stores the profile and enters the selection view.
    pub fn start(&mut self, profile: UserProfile) {
        if let Err(err) = self.store.save(StoreKey::UserName, &profile.name) {
            warn!(error = %err, "failed to persist user name");
        }
        if let Err(err) = self
            .store
            .save(StoreKey::UserDeviation, &profile.deviation.to_string())
        {
            warn!(error = %err, "failed to persist user deviation");
        }
        self.profile = profile;
        self.phase = Phase::Select;
    }

    pub fn current_date(&self) -> Option<&str> {
        self.board.dates().get(self.cursor).map(String::as_str)
    }

    /// Records on the cursor date in display order.
    pub fn candidates(&self, order: SortOrder) -> Vec<ExamRecord> {
        self.current_date()
            .map(|date| sort_candidates(self.board.records_on(date), order))
            .unwrap_or_default()
    }

    /// The decline sentinel for the cursor date.
    pub fn decline_option(&self) -> Option<ExamRecord> {
        self.current_date().map(ExamRecord::decline)
    }

    pub fn go_to(&mut self, index: usize) -> Result<(), ScheduleError> {
        let len = self.board.dates().len();
        if index >= len {
            return Err(ScheduleError::CursorOutOfRange { index, len });
        }
        self.cursor = index;
        Ok(())
    }

    /// Every loaded date has a committed record or decline.
    pub fn all_selected(&self) -> bool {
        !self.board.is_empty()
            && self
                .board
                .dates()
                .iter()
                .all(|date| self.selections.contains_key(date))
    }

    pub fn remaining_dates(&self) -> Vec<String> {
        self.board
            .dates()
            .iter()
            .filter(|date| !self.selections.contains_key(*date))
            .cloned()
            .collect()
    }

    /// Commits `record` for `date`, then advances the cursor or, on the last date with
    /// every date decided, moves to the summary.
    pub fn confirm(&mut self, date: &str, record: ExamRecord) -> Result<Phase, ScheduleError> {
        let Some(index) = self.board.position(date) else {
            return Err(ScheduleError::UnknownDate(date.to_string()));
        };
        if record.exam_date != date {
            return Err(ScheduleError::DateMismatch {
                date: date.to_string(),
                record_date: record.exam_date,
            });
        }

        info!(
            date,
            school = %record.school_name,
            declined = record.is_decline(),
            "selection confirmed"
        );
        self.selections.insert(date.to_string(), record);
        self.persist(StoreKey::Selections, &self.selections);
        self.reconcile_completions();

        let last = self.board.dates().len() - 1;
        if index < last {
            self.cursor = index + 1;
        } else if self.all_selected() {
            self.phase = Phase::Summary;
        }

        Ok(self.phase)
    }

    /// Declines every undecided date and jumps to the summary.
    pub fn decline_all(&mut self) -> Vec<String> {
        let remaining = self.remaining_dates();
        for date in &remaining {
            self.selections
                .insert(date.clone(), ExamRecord::decline(date.as_str()));
        }

        info!(declined = remaining.len(), "remaining dates declined");
        self.persist(StoreKey::Selections, &self.selections);
        self.reconcile_completions();
        self.phase = Phase::Summary;
        remaining
    }

    /// Enters the summary when every date is decided; returns whether it did.
    pub fn finish(&mut self) -> bool {
        if self.all_selected() {
            self.phase = Phase::Summary;
            true
        } else {
            false
        }
    }

    pub fn revisit(&mut self, date: &str) -> Result<(), ScheduleError> {
        let index = self
            .board
            .position(date)
            .ok_or_else(|| ScheduleError::UnknownDate(date.to_string()))?;
        self.cursor = index;
        self.phase = Phase::Select;
        Ok(())
    }

    /// Clears every selection and completion flag and returns to the start screen.
    pub fn reset(&mut self) {
        self.selections.clear();
        self.completions.clear();
        self.persist(StoreKey::Selections, &self.selections);
        self.persist(StoreKey::Completions, self.completions.as_map());
        self.phase = Phase::Start;
        self.cursor = 0;
        info!("schedule reset");
    }

    pub fn toggle_completion(&mut self, key: &str, field: CompletionField) -> CompletionStatus {
        let status = self.completions.toggle(key, field);
        debug!(key, ?field, done = status.get(field), "completion toggled");
        self.persist(StoreKey::Completions, self.completions.as_map());
        status
    }

    /// Toggles a milestone of whatever is committed on `date`.
    pub fn toggle_for_date(
        &mut self,
        date: &str,
        field: CompletionField,
    ) -> Result<CompletionStatus, ScheduleError> {
        let key = self
            .selections
            .get(date)
            .map(completion_key)
            .ok_or_else(|| ScheduleError::NotSelected(date.to_string()))?;
        Ok(self.toggle_completion(&key, field))
    }

    /// Committed schools in date order, declines omitted.
    pub fn summary(&self, today: NaiveDate) -> Vec<SummaryEntry> {
        self.board
            .dates()
            .iter()
            .filter_map(|date| {
                let record = self.selections.get(date)?;
                if record.is_decline() {
                    return None;
                }
                let status = self.completions.status_for(record);
                let milestones = CompletionField::ordered()
                    .into_iter()
                    .map(|field| {
                        let raw = record.milestone(field);
                        MilestoneView {
                            field,
                            label: field.label(),
                            date: raw.to_string(),
                            dday: dday_label(raw, today),
                            done: status.get(field),
                        }
                    })
                    .collect();

                Some(SummaryEntry {
                    date: date.clone(),
                    key: completion_key(record),
                    band: DeviationBand::classify(record.deviation, self.profile.deviation),
                    record: record.clone(),
                    status,
                    milestones,
                })
            })
            .collect()
    }

    fn reconcile_completions(&mut self) {
        if self.completions.reconcile(&self.selections) {
            debug!(
                entries = self.completions.len(),
                "completion map migrated to current selections"
            );
            self.persist(StoreKey::Completions, self.completions.as_map());
        }
    }

    fn persist<T: Serialize + ?Sized>(&self, key: StoreKey, value: &T) {
        if let Err(err) = write_json(self.store.as_ref(), key, value) {
            warn!(key = key.as_str(), error = %err, "failed to persist schedule state");
        }
    }
}

fn load_or_default<S, T>(store: &S, key: StoreKey) -> T
where
    S: Store + ?Sized,
    T: DeserializeOwned + Default,
{
    match read_json(store, key) {
        Ok(Some(value)) => value,
        Ok(None) => T::default(),
        Err(err) => {
            warn!(key = key.as_str(), error = %err, "starting from empty state");
            T::default()
        }
    }
}

fn load_profile<S: Store + ?Sized>(store: &S) -> UserProfile {
    let name = store
        .load(StoreKey::UserName)
        .unwrap_or_else(|err| {
            warn!(error = %err, "failed to load user name");
            None
        })
        .unwrap_or_default();
    let deviation = store
        .load(StoreKey::UserDeviation)
        .unwrap_or_else(|err| {
            warn!(error = %err, "failed to load user deviation");
            None
        })
        .and_then(|raw| raw.trim().parse::<i32>().ok())
        .filter(|value| *value != 0)
        .unwrap_or(DEFAULT_USER_DEVIATION);

    UserProfile::new(&name, deviation)
}
