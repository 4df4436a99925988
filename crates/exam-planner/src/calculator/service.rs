use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::adjust::rescale_exam_scores;
use super::classify::{school_results, SchoolResult};
use super::domain::{
    CalculatorSnapshot, ExamScores, PatternType, School, SchoolDraft, SchoolId, SchoolUpdate,
    ScoreInput, SelectedSchool, SelectionEntry, UserId,
};
use super::engine::ScoreEngine;
use super::repository::{RepositoryError, SchoolRepository};
use crate::config::CalculatorConfig;

/// Rejected school definitions.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("school name must not be empty")]
    EmptyName,
    #[error("ratio {test}:{naishin} must be non-negative with a positive sum")]
    InvalidRatio { test: f64, naishin: f64 },
    #[error("{field} must be a non-negative number, got {value}")]
    InvalidPassRate { field: &'static str, value: f64 },
}

/// Error raised by the calculator service.
#[derive(Debug, thiserror::Error)]
pub enum CalculatorServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("school {0} not found")]
    SchoolNotFound(SchoolId),
    #[error("school {0} is already selected")]
    AlreadySelected(SchoolId),
    #[error("school {0} is not selected")]
    NotSelected(SchoolId),
    #[error("no calculator inputs were supplied or saved")]
    MissingInputs,
}

/// Scores to evaluate; falls back to the user's saved snapshot when `input` is absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EvaluationRequest {
    #[serde(default)]
    pub input: Option<ScoreInput>,
    /// What-if raw exam total (0-500) redistributed across the entered subjects.
    #[serde(default)]
    pub adjusted_test_total: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub input: ScoreInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adjusted_exams: Option<ExamScores>,
    pub schools: Vec<SchoolResult>,
}

/// Service composing the school repository and the score engine.
pub struct CalculatorService<R> {
    repository: Arc<R>,
    engine: ScoreEngine,
    sequence: AtomicU64,
}

impl<R> CalculatorService<R>
where
    R: SchoolRepository + 'static,
{
    pub fn new(repository: Arc<R>, config: &CalculatorConfig) -> Self {
        Self {
            repository,
            engine: ScoreEngine::new(config),
            sequence: AtomicU64::new(1),
        }
    }

    pub fn engine(&self) -> &ScoreEngine {
        &self.engine
    }

    pub fn list_schools(&self) -> Result<Vec<School>, CalculatorServiceError> {
        let mut schools = self.repository.list()?;
        schools.sort_by_key(|school| school.id);
        Ok(schools)
    }

    pub fn school(&self, id: SchoolId) -> Result<School, CalculatorServiceError> {
        self.repository
            .fetch(id)?
            .ok_or(CalculatorServiceError::SchoolNotFound(id))
    }

    pub fn create_school(
        &self,
        user: UserId,
        draft: SchoolDraft,
    ) -> Result<School, CalculatorServiceError> {
        let now = Utc::now();
        let school = School {
            id: self.next_school_id()?,
            name: draft.name.trim().to_string(),
            pattern_type: draft.pattern_type,
            ratio_test: draft.ratio_test,
            ratio_naishin: draft.ratio_naishin,
            pass_rate_80: draft.pass_rate_80,
            pass_rate_60: draft.pass_rate_60,
            created_by: user,
            created_at: now,
            updated_at: now,
        };
        validate(&school)?;

        let stored = self.repository.insert(school)?;
        info!(
            school_id = %stored.id,
            name = %stored.name,
            pattern = stored.pattern_type.label(),
            "school created"
        );
        Ok(stored)
    }

    pub fn update_school(
        &self,
        id: SchoolId,
        update: SchoolUpdate,
    ) -> Result<School, CalculatorServiceError> {
        let mut school = self.school(id)?;
        update.apply(&mut school);
        school.name = school.name.trim().to_string();
        validate(&school)?;
        school.updated_at = Utc::now();

        self.repository.update(school.clone())?;
        info!(school_id = %id, "school updated");
        Ok(school)
    }

    pub fn delete_school(&self, id: SchoolId) -> Result<(), CalculatorServiceError> {
        if !self.repository.delete(id)? {
            return Err(CalculatorServiceError::SchoolNotFound(id));
        }
        let purged = self.repository.purge_selections(id)?;
        info!(school_id = %id, purged, "school deleted");
        Ok(())
    }

    /// Selected schools in display order; entries whose school vanished are skipped.
    pub fn selected_schools(
        &self,
        user: UserId,
    ) -> Result<Vec<SelectedSchool>, CalculatorServiceError> {
        let mut entries = self.repository.selections(user)?;
        entries.sort_by_key(|entry| (entry.display_order, entry.school_id));

        let mut selected = Vec::with_capacity(entries.len());
        for entry in entries {
            match self.repository.fetch(entry.school_id)? {
                Some(school) => selected.push(SelectedSchool {
                    school,
                    display_order: entry.display_order,
                }),
                None => debug!(school_id = %entry.school_id, "skipping stale selection"),
            }
        }
        Ok(selected)
    }

    /// Adds a school to the user's list, appending it when no position is given.
    pub fn add_selected(
        &self,
        user: UserId,
        school_id: SchoolId,
        display_order: Option<u32>,
    ) -> Result<SelectionEntry, CalculatorServiceError> {
        self.school(school_id)?;
        let mut entries = self.repository.selections(user)?;
        if entries.iter().any(|entry| entry.school_id == school_id) {
            return Err(CalculatorServiceError::AlreadySelected(school_id));
        }

        let display_order = display_order.unwrap_or_else(|| {
            entries
                .iter()
                .map(|entry| entry.display_order + 1)
                .max()
                .unwrap_or(0)
        });
        let entry = SelectionEntry {
            school_id,
            display_order,
        };
        entries.push(entry);
        self.repository.replace_selections(user, entries)?;

        debug!(%user, school_id = %school_id, display_order, "school selected");
        Ok(entry)
    }

    pub fn remove_selected(
        &self,
        user: UserId,
        school_id: SchoolId,
    ) -> Result<(), CalculatorServiceError> {
        let mut entries = self.repository.selections(user)?;
        let before = entries.len();
        entries.retain(|entry| entry.school_id != school_id);
        if entries.len() == before {
            return Err(CalculatorServiceError::NotSelected(school_id));
        }
        self.repository.replace_selections(user, entries)?;
        Ok(())
    }

    pub fn clear_selected(&self, user: UserId) -> Result<(), CalculatorServiceError> {
        self.repository.replace_selections(user, Vec::new())?;
        debug!(%user, "selection cleared");
        Ok(())
    }

    /// Assigns new positions; every listed school must already be selected.
    pub fn reorder_selected(
        &self,
        user: UserId,
        order: &[SelectionEntry],
    ) -> Result<Vec<SelectedSchool>, CalculatorServiceError> {
        let mut entries = self.repository.selections(user)?;
        let known: HashSet<SchoolId> = entries.iter().map(|entry| entry.school_id).collect();
        if let Some(missing) = order.iter().find(|item| !known.contains(&item.school_id)) {
            return Err(CalculatorServiceError::NotSelected(missing.school_id));
        }

        for entry in entries.iter_mut() {
            if let Some(item) = order.iter().find(|item| item.school_id == entry.school_id) {
                entry.display_order = item.display_order;
            }
        }
        self.repository.replace_selections(user, entries)?;
        self.selected_schools(user)
    }

    pub fn snapshot(
        &self,
        user: UserId,
    ) -> Result<Option<CalculatorSnapshot>, CalculatorServiceError> {
        Ok(self.repository.snapshot(user)?)
    }

    /// Stores a clamped copy of `snapshot` for `user`, keeping the first save time.
    pub fn save_snapshot(
        &self,
        user: UserId,
        snapshot: CalculatorSnapshot,
    ) -> Result<CalculatorSnapshot, CalculatorServiceError> {
        let created_at = self
            .repository
            .snapshot(user)?
            .and_then(|existing| existing.created_at);
        let now = Utc::now();

        let mut stored = CalculatorSnapshot::from_input(&snapshot.to_input());
        stored.user_id = Some(user);
        stored.created_at = created_at.or(Some(now));
        stored.updated_at = Some(now);

        self.repository.save_snapshot(user, stored.clone())?;
        debug!(%user, "calculator snapshot saved");
        Ok(stored)
    }

    /// Scores the user's selected schools.
    pub fn evaluate(
        &self,
        user: UserId,
        request: EvaluationRequest,
    ) -> Result<Evaluation, CalculatorServiceError> {
        let input = match request.input {
            Some(input) => input.clamped(),
            None => self
                .repository
                .snapshot(user)?
                .map(|snapshot| snapshot.to_input())
                .ok_or(CalculatorServiceError::MissingInputs)?,
        };

        let adjusted_exams = request
            .adjusted_test_total
            .map(|total| rescale_exam_scores(&input.exams, total));
        let effective = adjusted_exams.map_or(input, |exams| input.with_exams(exams));

        let selected = self.selected_schools(user)?;
        let schools = school_results(&self.engine, &effective, &selected);
        debug!(%user, schools = schools.len(), "selected schools evaluated");

        Ok(Evaluation {
            input: effective,
            adjusted_exams,
            schools,
        })
    }

    fn next_school_id(&self) -> Result<SchoolId, RepositoryError> {
        let floor = self
            .repository
            .list()?
            .iter()
            .map(|school| school.id.0 + 1)
            .max()
            .unwrap_or(1);
        self.sequence.fetch_max(floor, Ordering::Relaxed);
        Ok(SchoolId(self.sequence.fetch_add(1, Ordering::Relaxed)))
    }
}

fn validate(school: &School) -> Result<(), ValidationError> {
    if school.name.is_empty() {
        return Err(ValidationError::EmptyName);
    }

    if school.pattern_type == PatternType::Ratio {
        let (test, naishin) = (school.ratio_test, school.ratio_naishin);
        let sum = test + naishin;
        if !(test >= 0.0 && naishin >= 0.0 && sum > 0.0 && sum.is_finite()) {
            return Err(ValidationError::InvalidRatio { test, naishin });
        }
    }

    for (field, rate) in [
        ("pass_rate_80", school.pass_rate_80),
        ("pass_rate_60", school.pass_rate_60),
    ] {
        if let Some(value) = rate {
            if !(value.is_finite() && value >= 0.0) {
                return Err(ValidationError::InvalidPassRate { field, value });
            }
        }
    }

    Ok(())
}
