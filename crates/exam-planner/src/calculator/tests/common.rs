use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::calculator::domain::{
    CalculatorSnapshot, ExamScores, InternalGrades, School, SchoolId, ScoreInput, SelectionEntry,
    UserId,
};
use crate::calculator::repository::{RepositoryError, SchoolRepository};
use crate::calculator::{calculator_router, CalculatorService};
use crate::config::CalculatorConfig;

/// All grades 3, all exams 80, no weights or additional categories.
pub(super) fn baseline_input() -> ScoreInput {
    ScoreInput {
        grades: InternalGrades::uniform(3),
        exams: ExamScores::from_values([80; 5]),
        ..ScoreInput::default()
    }
}

pub(super) fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, got {actual}"
    );
}

pub(super) fn build_service() -> (CalculatorService<MemoryRepository>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::default());
    let service = CalculatorService::new(repository.clone(), &CalculatorConfig::default());
    (service, repository)
}

pub(super) fn router_with_service(service: CalculatorService<MemoryRepository>) -> axum::Router {
    calculator_router(Arc::new(service))
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    schools: Arc<Mutex<BTreeMap<SchoolId, School>>>,
    selections: Arc<Mutex<HashMap<UserId, Vec<SelectionEntry>>>>,
    snapshots: Arc<Mutex<HashMap<UserId, CalculatorSnapshot>>>,
}

impl SchoolRepository for MemoryRepository {
    fn list(&self) -> Result<Vec<School>, RepositoryError> {
        let guard = self.schools.lock().expect("repository mutex poisoned");
        Ok(guard.values().cloned().collect())
    }

    fn fetch(&self, id: SchoolId) -> Result<Option<School>, RepositoryError> {
        let guard = self.schools.lock().expect("repository mutex poisoned");
        Ok(guard.get(&id).cloned())
    }

    fn insert(&self, school: School) -> Result<School, RepositoryError> {
        let mut guard = self.schools.lock().expect("repository mutex poisoned");
        if guard.contains_key(&school.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(school.id, school.clone());
        Ok(school)
    }

    fn update(&self, school: School) -> Result<(), RepositoryError> {
        let mut guard = self.schools.lock().expect("repository mutex poisoned");
        guard.insert(school.id, school);
        Ok(())
    }

    fn delete(&self, id: SchoolId) -> Result<bool, RepositoryError> {
        let mut guard = self.schools.lock().expect("repository mutex poisoned");
        Ok(guard.remove(&id).is_some())
    }

    fn selections(&self, user: UserId) -> Result<Vec<SelectionEntry>, RepositoryError> {
        let guard = self.selections.lock().expect("selection mutex poisoned");
        Ok(guard.get(&user).cloned().unwrap_or_default())
    }

    fn replace_selections(
        &self,
        user: UserId,
        entries: Vec<SelectionEntry>,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.selections.lock().expect("selection mutex poisoned");
        guard.insert(user, entries);
        Ok(())
    }

    fn purge_selections(&self, school: SchoolId) -> Result<usize, RepositoryError> {
        let mut guard = self.selections.lock().expect("selection mutex poisoned");
        let mut purged = 0;
        for entries in guard.values_mut() {
            let before = entries.len();
            entries.retain(|entry| entry.school_id != school);
            purged += before - entries.len();
        }
        Ok(purged)
    }

    fn snapshot(&self, user: UserId) -> Result<Option<CalculatorSnapshot>, RepositoryError> {
        let guard = self.snapshots.lock().expect("snapshot mutex poisoned");
        Ok(guard.get(&user).cloned())
    }

    fn save_snapshot(
        &self,
        user: UserId,
        snapshot: CalculatorSnapshot,
    ) -> Result<(), RepositoryError> {
        let mut guard = self.snapshots.lock().expect("snapshot mutex poisoned");
        guard.insert(user, snapshot);
        Ok(())
    }
}

pub(super) struct UnavailableRepository;

impl SchoolRepository for UnavailableRepository {
    fn list(&self) -> Result<Vec<School>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: SchoolId) -> Result<Option<School>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn insert(&self, _school: School) -> Result<School, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _school: School) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn delete(&self, _id: SchoolId) -> Result<bool, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn selections(&self, _user: UserId) -> Result<Vec<SelectionEntry>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn replace_selections(
        &self,
        _user: UserId,
        _entries: Vec<SelectionEntry>,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn purge_selections(&self, _school: SchoolId) -> Result<usize, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn snapshot(&self, _user: UserId) -> Result<Option<CalculatorSnapshot>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn save_snapshot(
        &self,
        _user: UserId,
        _snapshot: CalculatorSnapshot,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
