use chrono::NaiveDate;
use exam_planner::calculator::{
    CalculatorSnapshot, RepositoryError, School, SchoolId, SchoolRepository, SelectionEntry,
    UserId,
};
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local school storage backing the HTTP service and the demo.
#[derive(Default, Clone)]
pub(crate) struct InMemorySchoolRepository {
    schools: Arc<Mutex<BTreeMap<SchoolId, School>>>,
    selections: Arc<Mutex<HashMap<UserId, Vec<SelectionEntry>>>>,
    snapshots: Arc<Mutex<HashMap<UserId, CalculatorSnapshot>>>,
}

fn lock<T>(mutex: &Mutex<T>) -> Result<MutexGuard<'_, T>, RepositoryError> {
    mutex
        .lock()
        .map_err(|_| RepositoryError::Unavailable("repository mutex poisoned".to_string()))
}

impl SchoolRepository for InMemorySchoolRepository {
    fn list(&self) -> Result<Vec<School>, RepositoryError> {
        Ok(lock(&self.schools)?.values().cloned().collect())
    }

    fn fetch(&self, id: SchoolId) -> Result<Option<School>, RepositoryError> {
        Ok(lock(&self.schools)?.get(&id).cloned())
    }

    fn insert(&self, school: School) -> Result<School, RepositoryError> {
        let mut guard = lock(&self.schools)?;
        if guard.contains_key(&school.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(school.id, school.clone());
        Ok(school)
    }

    fn update(&self, school: School) -> Result<(), RepositoryError> {
        let mut guard = lock(&self.schools)?;
        if guard.contains_key(&school.id) {
            guard.insert(school.id, school);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }

    fn delete(&self, id: SchoolId) -> Result<bool, RepositoryError> {
        Ok(lock(&self.schools)?.remove(&id).is_some())
    }

    fn selections(&self, user: UserId) -> Result<Vec<SelectionEntry>, RepositoryError> {
        Ok(lock(&self.selections)?
            .get(&user)
            .cloned()
            .unwrap_or_default())
    }

    fn replace_selections(
        &self,
        user: UserId,
        entries: Vec<SelectionEntry>,
    ) -> Result<(), RepositoryError> {
        lock(&self.selections)?.insert(user, entries);
        Ok(())
    }

    fn purge_selections(&self, school: SchoolId) -> Result<usize, RepositoryError> {
        let mut guard = lock(&self.selections)?;
        let mut purged = 0;
        for entries in guard.values_mut() {
            let before = entries.len();
            entries.retain(|entry| entry.school_id != school);
            purged += before - entries.len();
        }
        Ok(purged)
    }

    fn snapshot(&self, user: UserId) -> Result<Option<CalculatorSnapshot>, RepositoryError> {
        Ok(lock(&self.snapshots)?.get(&user).cloned())
    }

    fn save_snapshot(
        &self,
        user: UserId,
        snapshot: CalculatorSnapshot,
    ) -> Result<(), RepositoryError> {
        lock(&self.snapshots)?.insert(user, snapshot);
        Ok(())
    }
}

pub(crate) fn parse_date(raw: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
        .map_err(|err| format!("failed to parse '{raw}' as YYYY-MM-DD ({err})"))
}

pub(crate) fn deserialize_optional_date<'de, D>(
    deserializer: D,
) -> Result<Option<NaiveDate>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    opt.map(|value| parse_date(&value).map_err(serde::de::Error::custom))
        .transpose()
}

/// Comma-separated list of exactly `N` values, e.g. `5,4,5,4,4`.
pub(crate) fn parse_list<T, const N: usize>(raw: &str) -> Result<[T; N], String>
where
    T: std::str::FromStr + Copy + Default,
{
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    if parts.len() != N {
        return Err(format!("expected {N} comma-separated values, got {}", parts.len()));
    }

    let mut values = [T::default(); N];
    for (slot, part) in values.iter_mut().zip(parts) {
        *slot = part
            .parse::<T>()
            .map_err(|_| format!("'{part}' is not a valid number"))?;
    }
    Ok(values)
}
