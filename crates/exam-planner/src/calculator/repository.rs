use super::domain::{CalculatorSnapshot, School, SchoolId, SelectionEntry, UserId};

/// Storage abstraction so the service module can be exercised in isolation.
pub trait SchoolRepository: Send + Sync {
    fn list(&self) -> Result<Vec<School>, RepositoryError>;
    fn fetch(&self, id: SchoolId) -> Result<Option<School>, RepositoryError>;
    fn insert(&self, school: School) -> Result<School, RepositoryError>;
    fn update(&self, school: School) -> Result<(), RepositoryError>;
    /// Returns whether a school was removed.
    fn delete(&self, id: SchoolId) -> Result<bool, RepositoryError>;

    /// The user's selected schools, in no particular order.
    fn selections(&self, user: UserId) -> Result<Vec<SelectionEntry>, RepositoryError>;
    fn replace_selections(
        &self,
        user: UserId,
        entries: Vec<SelectionEntry>,
    ) -> Result<(), RepositoryError>;
    /// Drops `school` from every user's selection; returns how many entries went away.
    fn purge_selections(&self, school: SchoolId) -> Result<usize, RepositoryError>;

    fn snapshot(&self, user: UserId) -> Result<Option<CalculatorSnapshot>, RepositoryError>;
    fn save_snapshot(
        &self,
        user: UserId,
        snapshot: CalculatorSnapshot,
    ) -> Result<(), RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
