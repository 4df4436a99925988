use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Logical slots persisted by a scheduling session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    Selections,
    Completions,
    UserName,
    UserDeviation,
}

impl StoreKey {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Selections => "selections",
            Self::Completions => "completions",
            Self::UserName => "user_name",
            Self::UserDeviation => "user_deviation",
        }
    }
}

/// Key-value persistence capability injected into the session.
pub trait Store: Send + Sync {
    fn load(&self, key: StoreKey) -> Result<Option<String>, StoreError>;
    fn save(&self, key: StoreKey, value: &str) -> Result<(), StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
    #[error("failed to access '{key}': {source}")]
    Io {
        key: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("value stored under '{key}' is malformed: {source}")]
    Malformed {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("failed to encode '{key}': {source}")]
    Encode {
        key: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

pub(crate) fn read_json<S, T>(store: &S, key: StoreKey) -> Result<Option<T>, StoreError>
where
    S: Store + ?Sized,
    T: DeserializeOwned,
{
    match store.load(key)? {
        Some(raw) if !raw.trim().is_empty() => serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| StoreError::Malformed {
                key: key.as_str(),
                source,
            }),
        _ => Ok(None),
    }
}

pub(crate) fn write_json<S, T>(store: &S, key: StoreKey, value: &T) -> Result<(), StoreError>
where
    S: Store + ?Sized,
    T: Serialize + ?Sized,
{
    let raw = serde_json::to_string(value).map_err(|source| StoreError::Encode {
        key: key.as_str(),
        source,
    })?;
    store.save(key, &raw)
}

/// Process-local store, used by tests and the demo command.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<StoreKey, String>>,
}

impl MemoryStore {
    pub fn raw(&self, key: StoreKey) -> Option<String> {
        self.values
            .lock()
            .ok()
            .and_then(|values| values.get(&key).cloned())
    }
}

impl Store for MemoryStore {
    fn load(&self, key: StoreKey) -> Result<Option<String>, StoreError> {
        let values = self
            .values
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        Ok(values.get(&key).cloned())
    }

    fn save(&self, key: StoreKey, value: &str) -> Result<(), StoreError> {
        let mut values = self
            .values
            .lock()
            .map_err(|_| StoreError::Unavailable("memory store lock poisoned".to_string()))?;
        values.insert(key, value.to_string());
        Ok(())
    }
}

/// One JSON file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: StoreKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_str()))
    }
}

impl Store for FileStore {
    fn load(&self, key: StoreKey) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Io {
                key: key.as_str(),
                source,
            }),
        }
    }

    fn save(&self, key: StoreKey, value: &str) -> Result<(), StoreError> {
        let io_error = |source| StoreError::Io {
            key: key.as_str(),
            source,
        };
        fs::create_dir_all(&self.dir).map_err(io_error)?;
        fs::write(self.path_for(key), value).map_err(io_error)
    }
}
