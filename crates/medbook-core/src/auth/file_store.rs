use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::credentials::{CredentialStore, StorageKey, StoreError};

/// Credential file name in cache directory
const CREDENTIAL_FILE: &str = "credentials.json";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoredValues {
    values: BTreeMap<String, String>,
    updated_at: Option<DateTime<Utc>>,
}

/// Tokens persisted as JSON in the cache directory.
///
/// Every mutation rewrites the whole file through a temp file + rename, so a
/// reader never sees a half-written pair.
pub struct FileStore {
    path: PathBuf,
    // Serialises read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        Self {
            path: cache_dir.as_ref().join(CREDENTIAL_FILE),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Time of the last write, if the file exists.
    pub fn updated_at(&self) -> Result<Option<DateTime<Utc>>, StoreError> {
        let _guard = self.lock.lock()?;
        Ok(self.read()?.updated_at)
    }

    fn read(&self) -> Result<StoredValues, StoreError> {
        if !self.path.exists() {
            return Ok(StoredValues::default());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&contents)?)
    }

    fn write(&self, mut stored: StoredValues) -> Result<(), StoreError> {
        if stored.values.is_empty() {
            if self.path.exists() {
                std::fs::remove_file(&self.path)?;
                debug!(path = %self.path.display(), "Removed empty credential file");
            }
            return Ok(());
        }
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        stored.updated_at = Some(Utc::now());
        let contents = serde_json::to_string_pretty(&stored)?;
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn modify(&self, f: impl FnOnce(&mut BTreeMap<String, String>)) -> Result<(), StoreError> {
        let _guard = self.lock.lock()?;
        let mut stored = self.read()?;
        f(&mut stored.values);
        self.write(stored)
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: StorageKey) -> Result<Option<String>, StoreError> {
        let _guard = self.lock.lock()?;
        Ok(self.read()?.values.get(key.as_str()).cloned())
    }

    fn set(&self, key: StorageKey, value: &str) -> Result<(), StoreError> {
        self.modify(|values| {
            values.insert(key.as_str().to_string(), value.to_string());
        })
    }

    fn remove(&self, key: StorageKey) -> Result<(), StoreError> {
        self.modify(|values| {
            values.remove(key.as_str());
        })
    }

    fn clear(&self) -> Result<(), StoreError> {
        self.modify(BTreeMap::clear)
    }
}
