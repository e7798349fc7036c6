use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};

use keyring::Entry;
use thiserror::Error;
use tracing::{debug, warn};

/// Keychain service name for stored tokens
const SERVICE_NAME: &str = "medbook";

/// Fixed storage slots. At most one credential pair exists at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    Access,
    Refresh,
    /// Cached role string, for display only.
    Role,
}

impl StorageKey {
    pub const ALL: [StorageKey; 3] = [StorageKey::Access, StorageKey::Refresh, StorageKey::Role];

    pub fn as_str(&self) -> &'static str {
        match self {
            StorageKey::Access => "access",
            StorageKey::Refresh => "refresh",
            StorageKey::Role => "role",
        }
    }
}

/// Access/refresh token pair issued by the backend.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access: String,
    pub refresh: String,
}

// Tokens stay out of logs and panic messages.
impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("keychain error: {0}")]
    Keyring(#[from] keyring::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed credential file: {0}")]
    Format(#[from] serde_json::Error),

    #[error("credential store lock poisoned")]
    Poisoned,

    #[error("the keychain did not keep the stored value; use the file credential backend instead")]
    NotPersisted,
}

impl<T> From<PoisonError<T>> for StoreError {
    fn from(_: PoisonError<T>) -> Self {
        StoreError::Poisoned
    }
}

/// Persistent key/value storage for the session's tokens.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: StorageKey) -> Result<Option<String>, StoreError>;

    fn set(&self, key: StorageKey, value: &str) -> Result<(), StoreError>;

    /// Remove a key. Removing a missing key is not an error.
    fn remove(&self, key: StorageKey) -> Result<(), StoreError>;

    /// Remove every key. All keys are attempted even if one fails; the first
    /// failure is returned.
    fn clear(&self) -> Result<(), StoreError> {
        let mut first_err = None;
        for key in StorageKey::ALL {
            if let Err(e) = self.remove(key) {
                first_err.get_or_insert(e);
            }
        }
        first_err.map_or(Ok(()), Err)
    }

    /// Both tokens, if both are present.
    fn credential(&self) -> Result<Option<Credential>, StoreError> {
        let access = self.get(StorageKey::Access)?;
        let refresh = self.get(StorageKey::Refresh)?;
        Ok(access.zip(refresh).map(|(access, refresh)| Credential { access, refresh }))
    }

    /// Replace the stored pair, dropping any previous one.
    fn store_credential(&self, credential: &Credential) -> Result<(), StoreError> {
        self.set(StorageKey::Access, &credential.access)?;
        self.set(StorageKey::Refresh, &credential.refresh)
    }
}

/// Process-local store. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<StorageKey, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store with a credential pair.
    pub fn with_credential(access: &str, refresh: &str) -> Self {
        let store = Self::new();
        if let Ok(mut values) = store.values.lock() {
            values.insert(StorageKey::Access, access.to_string());
            values.insert(StorageKey::Refresh, refresh.to_string());
        }
        store
    }
}

impl CredentialStore for MemoryStore {
    fn get(&self, key: StorageKey) -> Result<Option<String>, StoreError> {
        Ok(self.values.lock()?.get(&key).cloned())
    }

    fn set(&self, key: StorageKey, value: &str) -> Result<(), StoreError> {
        self.values.lock()?.insert(key, value.to_string());
        Ok(())
    }

    fn remove(&self, key: StorageKey) -> Result<(), StoreError> {
        self.values.lock()?.remove(&key);
        Ok(())
    }
}

/// Tokens kept in the OS keychain, one entry per storage key.
#[derive(Debug, Clone)]
pub struct KeyringStore {
    service: String,
}

impl Default for KeyringStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyringStore {
    pub fn new() -> Self {
        Self {
            service: SERVICE_NAME.to_string(),
        }
    }

    /// Use a different keychain service, e.g. one per backend.
    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    fn entry(&self, key: StorageKey) -> Result<Entry, StoreError> {
        Ok(Entry::new(&self.service, key.as_str())?)
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self, key: StorageKey) -> Result<Option<String>, StoreError> {
        match self.entry(key)?.get_password() {
            Ok(value) => Ok(Some(value)),
            Err(keyring::Error::NoEntry) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: StorageKey, value: &str) -> Result<(), StoreError> {
        self.entry(key)?.set_password(value)?;
        read_back(&self.entry(key)?, value)
    }

    fn remove(&self, key: StorageKey) -> Result<(), StoreError> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => {
                debug!(key = key.as_str(), error = %e, "Failed to delete keychain entry");
                Err(e.into())
            }
        }
    }
}

/// Check a fresh entry sees the value just written. Keyring's mock store,
/// used when no platform backend is compiled in, accepts writes and then
/// hands every new entry back empty.
fn read_back(fresh: &Entry, expected: &str) -> Result<(), StoreError> {
    match fresh.get_password() {
        Ok(stored) if stored == expected => Ok(()),
        Ok(_) | Err(keyring::Error::NoEntry) => {
            warn!("Keychain write was not persisted");
            Err(StoreError::NotPersisted)
        }
        Err(e) => Err(e.into()),
    }
}
