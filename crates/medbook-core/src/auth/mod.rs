//! Authentication module for managing sessions and credentials.
//!
//! This module provides:
//! - `AuthenticatedSession`: bearer-token requests with one-shot refresh on 401
//! - `CredentialStore`: token storage, backed by memory, a JSON file or the OS keyring

pub mod credentials;
pub mod file_store;
pub mod session;

pub use credentials::{Credential, CredentialStore, KeyringStore, MemoryStore, StorageKey, StoreError};
pub use file_store::FileStore;
pub use session::{AuthenticatedSession, Endpoints, LoginOutcome, RegistrationOutcome, SessionState};
