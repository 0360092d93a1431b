//! Secure key-value storage abstraction
//!
//! The host supplies an encrypted preference store (Keychain, encrypted
//! SharedPreferences, ...). The core only ever reads and writes opaque
//! strings keyed by site identity.

use std::collections::HashMap;
use std::sync::Mutex;
use thiserror::Error;

/// Storage backend errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage backend failure: {0}")]
    Backend(String),
}

/// Encrypted key-value store provided by the host platform
pub trait SecureStorage: Send + Sync {
    /// Read a value, `None` if absent
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write or replace a value
    fn put(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Remove a value; removing an absent key is not an error
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// In-memory storage, used in tests and as a fallback for hosts without
/// persistent secure storage (sessions then live for the process only).
#[derive(Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, String>>, StorageError> {
        self.entries
            .lock()
            .map_err(|_| StorageError::Backend("storage mutex poisoned".to_string()))
    }
}

impl SecureStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.lock()?.get(key).cloned())
    }

    fn put(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.lock()?.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.lock()?.remove(key);
        Ok(())
    }
}
