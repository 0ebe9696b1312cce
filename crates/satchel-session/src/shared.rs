//! Application-wide key/value data shared by all clients.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};
use crate::session::Value;
use crate::store::SharedSessionStore;

/// Concurrency-safe global key/value store with no expiration.
///
/// One instance is created by the application and shared by `Arc`. It also
/// holds a replaceable reference to the active session store, so request
/// handlers can reach both from one place.
#[derive(Default)]
pub struct SharedDataStore {
    entries: RwLock<HashMap<String, Value>>,
    store: RwLock<Option<SharedSessionStore>>,
}

impl std::fmt::Debug for SharedDataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SharedDataStore")
            .field("entries", &self.len())
            .field("has_store", &self.store.read().is_some())
            .finish()
    }
}

impl SharedDataStore {
    /// Create an empty store with no session store attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a value.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.entries.read().get(key).cloned()
    }

    /// Get a value decoded as `T`. `Ok(None)` when absent.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get(key) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value)
                .map(Some)
                .map_err(|source| Error::Decode {
                    key: key.to_string(),
                    source,
                }),
        }
    }

    /// Insert or overwrite a value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.entries.write().insert(key.into(), value.into());
    }

    /// Encode `value` with serde and store it under `key`.
    pub fn set_as<T: Serialize + ?Sized>(&self, key: impl Into<String>, value: &T) -> Result<()> {
        let key = key.into();
        let value = serde_json::to_value(value).map_err(|source| Error::Encode {
            key: key.clone(),
            source,
        })?;
        self.set(key, value);
        Ok(())
    }

    /// Apply `f` to the value under `key` while holding the write lock.
    ///
    /// The closure receives `None` when the key is absent and returns the
    /// value to store. Use this for read-modify-write updates such as
    /// counters, which separate `get` and `set` calls would race on.
    pub fn update<F>(&self, key: &str, f: F) -> Value
    where
        F: FnOnce(Option<&Value>) -> Value,
    {
        let mut entries = self.entries.write();
        let value = f(entries.get(key));
        entries.insert(key.to_string(), value.clone());
        value
    }

    /// Remove a value, returning it if present.
    pub fn delete(&self, key: &str) -> Option<Value> {
        self.entries.write().remove(key)
    }

    /// Whether a key is present.
    pub fn has(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Remove all values. The session store reference is kept.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// All keys, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Number of stored values.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether no values are stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Replace the session store reference. Entries are unaffected.
    pub fn set_store(&self, store: Option<SharedSessionStore>) {
        *self.store.write() = store;
    }

    /// The current session store, if one is registered.
    pub fn store(&self) -> Option<SharedSessionStore> {
        self.store.read().clone()
    }
}
