//! Per-client session state with sliding expiration.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{Error, Result};

/// Value stored in a session payload or the shared data store.
///
/// Payloads hold arbitrary application data, so values are kept as JSON
/// values rather than a type fixed per store. Use the `get_as` / `set_as`
/// accessors to move typed data in and out through serde.
pub type Value = serde_json::Value;

/// Mutable part of a session, guarded by one lock.
#[derive(Debug)]
struct SessionState {
    payload: HashMap<String, Value>,
    last_accessed_at: Instant,
    expiration: Duration,
}

/// A concurrency-safe container of per-client key/value state.
///
/// A session is expired once more than [`expiration`](Session::expiration)
/// has elapsed since its last access. Calling [`update`](Session::update)
/// slides the window forward. Expiry is always computed against the current
/// time, never cached.
///
/// Sessions are shared as `Arc<Session>` between the registry and request
/// handlers. Handlers may mutate the payload; only the registry removes a
/// session.
#[derive(Debug)]
pub struct Session {
    id: String,
    created_at: Instant,
    state: RwLock<SessionState>,
}

impl Session {
    /// Create a session with a freshly generated random identifier.
    pub fn new(expiration: Duration) -> Self {
        Self::with_id(generate_session_id(), expiration)
    }

    /// Create a session under a caller-supplied identifier.
    pub fn with_id(id: impl Into<String>, expiration: Duration) -> Self {
        let now = Instant::now();
        Self {
            id: id.into(),
            created_at: now,
            state: RwLock::new(SessionState {
                payload: HashMap::new(),
                last_accessed_at: now,
                expiration,
            }),
        }
    }

    /// The session's identifier.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// When the session was created.
    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// When the session was last accessed.
    pub fn last_accessed_at(&self) -> Instant {
        self.state.read().last_accessed_at
    }

    /// The sliding expiration window of this session.
    pub fn expiration(&self) -> Duration {
        self.state.read().expiration
    }

    /// Change the expiration window of this session only.
    pub fn set_expiration(&self, expiration: Duration) {
        self.state.write().expiration = expiration;
    }

    /// Mark the session as accessed now, restarting its expiration window.
    pub fn update(&self) {
        self.state.write().last_accessed_at = Instant::now();
    }

    /// Whether more than the expiration window has elapsed since last access.
    pub fn is_expired(&self) -> bool {
        let state = self.state.read();
        state.last_accessed_at.elapsed() > state.expiration
    }

    /// Time elapsed since the last access.
    pub fn idle_for(&self) -> Duration {
        self.state.read().last_accessed_at.elapsed()
    }

    /// Time left before the session expires, or `None` if it already has.
    pub fn expires_in(&self) -> Option<Duration> {
        let state = self.state.read();
        let idle = state.last_accessed_at.elapsed();
        if idle > state.expiration {
            None
        } else {
            Some(state.expiration - idle)
        }
    }

    /// Get a payload value.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.state.read().payload.get(key).cloned()
    }

    /// Get a payload value decoded as `T`.
    ///
    /// Returns `Ok(None)` when the key is absent and an error when the stored
    /// value has a different shape.
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

    /// Insert or overwrite a payload value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<Value>) {
        self.state.write().payload.insert(key.into(), value.into());
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

    /// Remove a payload value, returning it if it was present.
    pub fn delete(&self, key: &str) -> Option<Value> {
        self.state.write().payload.remove(key)
    }

    /// Check whether a payload key is present.
    pub fn has(&self, key: &str) -> bool {
        self.state.read().payload.contains_key(key)
    }

    /// Remove all payload values. Identity and timestamps are kept.
    pub fn clear(&self) {
        self.state.write().payload.clear();
    }

    /// Number of payload entries.
    pub fn len(&self) -> usize {
        self.state.read().payload.len()
    }

    /// Whether the payload is empty.
    pub fn is_empty(&self) -> bool {
        self.state.read().payload.is_empty()
    }

    /// Payload keys, in no particular order.
    pub fn keys(&self) -> Vec<String> {
        self.state.read().payload.keys().cloned().collect()
    }
}

/// Generate a random session identifier (UUIDv4, 122 bits of entropy).
pub fn generate_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
