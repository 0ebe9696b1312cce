//! Pluggable session store interface.
//!
//! Integration code talks to sessions through [`SessionStore`] so the
//! in-memory [`SessionRegistry`] can be replaced by another backend (for
//! example a distributed store) without changing the binding layer.

use std::sync::Arc;

use async_trait::async_trait;

use crate::registry::SessionRegistry;
use crate::session::Session;

/// Operations the integration layer needs from a session backend.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a new session and start tracking it.
    async fn create(&self) -> Arc<Session>;

    /// Look up a session by id.
    ///
    /// Implementations may return expired sessions; callers check
    /// [`Session::is_expired`] before reuse.
    async fn get(&self, id: &str) -> Option<Arc<Session>>;

    /// Stop tracking a session. Returns whether it was present.
    async fn delete(&self, id: &str) -> bool;

    /// Whether the id is tracked.
    async fn has(&self, id: &str) -> bool;

    /// Number of tracked sessions, if the backend can report it cheaply.
    async fn count(&self) -> Option<usize> {
        None
    }
}

/// Shared, type-erased session store.
pub type SharedSessionStore = Arc<dyn SessionStore>;

#[async_trait]
impl SessionStore for SessionRegistry {
    async fn create(&self) -> Arc<Session> {
        SessionRegistry::create(self)
    }

    async fn get(&self, id: &str) -> Option<Arc<Session>> {
        SessionRegistry::get(self, id)
    }

    async fn delete(&self, id: &str) -> bool {
        SessionRegistry::delete(self, id)
    }

    async fn has(&self, id: &str) -> bool {
        SessionRegistry::has(self, id)
    }

    async fn count(&self) -> Option<usize> {
        Some(SessionRegistry::count(self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RegistryConfig;
    use std::time::Duration;

    #[tokio::test]
    async fn test_registry_behind_trait() {
        let store: SharedSessionStore = Arc::new(SessionRegistry::new(
            RegistryConfig::new().with_default_expiration(Duration::from_secs(60)),
        ));

        let session = store.create().await;
        assert!(store.has(session.id()).await);
        assert!(store.get(session.id()).await.is_some());
        assert_eq!(store.count().await, Some(1));

        assert!(store.delete(session.id()).await);
        assert!(!store.has(session.id()).await);
        assert_eq!(store.count().await, Some(0));

        assert!(!store.delete(session.id()).await);
        assert!(!store.delete("nonexistent").await);
    }
}
