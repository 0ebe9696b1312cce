//! Binding presented session tokens to live sessions.
//!
//! This is the transport-independent half of request integration. A
//! transport (an HTTP middleware, say) extracts the token the client
//! presented, calls [`SessionBinder::bind`], and if
//! [`BoundSession::issued_token`] returns a token, persists it back to the
//! client in whatever format it uses (a cookie named after the application).

use std::sync::Arc;

use tracing::{debug, trace};

use crate::session::Session;
use crate::shared::SharedDataStore;
use crate::store::SharedSessionStore;

/// Name/value pair that round-trips a session id through a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionToken {
    /// Token name, the application name.
    pub name: String,
    /// The session id.
    pub value: String,
}

/// Resolves presented session ids to live sessions.
#[derive(Clone)]
pub struct SessionBinder {
    application_name: String,
    store: SharedSessionStore,
    shared: Arc<SharedDataStore>,
}

impl std::fmt::Debug for SessionBinder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionBinder")
            .field("application_name", &self.application_name)
            .field("shared", &self.shared)
            .finish_non_exhaustive()
    }
}

impl SessionBinder {
    /// Create a binder and register `store` on the shared data store.
    pub fn new(
        application_name: impl Into<String>,
        store: SharedSessionStore,
        shared: Arc<SharedDataStore>,
    ) -> Self {
        shared.set_store(Some(Arc::clone(&store)));
        Self {
            application_name: application_name.into(),
            store,
            shared,
        }
    }

    /// The application name, used as the token name.
    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    /// The session store sessions are resolved against.
    pub fn store(&self) -> &SharedSessionStore {
        &self.store
    }

    /// The shared data store handed to every request.
    pub fn shared(&self) -> &Arc<SharedDataStore> {
        &self.shared
    }

    /// Resolve the session for a request.
    ///
    /// Reuses the session named by `presented` if it exists and has not
    /// expired; otherwise creates a new one and marks its token as issued.
    /// The resolved session is refreshed before it is returned.
    pub async fn bind(&self, presented: Option<&str>) -> BoundSession {
        let existing = match presented {
            Some(id) => self.store.get(id).await.filter(|s| !s.is_expired()),
            None => None,
        };

        let (session, issued) = match existing {
            Some(session) => {
                trace!(session_id = %session.id(), "Resumed session");
                (session, false)
            }
            None => {
                let session = self.store.create().await;
                debug!(
                    app = %self.application_name,
                    session_id = %session.id(),
                    presented = presented.is_some(),
                    "Issued new session"
                );
                (session, true)
            }
        };

        session.update();

        BoundSession {
            application_name: self.application_name.clone(),
            session,
            shared: Arc::clone(&self.shared),
            issued,
        }
    }

    /// Delete a session, e.g. on logout. Returns whether it was tracked.
    pub async fn invalidate(&self, id: &str) -> bool {
        let removed = self.store.delete(id).await;
        if removed {
            debug!(app = %self.application_name, session_id = %id, "Session invalidated");
        } else {
            trace!(
                app = %self.application_name,
                session_id = %id,
                "Invalidate ignored, unknown session"
            );
        }
        removed
    }
}

/// Per-request view handed to application logic.
#[derive(Debug, Clone)]
pub struct BoundSession {
    application_name: String,
    session: Arc<Session>,
    shared: Arc<SharedDataStore>,
    issued: bool,
}

impl BoundSession {
    /// The client's session.
    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    /// Application-wide shared data.
    pub fn shared(&self) -> &Arc<SharedDataStore> {
        &self.shared
    }

    /// Whether a new session was created for this request.
    pub fn is_new(&self) -> bool {
        self.issued
    }

    /// Token naming this session.
    pub fn token(&self) -> SessionToken {
        SessionToken {
            name: self.application_name.clone(),
            value: self.session.id().to_string(),
        }
    }

    /// Token the transport must persist to the client, if a new one was issued.
    pub fn issued_token(&self) -> Option<SessionToken> {
        self.issued.then(|| self.token())
    }
}
