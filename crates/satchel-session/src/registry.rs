//! Session registry with sliding expiration and a background sweep.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use satchel_types::config_defaults;
use tracing::{debug, trace, warn};

use crate::config::RegistryConfig;
use crate::error::{Error, Result};
use crate::session::Session;
use crate::sweep::{SessionMap, SweepCounters, SweepState, SweepStatus, SweepTask, evict_expired};

/// Smallest sweep interval the registry will schedule.
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);

/// Largest sweep interval the registry will schedule.
pub const MAX_SWEEP_INTERVAL: Duration =
    Duration::from_secs(config_defaults::MAX_SWEEP_INTERVAL_SECS);

struct RegistryInner {
    /// Sessions by id. Shared with the sweep task.
    sessions: SessionMap,

    /// Expiration window for sessions created from now on.
    default_expiration: RwLock<Duration>,

    sweep_interval: Duration,

    sweep: Mutex<SweepState>,

    counters: Arc<SweepCounters>,
}

impl Drop for RegistryInner {
    fn drop(&mut self) {
        // The task only holds the map, so nothing else would ever stop it.
        self.sweep.get_mut().cancel();
    }
}

/// Owns the identifier to session mapping.
///
/// The registry creates, looks up and deletes sessions, and runs a periodic
/// sweep that evicts sessions whose expiration window has elapsed. It is the
/// only component that removes sessions.
///
/// Handles are cheap to clone and share the same state. The sweep is
/// cancelled when the last handle is dropped; call [`stop`](Self::stop) to
/// also wait for the task to finish.
#[derive(Clone)]
pub struct SessionRegistry {
    inner: Arc<RegistryInner>,
}

impl std::fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.count())
            .field("default_expiration", &self.default_expiration())
            .field("sweep_interval", &self.inner.sweep_interval)
            .field("sweep", &self.sweep_status())
            .finish()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new(RegistryConfig::default())
    }
}

impl SessionRegistry {
    /// Create a registry without starting the sweep.
    ///
    /// Call [`start_sweep`](Self::start_sweep) from within a tokio runtime to
    /// begin evicting expired sessions.
    pub fn new(config: RegistryConfig) -> Self {
        let sweep_interval = if config.sweep_interval < MIN_SWEEP_INTERVAL {
            warn!(
                requested_ms = config.sweep_interval.as_millis() as u64,
                "Sweep interval below minimum, clamping"
            );
            MIN_SWEEP_INTERVAL
        } else if config.sweep_interval > MAX_SWEEP_INTERVAL {
            warn!(
                requested_secs = config.sweep_interval.as_secs(),
                "Sweep interval above maximum, clamping"
            );
            MAX_SWEEP_INTERVAL
        } else {
            config.sweep_interval
        };

        Self {
            inner: Arc::new(RegistryInner {
                sessions: Arc::new(RwLock::new(HashMap::new())),
                default_expiration: RwLock::new(config.default_expiration),
                sweep_interval,
                sweep: Mutex::new(SweepState::NotStarted),
                counters: Arc::new(SweepCounters::default()),
            }),
        }
    }

    /// Create a registry and start its sweep if the config enables it.
    ///
    /// Must be called within a tokio runtime for the sweep to start.
    pub fn start(config: RegistryConfig) -> Self {
        let enable_sweep = config.enable_sweep;
        let registry = Self::new(config);
        if enable_sweep {
            registry.start_sweep();
        }
        registry
    }

    /// Start the background sweep.
    ///
    /// Returns true if this call started it. Does nothing when the sweep is
    /// already running, was stopped, or no tokio runtime is available.
    pub fn start_sweep(&self) -> bool {
        let mut sweep = self.inner.sweep.lock();
        if !matches!(*sweep, SweepState::NotStarted) {
            trace!(status = %sweep.status(), "Sweep start ignored");
            return false;
        }

        if tokio::runtime::Handle::try_current().is_err() {
            warn!("No tokio runtime available, session sweep not started");
            return false;
        }

        *sweep = SweepState::Running(SweepTask::spawn(
            Arc::clone(&self.inner.sessions),
            self.inner.sweep_interval,
            Arc::clone(&self.inner.counters),
        ));
        true
    }

    /// Stop the background sweep and wait for it to finish.
    ///
    /// No sweep pass runs after this returns. Safe to call repeatedly, and a
    /// no-op if the sweep was never started. The registry stays usable;
    /// only eviction stops.
    pub async fn stop(&self) {
        let wait = self.inner.sweep.lock().begin_stop();
        wait.wait().await;
    }

    /// Current lifecycle state of the sweep.
    pub fn sweep_status(&self) -> SweepStatus {
        self.inner.sweep.lock().status()
    }

    /// Interval between sweep passes.
    pub fn sweep_interval(&self) -> Duration {
        self.inner.sweep_interval
    }

    /// Expiration window given to newly created sessions.
    pub fn default_expiration(&self) -> Duration {
        *self.inner.default_expiration.read()
    }

    /// Change the expiration window for sessions created after this call.
    ///
    /// Existing sessions keep their own window.
    pub fn set_default_expiration(&self, expiration: Duration) {
        *self.inner.default_expiration.write() = expiration;
        debug!(
            expiration_ms = expiration.as_millis() as u64,
            "Default session expiration changed"
        );
    }

    /// Create a session with a fresh random identifier.
    pub fn create(&self) -> Arc<Session> {
        let session = Arc::new(Session::new(self.default_expiration()));
        let mut sessions = self.inner.sessions.write();
        sessions.insert(session.id().to_string(), Arc::clone(&session));
        trace!(
            session_id = %session.id(),
            count = sessions.len(),
            "Session created"
        );
        session
    }

    /// Create a session under a caller-supplied identifier.
    ///
    /// Intended for restoring a session whose id is already known to the
    /// client. The id must be non-blank. If a live session already holds it
    /// this fails with [`Error::DuplicateId`]; an expired holder is replaced.
    pub fn create_with_id(&self, id: &str) -> Result<Arc<Session>> {
        if id.trim().is_empty() {
            return Err(Error::InvalidId(id.to_string()));
        }

        let expiration = self.default_expiration();
        let mut sessions = self.inner.sessions.write();

        if let Some(existing) = sessions.get(id)
            && !existing.is_expired()
        {
            return Err(Error::DuplicateId(id.to_string()));
        }

        let session = Arc::new(Session::with_id(id, expiration));
        sessions.insert(id.to_string(), Arc::clone(&session));
        debug!(session_id = %id, "Session created with supplied id");
        Ok(session)
    }

    /// Look up a live session.
    ///
    /// Returns `None` if the id is unknown or the session has expired. Does
    /// not refresh the session; call [`Session::update`] for that.
    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        let session = self.inner.sessions.read().get(id).cloned()?;
        if session.is_expired() {
            trace!(session_id = %id, "Session found but expired");
            return None;
        }
        Some(session)
    }

    /// Remove a session. Returns whether it was present.
    pub fn delete(&self, id: &str) -> bool {
        let removed = self.inner.sessions.write().remove(id).is_some();
        if removed {
            trace!(session_id = %id, "Session deleted");
        }
        removed
    }

    /// Whether the id is tracked, including expired sessions not yet swept.
    pub fn has(&self, id: &str) -> bool {
        self.inner.sessions.read().contains_key(id)
    }

    /// Number of tracked sessions, including expired ones not yet swept.
    pub fn count(&self) -> usize {
        self.inner.sessions.read().len()
    }

    /// Whether no sessions are tracked.
    pub fn is_empty(&self) -> bool {
        self.inner.sessions.read().is_empty()
    }

    /// Identifiers of all tracked sessions.
    pub fn ids(&self) -> Vec<String> {
        self.inner.sessions.read().keys().cloned().collect()
    }

    /// Run one eviction pass now. Returns the number of sessions removed.
    ///
    /// Works regardless of the sweep state.
    pub fn purge_expired(&self) -> usize {
        let evicted = evict_expired(&self.inner.sessions);
        self.inner.counters.record_evictions(evicted);
        if evicted > 0 {
            debug!(count = evicted, "Purged expired sessions");
        }
        evicted
    }

    /// Registry statistics.
    pub fn stats(&self) -> RegistryStats {
        let (sessions, expired) = {
            let sessions = self.inner.sessions.read();
            let expired = sessions.values().filter(|s| s.is_expired()).count();
            (sessions.len(), expired)
        };
        RegistryStats {
            sessions,
            expired,
            sweep: self.sweep_status(),
            sweep_passes: self.inner.counters.passes(),
            evicted: self.inner.counters.evicted(),
        }
    }
}

/// Registry statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryStats {
    /// Tracked sessions, expired ones included.
    pub sessions: usize,

    /// Tracked sessions whose window has elapsed.
    pub expired: usize,

    /// Sweep lifecycle state.
    pub sweep: SweepStatus,

    /// Completed background sweep passes.
    pub sweep_passes: u64,

    /// Sessions evicted by sweeps and purges.
    pub evicted: u64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use tokio::time::sleep;

    fn manual(expiration: Duration) -> SessionRegistry {
        SessionRegistry::new(
            RegistryConfig::new()
                .with_default_expiration(expiration)
                .with_sweep(false),
        )
    }

    #[test]
    fn test_create_and_get() {
        let registry = manual(Duration::from_secs(60));
        let session = registry.create();

        let found = registry.get(session.id()).unwrap();
        assert!(Arc::ptr_eq(&session, &found));
        assert_eq!(found.expiration(), Duration::from_secs(60));
    }

    #[test]
    fn test_get_unknown() {
        let registry = manual(Duration::from_secs(60));
        assert!(registry.get("nonexistent").is_none());
        assert!(!registry.has("nonexistent"));
    }

    #[test]
    fn test_ids_unique() {
        let registry = manual(Duration::from_secs(60));
        let ids: HashSet<String> = (0..10_000)
            .map(|_| registry.create().id().to_string())
            .collect();
        assert_eq!(ids.len(), 10_000);
        assert_eq!(registry.count(), 10_000);
    }

    #[test]
    fn test_delete() {
        let registry = manual(Duration::from_secs(60));
        let id = registry.create().id().to_string();

        assert!(registry.delete(&id));
        assert!(registry.get(&id).is_none());
        assert!(!registry.has(&id));

        // Deleting again is not an error
        assert!(!registry.delete(&id));
    }

    #[test]
    fn test_count_after_deletes() {
        let registry = manual(Duration::from_secs(60));
        let ids: Vec<String> = (0..10)
            .map(|_| registry.create().id().to_string())
            .collect();
        for id in ids.iter().take(4) {
            registry.delete(id);
        }
        assert_eq!(registry.count(), 6);
    }

    #[test]
    fn test_get_hides_expired_but_has_sees_it() {
        let registry = manual(Duration::from_millis(10));
        let id = registry.create().id().to_string();

        std::thread::sleep(Duration::from_millis(30));

        assert!(registry.get(&id).is_none());
        assert!(registry.has(&id));
        assert_eq!(registry.count(), 1);
        assert_eq!(registry.stats().expired, 1);
    }

    #[test]
    fn test_default_expiration_not_retroactive() {
        let registry = manual(Duration::from_secs(3600));
        let a = registry.create();

        registry.set_default_expiration(Duration::from_secs(2 * 3600));
        let b = registry.create();

        assert_eq!(a.expiration(), Duration::from_secs(3600));
        assert_eq!(b.expiration(), Duration::from_secs(2 * 3600));
        assert_eq!(registry.default_expiration(), Duration::from_secs(2 * 3600));
    }

    #[test]
    fn test_create_with_id() {
        let registry = manual(Duration::from_secs(60));
        let session = registry.create_with_id("restored-1").unwrap();
        assert_eq!(session.id(), "restored-1");
        assert!(registry.get("restored-1").is_some());

        let err = registry.create_with_id("restored-1").unwrap_err();
        assert!(matches!(err, Error::DuplicateId(ref id) if id == "restored-1"));

        let err = registry.create_with_id("  ").unwrap_err();
        assert!(matches!(err, Error::InvalidId(_)));
    }

    #[test]
    fn test_create_with_id_replaces_expired() {
        let registry = manual(Duration::from_millis(10));
        let old = registry.create_with_id("restored").unwrap();
        old.set("stale", true);

        std::thread::sleep(Duration::from_millis(30));

        let new = registry.create_with_id("restored").unwrap();
        assert!(!Arc::ptr_eq(&old, &new));
        assert!(!new.has("stale"));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_purge_expired() {
        let registry = manual(Duration::from_millis(10));
        for _ in 0..3 {
            registry.create();
        }
        registry.set_default_expiration(Duration::from_secs(60));
        let keep = registry.create();

        std::thread::sleep(Duration::from_millis(30));

        assert_eq!(registry.purge_expired(), 3);
        assert_eq!(registry.count(), 1);
        assert!(registry.has(keep.id()));
        assert_eq!(registry.stats().evicted, 3);
    }

    #[test]
    fn test_start_sweep_without_runtime() {
        let registry = manual(Duration::from_secs(60));
        assert!(!registry.start_sweep());
        assert_eq!(registry.sweep_status(), SweepStatus::NotStarted);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let registry =
            SessionRegistry::new(RegistryConfig::new().with_sweep_interval(Duration::ZERO));
        assert_eq!(registry.sweep_interval(), MIN_SWEEP_INTERVAL);
    }

    #[test]
    fn test_huge_interval_is_clamped() {
        let registry =
            SessionRegistry::new(RegistryConfig::new().with_sweep_interval(Duration::MAX));
        assert_eq!(registry.sweep_interval(), MAX_SWEEP_INTERVAL);
    }

    #[tokio::test]
    async fn test_huge_interval_sweep_stays_running() {
        let registry =
            SessionRegistry::start(RegistryConfig::new().with_sweep_interval(Duration::MAX));
        sleep(Duration::from_millis(50)).await;

        // Status reflects the task itself, so a dead sweep would not read as running.
        assert_eq!(registry.sweep_status(), SweepStatus::Running);
        assert_eq!(registry.stats().sweep_passes, 0);

        registry.stop().await;
        assert_eq!(registry.sweep_status(), SweepStatus::Stopped);
    }

    #[tokio::test]
    async fn test_sweep_evicts_untouched_session() {
        let registry = SessionRegistry::start(
            RegistryConfig::new()
                .with_default_expiration(Duration::from_millis(50))
                .with_sweep_interval(Duration::from_millis(100)),
        );
        let id = registry.create().id().to_string();

        // Expires at 50ms; two intervals later is 250ms
        sleep(Duration::from_millis(300)).await;

        assert!(!registry.has(&id));
        assert_eq!(registry.count(), 0);
        registry.stop().await;
    }

    #[tokio::test]
    async fn test_sweep_keeps_updated_session() {
        let registry = SessionRegistry::start(
            RegistryConfig::new()
                .with_default_expiration(Duration::from_millis(150))
                .with_sweep_interval(Duration::from_millis(30)),
        );
        let session = registry.create();

        for _ in 0..6 {
            sleep(Duration::from_millis(50)).await;
            session.update();
        }

        assert!(registry.has(session.id()));
        registry.stop().await;
    }

    #[tokio::test]
    async fn test_start_is_idempotent() {
        let registry = SessionRegistry::new(RegistryConfig::new());
        assert!(registry.start_sweep());
        assert!(!registry.start_sweep());
        assert_eq!(registry.sweep_status(), SweepStatus::Running);
        registry.stop().await;
    }

    #[tokio::test]
    async fn test_stop_before_start_is_noop() {
        let registry = SessionRegistry::new(RegistryConfig::new());
        registry.stop().await;
        assert_eq!(registry.sweep_status(), SweepStatus::NotStarted);

        // Still startable afterwards
        assert!(registry.start_sweep());
        registry.stop().await;
        assert_eq!(registry.sweep_status(), SweepStatus::Stopped);
    }

    #[tokio::test]
    async fn test_stopped_is_terminal() {
        let registry = SessionRegistry::start(RegistryConfig::new());
        registry.stop().await;
        registry.stop().await;

        assert!(!registry.start_sweep());
        assert_eq!(registry.sweep_status(), SweepStatus::Stopped);
    }

    #[tokio::test]
    async fn test_no_eviction_after_stop() {
        let registry = SessionRegistry::start(
            RegistryConfig::new()
                .with_default_expiration(Duration::from_millis(20))
                .with_sweep_interval(Duration::from_millis(20)),
        );
        registry.stop().await;

        let session = registry.create();
        sleep(Duration::from_millis(100)).await;

        assert!(session.is_expired());
        assert!(registry.has(session.id()));
        assert_eq!(registry.stats().evicted, 0);
    }

    #[tokio::test]
    async fn test_concurrent_stop_calls() {
        let registry = SessionRegistry::start(
            RegistryConfig::new().with_sweep_interval(Duration::from_millis(10)),
        );

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.stop().await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(registry.sweep_status(), SweepStatus::Stopped);
    }

    #[tokio::test]
    async fn test_stats() {
        let registry = SessionRegistry::start(
            RegistryConfig::new().with_sweep_interval(Duration::from_millis(10)),
        );
        registry.create();
        registry.create();

        sleep(Duration::from_millis(50)).await;

        let stats = registry.stats();
        assert_eq!(stats.sessions, 2);
        assert_eq!(stats.expired, 0);
        assert_eq!(stats.sweep, SweepStatus::Running);
        assert!(stats.sweep_passes >= 1);
        registry.stop().await;
    }
}
