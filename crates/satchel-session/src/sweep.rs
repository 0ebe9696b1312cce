//! Background sweep that evicts expired sessions.
//!
//! The sweep runs as a tokio task driven by an interval timer. Shutdown uses
//! two cancellation tokens: `cancel` asks the task to exit, and `finished`
//! is cancelled by a drop guard owned by the task future. The guard also
//! fires on panic or when a shutting down runtime drops the task unpolled,
//! so waiting on `finished` always terminates.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

use crate::session::Session;

/// Identifier to session mapping shared between the registry and its sweep.
pub(crate) type SessionMap = Arc<RwLock<HashMap<String, Arc<Session>>>>;

/// Lifecycle of the background sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepStatus {
    /// The sweep has never been started.
    NotStarted,
    /// The sweep task is running.
    Running,
    /// The sweep was stopped or its task exited. Terminal.
    Stopped,
}

impl std::fmt::Display for SweepStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SweepStatus::NotStarted => write!(f, "not started"),
            SweepStatus::Running => write!(f, "running"),
            SweepStatus::Stopped => write!(f, "stopped"),
        }
    }
}

/// Eviction counters shared with the sweep task.
#[derive(Debug, Default)]
pub(crate) struct SweepCounters {
    passes: AtomicU64,
    evicted: AtomicU64,
}

impl SweepCounters {
    pub(crate) fn passes(&self) -> u64 {
        self.passes.load(Ordering::Relaxed)
    }

    pub(crate) fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    pub(crate) fn record_evictions(&self, count: usize) {
        self.evicted.fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Remove every expired session from the map under a single write lock.
pub(crate) fn evict_expired(sessions: &RwLock<HashMap<String, Arc<Session>>>) -> usize {
    let mut sessions = sessions.write();
    let before = sessions.len();
    sessions.retain(|id, session| {
        let expired = session.is_expired();
        if expired {
            debug!(
                session_id = %id,
                idle_ms = session.idle_for().as_millis() as u64,
                "Evicting expired session"
            );
        }
        !expired
    });
    before - sessions.len()
}

/// Handle to a running sweep task.
pub(crate) struct SweepTask {
    cancel: CancellationToken,
    finished: CancellationToken,
    handle: JoinHandle<()>,
}

impl SweepTask {
    /// Spawn the sweep on the current tokio runtime.
    ///
    /// The first pass happens one full interval after spawning.
    pub(crate) fn spawn(
        sessions: SessionMap,
        interval: Duration,
        counters: Arc<SweepCounters>,
    ) -> Self {
        let cancel = CancellationToken::new();
        let finished = CancellationToken::new();

        let guard = finished.clone().drop_guard();
        let task_cancel = cancel.clone();
        let handle = tokio::spawn(async move {
            let _finished = guard;
            run(sessions, interval, task_cancel, counters).await;
        });

        Self {
            cancel,
            finished,
            handle,
        }
    }
}

async fn run(
    sessions: SessionMap,
    period: Duration,
    cancel: CancellationToken,
    counters: Arc<SweepCounters>,
) {
    let start = Instant::now().checked_add(period).unwrap_or_else(Instant::now);
    let mut ticker = tokio::time::interval_at(start, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    debug!(interval_ms = period.as_millis() as u64, "Session sweep started");

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                let evicted = evict_expired(&sessions);
                counters.passes.fetch_add(1, Ordering::Relaxed);
                counters.record_evictions(evicted);
                if evicted > 0 {
                    debug!(count = evicted, "Swept expired sessions");
                } else {
                    trace!("Sweep pass found no expired sessions");
                }
            }
        }
    }

    debug!("Session sweep stopped");
}

/// Sweep lifecycle as tracked by the registry.
pub(crate) enum SweepState {
    NotStarted,
    Running(SweepTask),
    Stopped { finished: CancellationToken },
}

impl SweepState {
    pub(crate) fn status(&self) -> SweepStatus {
        match self {
            SweepState::NotStarted => SweepStatus::NotStarted,
            SweepState::Running(task) if task.handle.is_finished() => SweepStatus::Stopped,
            SweepState::Running(_) => SweepStatus::Running,
            SweepState::Stopped { .. } => SweepStatus::Stopped,
        }
    }

    /// Signal the task to stop and move to `Stopped`.
    ///
    /// Returns what the caller must await for the task to be gone. Only the
    /// first stopper receives the join handle; later ones wait on `finished`.
    pub(crate) fn begin_stop(&mut self) -> StopWait {
        match std::mem::replace(self, SweepState::NotStarted) {
            SweepState::NotStarted => StopWait::Idle,
            SweepState::Running(task) => {
                task.cancel.cancel();
                *self = SweepState::Stopped {
                    finished: task.finished,
                };
                StopWait::Join(task.handle)
            }
            SweepState::Stopped { finished } => {
                let wait = StopWait::Finished(finished.clone());
                *self = SweepState::Stopped { finished };
                wait
            }
        }
    }

    /// Cancel a running task without waiting for it.
    pub(crate) fn cancel(&self) {
        if let SweepState::Running(task) = self {
            task.cancel.cancel();
        }
    }
}

/// Pending termination of the sweep task.
pub(crate) enum StopWait {
    Idle,
    Join(JoinHandle<()>),
    Finished(CancellationToken),
}

impl StopWait {
    pub(crate) async fn wait(self) {
        match self {
            StopWait::Idle => {}
            StopWait::Join(handle) => {
                if let Err(e) = handle.await
                    && e.is_panic()
                {
                    warn!(error = %e, "Session sweep task panicked");
                }
            }
            StopWait::Finished(finished) => finished.cancelled().await,
        }
    }
}
