//! The recurring refresh timer.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use campus_session::{AuthBackend, SessionError, SessionStore};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::LifecycleConfig;

// ---------------------------------------------------------------------------
// Metrics
// ---------------------------------------------------------------------------

/// Counters kept by the lifecycle controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LifecycleMetrics {
    /// Refreshes the controller started (startup restore included).
    pub refreshes_attempted: u64,
    /// Refreshes that failed for any reason other than being superseded.
    pub refreshes_failed: u64,
    /// Sessions ended because a scheduled refresh came back 401/403.
    pub forced_logouts: u64,
    pub schedules_started: u64,
    pub schedules_cancelled: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    pub(crate) refreshes_attempted: AtomicU64,
    pub(crate) refreshes_failed: AtomicU64,
    pub(crate) forced_logouts: AtomicU64,
    pub(crate) schedules_started: AtomicU64,
    pub(crate) schedules_cancelled: AtomicU64,
}

impl Counters {
    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self) -> LifecycleMetrics {
        LifecycleMetrics {
            refreshes_attempted: self.refreshes_attempted.load(Ordering::Relaxed),
            refreshes_failed: self.refreshes_failed.load(Ordering::Relaxed),
            forced_logouts: self.forced_logouts.load(Ordering::Relaxed),
            schedules_started: self.schedules_started.load(Ordering::Relaxed),
            schedules_cancelled: self.schedules_cancelled.load(Ordering::Relaxed),
        }
    }
}

// ---------------------------------------------------------------------------
// RefreshSchedule
// ---------------------------------------------------------------------------

/// Handle to a running refresh timer.
///
/// A schedule belongs to one session generation. The timer task lives
/// until [`cancel`](Self::cancel) is called, the handle is dropped, or the
/// session it was armed for ends.
pub struct RefreshSchedule {
    generation: u64,
    task: JoinHandle<()>,
}

impl RefreshSchedule {
    /// Spawns a timer that renews the session of `generation` after
    /// `first_delay` and then every refresh interval, each time pulled in
    /// ahead of the token's expiry.
    pub(crate) fn spawn<B: AuthBackend>(
        store: SessionStore<B>,
        generation: u64,
        first_delay: Duration,
        config: LifecycleConfig,
        counters: Arc<Counters>,
    ) -> Self {
        Counters::bump(&counters.schedules_started);
        debug!(
            generation,
            first_in = ?first_delay,
            every = ?config.refresh_interval,
            "refresh schedule started"
        );
        let task = tokio::spawn(run(store, generation, first_delay, config, counters));
        Self { generation, task }
    }

    /// The session generation this schedule renews.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Whether the timer task is still running.
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stops the timer. A refresh already in flight is left to the store,
    /// which discards its result if the session changed meanwhile.
    pub fn cancel(self) {
        // Drop does the work.
    }
}

impl Drop for RefreshSchedule {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run<B: AuthBackend>(
    store: SessionStore<B>,
    generation: u64,
    first_delay: Duration,
    config: LifecycleConfig,
    counters: Arc<Counters>,
) {
    let mut next =
        LifecycleConfig::refresh_deadline(Instant::now(), first_delay, store.token_expires_at());
    loop {
        time::sleep_until(next).await;
        Counters::bump(&counters.refreshes_attempted);

        match store.renew(generation).await {
            Ok(()) => debug!(generation, "scheduled refresh succeeded"),
            Err(SessionError::Superseded) => {
                debug!(generation, "session changed, refresh schedule ends");
                return;
            }
            // The store has already cleared the session; doing anything more
            // here could clobber a login made since.
            Err(e @ SessionError::AuthExpired(_)) => {
                Counters::bump(&counters.refreshes_failed);
                Counters::bump(&counters.forced_logouts);
                info!(error = %e, "session expired during scheduled refresh, signed out");
                return;
            }
            Err(e) => {
                Counters::bump(&counters.refreshes_failed);
                warn!(error = %e, "scheduled refresh failed, will retry next interval");
            }
        }

        next = LifecycleConfig::refresh_deadline(
            Instant::now(),
            config.refresh_interval,
            store.token_expires_at(),
        );
    }
}
