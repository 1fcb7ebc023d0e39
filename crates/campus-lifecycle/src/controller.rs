//! The lifecycle controller: startup restore plus the refresh supervisor.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use campus_session::{AuthBackend, SessionStore};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::schedule::{Counters, RefreshSchedule};
use crate::{InitState, LifecycleConfig, LifecycleError, LifecycleMetrics};

/// Bootstraps the session and keeps it alive.
///
/// ## Lifecycle
///
/// ```text
/// start() ──→ [Initializing] ──→ restore refresh (if marker set) ──→ settle ──→ [Ready]
///                │
///                └─ supervisor task: authenticated   → ensure one RefreshSchedule
///                                    unauthenticated → cancel it
/// ```
///
/// Dropping the controller (or calling [`shutdown`](Self::shutdown)) stops
/// the supervisor and with it any pending refresh timer.
pub struct SessionLifecycle<B: AuthBackend> {
    store: SessionStore<B>,
    config: LifecycleConfig,
    state: watch::Sender<InitState>,
    counters: Arc<Counters>,
    supervisor: Mutex<Option<JoinHandle<()>>>,
    shut_down: AtomicBool,
}

impl<B: AuthBackend> SessionLifecycle<B> {
    pub fn new(store: SessionStore<B>, config: LifecycleConfig) -> Self {
        let (state, _) = watch::channel(InitState::Uninitialized);
        Self {
            store,
            config: config.validated(),
            state,
            counters: Arc::new(Counters::default()),
            supervisor: Mutex::new(None),
            shut_down: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &SessionStore<B> {
        &self.store
    }

    pub fn config(&self) -> &LifecycleConfig {
        &self.config
    }

    pub fn state(&self) -> InitState {
        *self.state.borrow()
    }

    pub fn is_ready(&self) -> bool {
        self.state().is_ready()
    }

    /// Resolves once the controller reaches [`InitState::Ready`].
    pub async fn ready(&self) {
        let mut rx = self.state.subscribe();
        // The sender lives in `self`, so the channel can't close under us.
        let _ = rx.wait_for(|s| s.is_ready()).await;
    }

    /// Runs startup: restores a previous session when the marker says one
    /// existed, then marks the session settled and the controller ready.
    ///
    /// A failed restore degrades to "signed out"; it never keeps the
    /// controller from becoming ready.
    ///
    /// # Errors
    /// - [`LifecycleError::AlreadyStarted`] on a second call
    /// - [`LifecycleError::ShutDown`] after [`shutdown`](Self::shutdown)
    pub async fn start(&self) -> Result<(), LifecycleError> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(LifecycleError::ShutDown);
        }
        self.transition(InitState::Initializing)?;
        self.spawn_supervisor();

        if self.store.was_signed_in() {
            debug!("previous session marker found, attempting restore");
            Counters::bump(&self.counters.refreshes_attempted);
            match self.store.refresh().await {
                Ok(()) => info!("session restored"),
                Err(e) => {
                    Counters::bump(&self.counters.refreshes_failed);
                    warn!(error = %e, "session restore failed, continuing signed out");
                }
            }
        }

        self.store.settle();
        self.transition(InitState::Ready)?;
        info!(authenticated = self.store.is_authenticated(), "session lifecycle ready");
        Ok(())
    }

    /// Stops the supervisor and any refresh timer. The controller can't be
    /// restarted afterwards.
    pub fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
        let handle = self
            .supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.abort();
            debug!("session lifecycle shut down");
        }
    }

    pub fn metrics(&self) -> LifecycleMetrics {
        self.counters.snapshot()
    }

    /// Whether a recurring refresh timer is currently scheduled.
    pub fn is_scheduled(&self) -> bool {
        let running = self
            .supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|task| !task.is_finished());
        let m = self.metrics();
        running && m.schedules_started > m.schedules_cancelled
    }

    fn transition(&self, target: InitState) -> Result<(), LifecycleError> {
        let mut result = Ok(());
        self.state.send_if_modified(|current| {
            if current.can_transition_to(target) {
                debug!(from = %current, to = %target, "lifecycle transition");
                *current = target;
                true
            } else {
                result = Err(LifecycleError::AlreadyStarted(*current));
                false
            }
        });
        result
    }

    fn spawn_supervisor(&self) {
        let task = tokio::spawn(supervise(
            self.store.clone(),
            self.config.clone(),
            Arc::clone(&self.counters),
        ));
        let previous = self
            .supervisor
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
    }
}

impl<B: AuthBackend> Drop for SessionLifecycle<B> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Keeps exactly one schedule alive while the session is authenticated,
/// armed for the current session generation.
async fn supervise<B: AuthBackend>(
    store: SessionStore<B>,
    config: LifecycleConfig,
    counters: Arc<Counters>,
) {
    let mut session = store.subscribe();
    let mut schedule: Option<RefreshSchedule> = None;

    loop {
        let authenticated = session.borrow_and_update().is_authenticated();
        let generation = store.generation();
        let current = schedule
            .as_ref()
            .is_some_and(|s| s.is_active() && s.generation() == generation);

        if authenticated && !current {
            if schedule.take().is_some() {
                Counters::bump(&counters.schedules_cancelled);
            }
            schedule = Some(RefreshSchedule::spawn(
                store.clone(),
                generation,
                config.first_delay(),
                config.clone(),
                Arc::clone(&counters),
            ));
        } else if !authenticated {
            if let Some(pending) = schedule.take() {
                pending.cancel();
                Counters::bump(&counters.schedules_cancelled);
                debug!("refresh schedule cancelled");
            }
        }

        if session.changed().await.is_err() {
            break;
        }
    }
}
