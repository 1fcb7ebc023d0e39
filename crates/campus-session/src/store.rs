//! The session store: the single owner of session state.
//!
//! Every mutation of the [`Session`] goes through one of four verbs:
//! [`login`](SessionStore::login), [`refresh`](SessionStore::refresh)
//! (or its timer-safe form [`renew`](SessionStore::renew)),
//! [`logout`](SessionStore::logout) and
//! [`expire_token`](SessionStore::expire_token). The store's own expiry
//! timer clears a session whose token lapses. Everyone else reads
//! snapshots or subscribes to changes.
//!
//! # Ordering
//!
//! ```text
//!   login ──┐                      ┌── refresh (joins in-flight)
//!           ▼                      ▼
//!   generation += 1          capture generation ──→ backend ──→ apply?
//!           ▲                                                   │
//!   logout ─┘                          generation unchanged ◄───┘
//! ```
//!
//! A generation counter is bumped by login, logout, token expiry and fatal
//! refresh failures. Any backend answer that comes back under an older
//! generation is discarded, so a slow refresh can never resurrect a cleared
//! session or overwrite a newer login. Timers that act on behalf of a
//! session (the keep-alive, the expiry timer) carry the generation they were
//! armed under and go quiet once it moves.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};
use tracing::{debug, info, warn};

use crate::{
    AccessToken, Action, AuthBackend, AuthGrant, Credentials, MemoryMarker, Role, Session,
    SessionError, SessionMarker, User,
};

/// Message left in `last_error` when the backend ends the session.
pub const SESSION_EXPIRED: &str = "Your session has expired. Please sign in again.";

type RefreshFuture = Shared<BoxFuture<'static, Result<(), SessionError>>>;

// ---------------------------------------------------------------------------
// Internal state
// ---------------------------------------------------------------------------

struct InFlight {
    id: u64,
    future: RefreshFuture,
}

#[derive(Default)]
struct Control {
    generation: u64,
    next_flight: u64,
    in_flight: Option<InFlight>,
    expiry: Option<JoinHandle<()>>,
}

impl Control {
    /// Starts a new generation and forgets any pending refresh.
    fn advance(&mut self) -> u64 {
        self.generation += 1;
        self.in_flight = None;
        self.disarm_expiry();
        self.generation
    }

    fn disarm_expiry(&mut self) {
        if let Some(timer) = self.expiry.take() {
            timer.abort();
        }
    }

    /// Joins the refresh in flight, or starts one under the current
    /// generation.
    fn flight<B: AuthBackend>(&mut self, inner: &Arc<StoreInner<B>>) -> RefreshFuture {
        if let Some(flight) = &self.in_flight {
            debug!(flight = flight.id, "joining in-flight refresh");
            return flight.future.clone();
        }
        self.next_flight += 1;
        let id = self.next_flight;
        let future = Arc::clone(inner)
            .run_refresh(id, self.generation)
            .boxed()
            .shared();
        self.in_flight = Some(InFlight {
            id,
            future: future.clone(),
        });
        future
    }
}

impl Drop for Control {
    fn drop(&mut self) {
        self.disarm_expiry();
    }
}

struct StoreInner<B: AuthBackend> {
    backend: B,
    marker: Box<dyn SessionMarker>,
    state: watch::Sender<Session>,
    /// Lock order: `control` first, then `state`. Never held across an
    /// await.
    control: Mutex<Control>,
}

impl<B: AuthBackend> StoreInner<B> {
    fn control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn establish(self: &Arc<Self>, control: &mut Control, grant: AuthGrant) {
        let lifetime = grant.lifetime();
        let user_id = grant.user.id.clone();
        let token = AccessToken::new(grant.access_token, lifetime);
        let expires_at = token.expires_at();
        self.state.send_modify(|s| s.establish(grant.user, token));
        self.marker.set();
        self.arm_expiry(control, expires_at);
        info!(user_id = %user_id, expires_in = ?lifetime, "session established");
    }

    /// Replaces the expiry timer. When the token lapses by the clock the
    /// session is cleared, so subscribers hear about it.
    fn arm_expiry(self: &Arc<Self>, control: &mut Control, expires_at: Option<Instant>) {
        control.disarm_expiry();
        let Some(expires_at) = expires_at else {
            return;
        };
        let Ok(runtime) = Handle::try_current() else {
            debug!("no runtime, token expiry will not be published");
            return;
        };
        let store: Weak<Self> = Arc::downgrade(self);
        let generation = control.generation;
        control.expiry = Some(runtime.spawn(async move {
            time::sleep_until(expires_at).await;
            if let Some(inner) = store.upgrade() {
                inner.lapse(generation);
            }
        }));
    }

    fn lapse(&self, generation: u64) {
        let mut control = self.control();
        let expired = self
            .state
            .borrow()
            .token()
            .is_some_and(AccessToken::is_expired);
        if control.generation != generation || !expired {
            return;
        }
        control.generation += 1;
        control.in_flight = None;
        control.expiry = None;
        self.clear(Some(SESSION_EXPIRED.to_owned()));
        warn!("access token lapsed, session cleared");
    }

    fn clear(&self, last_error: Option<String>) {
        self.state.send_modify(|s| s.reset(last_error));
        self.marker.clear();
    }

    async fn run_refresh(self: Arc<Self>, id: u64, generation: u64) -> Result<(), SessionError> {
        let token = {
            let control = self.control();
            if control.generation != generation {
                return Err(SessionError::Superseded);
            }
            let mut token = None;
            // Background renewals of a live session don't flip the loading
            // flag, so guards don't flash their waiting state.
            self.state.send_if_modified(|s| {
                token = s.token().map(|t| t.value().to_owned());
                if s.is_authenticated() || s.is_loading() {
                    false
                } else {
                    s.set_loading(true);
                    true
                }
            });
            token
        };

        debug!(flight = id, "refreshing session");
        let result = self.backend.refresh(token).await;

        let mut control = self.control();
        if control.in_flight.as_ref().is_some_and(|f| f.id == id) {
            control.in_flight = None;
        }
        if control.generation != generation {
            debug!(flight = id, "discarding refresh result from an older session");
            return Err(SessionError::Superseded);
        }

        match result {
            Ok(grant) => {
                self.establish(&mut control, grant);
                Ok(())
            }
            Err(e) if e.is_auth_expired() => {
                control.advance();
                warn!(status = e.status, "refresh rejected, clearing session");
                self.clear(Some(e.message.clone()));
                Err(SessionError::AuthExpired(e))
            }
            Err(e) => {
                warn!(status = e.status, error = %e, "refresh failed, keeping session");
                let message = e.message.clone();
                self.state.send_modify(|s| {
                    s.set_loading(false);
                    s.set_error(Some(message));
                });
                Err(SessionError::RefreshFailed(e))
            }
        }
    }
}

// ---------------------------------------------------------------------------
// SessionStore
// ---------------------------------------------------------------------------

/// Owns the session and serializes every change to it.
///
/// Cheap to clone; clones share state. Dropping the last clone drops the
/// backend and the marker.
pub struct SessionStore<B: AuthBackend> {
    inner: Arc<StoreInner<B>>,
}

impl<B: AuthBackend> Clone for SessionStore<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: AuthBackend> SessionStore<B> {
    /// A store with an in-memory marker.
    pub fn new(backend: B) -> Self {
        Self::with_marker(backend, MemoryMarker::new())
    }

    pub fn with_marker(backend: B, marker: impl SessionMarker) -> Self {
        let (state, _) = watch::channel(Session::unknown());
        Self {
            inner: Arc::new(StoreInner {
                backend,
                marker: Box::new(marker),
                state,
                control: Mutex::new(Control::default()),
            }),
        }
    }

    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    // -- mutation -----------------------------------------------------------

    /// Signs in with email and password.
    ///
    /// `is_loading` is true while the call is outstanding. On failure the
    /// session is left unauthenticated with `last_error` set.
    ///
    /// # Errors
    /// - [`SessionError::LoginFailed`] when the backend rejects the call
    /// - [`SessionError::Superseded`] when a logout or another login
    ///   happened meanwhile; the session is left to that newer change
    pub async fn login(
        &self,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<(), SessionError> {
        let credentials = Credentials::new(email, password);
        let ticket = {
            let mut control = self.inner.control();
            let ticket = control.advance();
            self.inner.state.send_modify(|s| {
                s.set_loading(true);
                s.set_error(None);
            });
            ticket
        };

        debug!(email = %credentials.email, "logging in");
        let result = self.inner.backend.login(&credentials).await;

        let mut control = self.inner.control();
        if control.generation != ticket {
            debug!(email = %credentials.email, "discarding login result");
            return Err(SessionError::Superseded);
        }
        match result {
            Ok(grant) => {
                self.inner.establish(&mut control, grant);
                Ok(())
            }
            Err(e) => {
                warn!(email = %credentials.email, status = e.status, error = %e, "login failed");
                self.inner.clear(Some(e.message.clone()));
                Err(SessionError::LoginFailed(e))
            }
        }
    }

    /// Renews the session from the backend.
    ///
    /// Safe to call while authenticated. Concurrent calls share one
    /// backend request and all observe the same outcome.
    ///
    /// # Errors
    /// - [`SessionError::AuthExpired`] on 401/403; the session is cleared
    /// - [`SessionError::RefreshFailed`] otherwise; the session is kept
    /// - [`SessionError::Superseded`] when a logout or login happened first
    pub async fn refresh(&self) -> Result<(), SessionError> {
        let future = self.inner.control().flight(&self.inner);
        future.await
    }

    /// Renews the session that was current at `generation`, and nothing
    /// else.
    ///
    /// Used by timers armed for a particular session. When the generation
    /// has moved on or the session is no longer authenticated, returns
    /// [`SessionError::Superseded`] without calling the backend, so a timer
    /// firing just after a logout can't sign anybody back in.
    ///
    /// # Errors
    /// As [`refresh`](Self::refresh).
    pub async fn renew(&self, generation: u64) -> Result<(), SessionError> {
        let future = {
            let mut control = self.inner.control();
            if control.generation != generation || !self.inner.state.borrow().is_authenticated() {
                debug!(generation, current = control.generation, "renewal no longer wanted");
                return Err(SessionError::Superseded);
            }
            control.flight(&self.inner)
        };
        future.await
    }

    /// Clears the session immediately. A refresh still in flight will be
    /// discarded when it lands.
    pub fn logout(&self) {
        let mut control = self.inner.control();
        control.advance();
        self.inner.clear(None);
        info!("logged out");
    }

    /// Treats the current token as dead: marks it invalid, then clears the
    /// session with [`SESSION_EXPIRED`] as the error.
    ///
    /// Used when an authenticated domain request comes back 401/403.
    pub fn expire_token(&self) {
        let mut control = self.inner.control();
        control.advance();
        self.inner.state.send_modify(Session::invalidate_token);
        self.inner.clear(Some(SESSION_EXPIRED.to_owned()));
        warn!("access token rejected, session cleared");
    }

    /// Ends the initial "unknown" phase: after this, an empty session means
    /// "signed out" rather than "not known yet".
    pub fn settle(&self) {
        let _control = self.inner.control();
        self.inner.state.send_if_modified(|s| {
            let was_loading = s.is_loading();
            s.set_loading(false);
            was_loading
        });
    }

    // -- reads --------------------------------------------------------------

    pub fn snapshot(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    /// A receiver that sees every state change from now on.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    /// Whether the persisted marker says a previous run was signed in.
    pub fn was_signed_in(&self) -> bool {
        self.inner.marker.is_set()
    }

    /// Bumped by every login, logout and forced end of the session. Pass it
    /// to [`renew`](Self::renew) to act only on today's session.
    pub fn generation(&self) -> u64 {
        self.inner.control().generation
    }

    /// When the current token lapses, if it has a lifetime.
    pub fn token_expires_at(&self) -> Option<Instant> {
        self.inner.state.borrow().token().and_then(AccessToken::expires_at)
    }

    /// Whether a refresh is currently outstanding.
    pub fn is_refreshing(&self) -> bool {
        self.inner.control().in_flight.is_some()
    }

    pub fn is_authenticated(&self) -> bool {
        self.inner.state.borrow().is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading()
    }

    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user().cloned()
    }

    /// Bearer token, only while authenticated.
    pub fn access_token(&self) -> Option<String> {
        self.inner.state.borrow().access_token().map(str::to_owned)
    }

    pub fn last_error(&self) -> Option<String> {
        self.inner.state.borrow().last_error().map(str::to_owned)
    }

    pub fn has_permission(&self, resource: &str, action: Action) -> bool {
        self.inner.state.borrow().has_permission(resource, action)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.inner.state.borrow().has_role(role)
    }

    pub fn has_role_named(&self, name: &str) -> bool {
        self.inner.state.borrow().has_role_named(name)
    }
}
