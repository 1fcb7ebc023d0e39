//! Integration tests for the session store: coalescing, ordering and the
//! login/logout scenarios, driven by a scripted backend.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use campus_gateway::ApiError;
use campus_session::{
    Action, AuthBackend, AuthGrant, Credentials, MemoryMarker, Role, SESSION_EXPIRED,
    SessionError, SessionStore, User,
};

/// Backend that answers refreshes from a queue after a fixed delay and
/// accepts a single hard-coded password.
#[derive(Clone, Default)]
struct ScriptedBackend {
    refreshes: Arc<Mutex<VecDeque<Result<AuthGrant, ApiError>>>>,
    refresh_calls: Arc<AtomicUsize>,
    login_calls: Arc<AtomicUsize>,
    delay: Duration,
    login_delay: Duration,
}

impl ScriptedBackend {
    fn with_delay(delay: Duration) -> Self {
        Self {
            delay,
            ..Self::default()
        }
    }

    fn push_refresh(&self, reply: Result<AuthGrant, ApiError>) {
        self.refreshes.lock().unwrap().push_back(reply);
    }

    fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }
}

impl AuthBackend for ScriptedBackend {
    async fn login(&self, credentials: &Credentials) -> Result<AuthGrant, ApiError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.login_delay).await;
        if credentials.password == "admin123" {
            Ok(AuthGrant::new(
                User::new("1", "Administrator", &credentials.email).with_role(Role::Admin),
                "login-token",
            ))
        } else {
            Err(ApiError::new(401, "Invalid email or password").with_code("INVALID_CREDENTIALS"))
        }
    }

    async fn refresh(&self, _token: Option<String>) -> Result<AuthGrant, ApiError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.refreshes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ApiError::network("no scripted reply")))
    }
}

fn bursar_grant(token: &str) -> AuthGrant {
    AuthGrant::new(
        User::new("7", "Ama Mensah", "ama@school.test").with_role(Role::Bursar),
        token,
    )
}

// =========================================================================
// Scenarios
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_login_then_logout_clears_session() {
    let store = SessionStore::new(ScriptedBackend::default());

    store.login("admin@x.test", "admin123").await.unwrap();
    assert!(store.is_authenticated());
    assert_eq!(store.user().unwrap().email, "admin@x.test");
    assert!(store.has_permission("invoices", Action::Delete));

    store.logout();

    assert!(!store.is_authenticated());
    assert!(store.user().is_none());
    assert!(!store.has_permission("invoices", Action::Read));
}

#[tokio::test(start_paused = true)]
async fn test_login_failure_reports_message() {
    let store = SessionStore::new(ScriptedBackend::default());

    let err = store.login("admin@x.test", "wrong").await.unwrap_err();

    assert_eq!(err.user_message(), "Invalid email or password");
    assert_eq!(
        err.api_error().and_then(|e| e.code.as_deref()),
        Some("INVALID_CREDENTIALS")
    );
    assert!(!store.is_authenticated());
    assert!(!store.is_loading());
    assert_eq!(store.last_error().as_deref(), Some("Invalid email or password"));
}

#[tokio::test(start_paused = true)]
async fn test_login_is_loading_while_outstanding() {
    let backend = ScriptedBackend {
        login_delay: Duration::from_millis(200),
        ..ScriptedBackend::default()
    };
    let store = SessionStore::new(backend);
    store.settle();

    let pending = tokio::spawn({
        let store = store.clone();
        async move { store.login("admin@x.test", "admin123").await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(store.is_loading());

    pending.await.unwrap().unwrap();
    assert!(!store.is_loading());
}

// =========================================================================
// Coalescing
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_concurrent_refreshes_issue_one_call() {
    let backend = ScriptedBackend::with_delay(Duration::from_millis(100));
    backend.push_refresh(Ok(bursar_grant("renewed")));
    let store = SessionStore::new(backend.clone());

    let (first, second) = tokio::join!(store.refresh(), store.refresh());

    assert_eq!(first, Ok(()));
    assert_eq!(second, Ok(()));
    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(store.access_token().as_deref(), Some("renewed"));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_refreshes_share_failure() {
    let backend = ScriptedBackend::with_delay(Duration::from_millis(100));
    backend.push_refresh(Err(ApiError::new(502, "Bad Gateway")));
    let store = SessionStore::new(backend.clone());

    let (first, second) = tokio::join!(store.refresh(), store.refresh());

    assert!(matches!(first, Err(SessionError::RefreshFailed(_))));
    assert_eq!(first, second);
    assert_eq!(backend.refresh_calls(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_sequential_refreshes_each_call_backend() {
    let backend = ScriptedBackend::with_delay(Duration::from_millis(10));
    backend.push_refresh(Ok(bursar_grant("one")));
    backend.push_refresh(Ok(bursar_grant("two")));
    let store = SessionStore::new(backend.clone());

    store.refresh().await.unwrap();
    store.refresh().await.unwrap();

    assert_eq!(backend.refresh_calls(), 2);
    assert_eq!(store.access_token().as_deref(), Some("two"));
}

// =========================================================================
// Ordering
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_refresh_landing_after_logout_is_discarded() {
    let backend = ScriptedBackend::with_delay(Duration::from_millis(100));
    backend.push_refresh(Ok(bursar_grant("late")));
    let store = SessionStore::new(backend.clone());
    store.login("admin@x.test", "admin123").await.unwrap();

    let pending = tokio::spawn({
        let store = store.clone();
        async move { store.refresh().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    store.logout();

    assert_eq!(pending.await.unwrap(), Err(SessionError::Superseded));
    assert!(!store.is_authenticated());
    assert!(store.user().is_none());
}

#[tokio::test(start_paused = true)]
async fn test_newer_login_wins_over_slow_refresh() {
    let backend = ScriptedBackend::with_delay(Duration::from_millis(500));
    backend.push_refresh(Ok(bursar_grant("stale")));
    let store = SessionStore::new(backend.clone());

    let pending = tokio::spawn({
        let store = store.clone();
        async move { store.refresh().await }
    });
    tokio::time::sleep(Duration::from_millis(10)).await;
    store.login("admin@x.test", "admin123").await.unwrap();

    assert_eq!(pending.await.unwrap(), Err(SessionError::Superseded));
    assert_eq!(store.access_token().as_deref(), Some("login-token"));
    assert!(store.has_role(Role::Admin));
}

#[tokio::test(start_paused = true)]
async fn test_refresh_401_while_authenticated_clears_session() {
    let backend = ScriptedBackend::default();
    backend.push_refresh(Err(ApiError::new(401, "Token expired")));
    let store = SessionStore::with_marker(backend, MemoryMarker::new());
    store.login("admin@x.test", "admin123").await.unwrap();
    assert!(store.was_signed_in());

    let err = store.refresh().await.unwrap_err();

    assert!(err.is_auth_expired());
    assert!(!store.is_authenticated());
    assert!(!store.was_signed_in());
    assert_eq!(store.last_error().as_deref(), Some("Token expired"));
}

#[tokio::test(start_paused = true)]
async fn test_background_refresh_does_not_flip_loading() {
    let backend = ScriptedBackend::with_delay(Duration::from_millis(100));
    backend.push_refresh(Ok(bursar_grant("renewed")));
    let store = SessionStore::new(backend);
    store.login("admin@x.test", "admin123").await.unwrap();
    let mut rx = store.subscribe();

    store.refresh().await.unwrap();

    rx.changed().await.unwrap();
    assert!(!rx.borrow().is_loading());
    assert!(rx.borrow().is_authenticated());
}

#[tokio::test(start_paused = true)]
async fn test_legacy_role_predicate_resolves_to_bursar() {
    let backend = ScriptedBackend::default();
    backend.push_refresh(Ok(bursar_grant("t")));
    let store = SessionStore::new(backend);

    store.refresh().await.unwrap();

    assert!(store.has_role_named("accountant"));
    assert!(store.has_role(Role::Bursar));
    assert!(!store.has_role_named("storekeeper"));
}

// =========================================================================
// Renewal and expiry
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_renew_after_logout_skips_backend() {
    let backend = ScriptedBackend::default();
    backend.push_refresh(Ok(bursar_grant("resurrected")));
    let store = SessionStore::new(backend.clone());
    store.login("admin@x.test", "admin123").await.unwrap();
    let generation = store.generation();

    store.logout();
    let err = store.renew(generation).await.unwrap_err();

    assert_eq!(err, SessionError::Superseded);
    assert_eq!(backend.refresh_calls(), 0);
    assert!(!store.is_authenticated());
}

#[tokio::test(start_paused = true)]
async fn test_renew_current_session_calls_backend() {
    let backend = ScriptedBackend::default();
    backend.push_refresh(Ok(bursar_grant("renewed")));
    let store = SessionStore::new(backend.clone());
    store.login("admin@x.test", "admin123").await.unwrap();

    store.renew(store.generation()).await.unwrap();

    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(store.access_token().as_deref(), Some("renewed"));
}

#[tokio::test(start_paused = true)]
async fn test_lapsed_token_clears_and_notifies() {
    let backend = ScriptedBackend::default();
    backend.push_refresh(Ok(bursar_grant("short").expiring_in(60)));
    let store = SessionStore::with_marker(backend, MemoryMarker::new());
    store.refresh().await.unwrap();
    let mut rx = store.subscribe();
    assert!(store.token_expires_at().is_some());

    tokio::time::sleep(Duration::from_secs(61)).await;

    assert!(rx.has_changed().unwrap());
    assert!(!rx.borrow_and_update().is_authenticated());
    assert!(store.user().is_none());
    assert_eq!(store.last_error().as_deref(), Some(SESSION_EXPIRED));
}

#[tokio::test(start_paused = true)]
async fn test_renewed_token_resets_expiry_timer() {
    let backend = ScriptedBackend::default();
    backend.push_refresh(Ok(bursar_grant("first").expiring_in(60)));
    backend.push_refresh(Ok(bursar_grant("second").expiring_in(60)));
    let store = SessionStore::new(backend);
    store.refresh().await.unwrap();

    tokio::time::sleep(Duration::from_secs(45)).await;
    store.refresh().await.unwrap();
    tokio::time::sleep(Duration::from_secs(45)).await;

    assert!(store.is_authenticated());
    assert_eq!(store.access_token().as_deref(), Some("second"));
}
