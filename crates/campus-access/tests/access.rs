//! Integration tests: guards and permission checks driven by a live
//! session store.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use campus_access::{
    Combinator, GuardDecision, GuardDestinations, Navigator, PermissionEvaluator, Requirement,
    RouteGuard,
};
use campus_gateway::ApiError;
use campus_session::{Action, AuthBackend, AuthGrant, Credentials, Role, SessionStore, User};

// =========================================================================
// Helpers
// =========================================================================

struct FixedBackend;

impl AuthBackend for FixedBackend {
    async fn login(&self, credentials: &Credentials) -> Result<AuthGrant, ApiError> {
        let role = match credentials.email.as_str() {
            "admin@x.test" => Role::Admin,
            "bursar@x.test" => Role::Bursar,
            "short@x.test" => {
                let user = User::new("2", "Brief", &credentials.email).with_role(Role::Admin);
                return Ok(AuthGrant::new(user, "t").expiring_in(60));
            }
            _ => return Err(ApiError::new(401, "Invalid credentials")),
        };
        Ok(AuthGrant::new(
            User::new("1", "Someone", &credentials.email).with_role(role),
            "t",
        ))
    }

    async fn refresh(&self, _token: Option<String>) -> Result<AuthGrant, ApiError> {
        Err(ApiError::new(401, "No session"))
    }
}

#[derive(Clone, Default)]
struct Recorder(Arc<Mutex<Vec<String>>>);

impl Recorder {
    fn visits(&self) -> Vec<String> {
        self.0.lock().unwrap().clone()
    }
}

impl Navigator for Recorder {
    fn navigate(&self, destination: &str) {
        self.0.lock().unwrap().push(destination.to_owned());
    }
}

async fn let_tasks_run() {
    tokio::time::sleep(Duration::from_millis(1)).await;
}

// =========================================================================
// RouteGuard
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_protected_guard_redirects_when_token_lapses() {
    let store = SessionStore::new(FixedBackend);
    store.settle();
    store.login("short@x.test", "pw").await.unwrap();
    let recorder = Recorder::default();
    let guard = RouteGuard::protected(GuardDestinations::default(), recorder.clone());
    let follower = tokio::spawn(guard.follow(store.subscribe()));

    tokio::time::sleep(Duration::from_secs(59)).await;
    assert!(recorder.visits().is_empty(), "token still valid");

    tokio::time::sleep(Duration::from_secs(2)).await;

    assert!(!store.is_authenticated());
    assert_eq!(recorder.visits(), vec!["/login".to_string()]);
    follower.abort();
}

#[tokio::test(start_paused = true)]
async fn test_protected_guard_waits_then_redirects_once() {
    let store = SessionStore::new(FixedBackend);
    let recorder = Recorder::default();
    let guard = RouteGuard::protected(GuardDestinations::default(), recorder.clone());
    let follower = tokio::spawn(guard.follow(store.subscribe()));

    let_tasks_run().await;
    assert!(recorder.visits().is_empty(), "no redirect while loading");

    store.settle();
    let_tasks_run().await;
    store.settle();
    let_tasks_run().await;

    assert_eq!(recorder.visits(), vec!["/login".to_string()]);
    follower.abort();
}

#[tokio::test(start_paused = true)]
async fn test_protected_guard_redirects_after_logout() {
    let store = SessionStore::new(FixedBackend);
    store.settle();
    store.login("admin@x.test", "pw").await.unwrap();
    let recorder = Recorder::default();
    let follower = tokio::spawn(
        RouteGuard::protected(GuardDestinations::default(), recorder.clone())
            .follow(store.subscribe()),
    );
    let_tasks_run().await;
    assert!(recorder.visits().is_empty());

    store.logout();
    let_tasks_run().await;

    assert_eq!(recorder.visits(), vec!["/login".to_string()]);
    follower.abort();
}

#[tokio::test(start_paused = true)]
async fn test_public_guard_sends_signed_in_user_to_landing() {
    let store = SessionStore::new(FixedBackend);
    store.settle();
    let recorder = Recorder::default();
    let destinations = GuardDestinations {
        sign_in: "/sign-in".into(),
        landing: "/home".into(),
    };
    let follower = tokio::spawn(
        RouteGuard::public(destinations, recorder.clone()).follow(store.subscribe()),
    );
    let_tasks_run().await;
    assert!(recorder.visits().is_empty());

    store.login("bursar@x.test", "pw").await.unwrap();
    let_tasks_run().await;

    assert_eq!(recorder.visits(), vec!["/home".to_string()]);
    follower.abort();
}

#[tokio::test(start_paused = true)]
async fn test_follow_returns_guard_when_store_dropped() {
    let store = SessionStore::new(FixedBackend);
    store.settle();
    let receiver = store.subscribe();
    let follower = tokio::spawn(
        RouteGuard::protected(GuardDestinations::default(), Recorder::default()).follow(receiver),
    );
    let_tasks_run().await;

    drop(store);
    let guard = follower.await.unwrap();

    assert_eq!(
        guard.last_decision(),
        Some(&GuardDecision::Redirect("/login".into()))
    );
    assert_eq!(guard.redirects(), 1);
}

// =========================================================================
// PermissionEvaluator
// =========================================================================

#[tokio::test]
async fn test_evaluator_reflects_store_snapshot() {
    let store = SessionStore::new(FixedBackend);
    store.login("bursar@x.test", "pw").await.unwrap();

    let eval = PermissionEvaluator::new(store.snapshot());

    assert!(eval.is_bursar());
    assert!(eval.can_approve("invoices"));
    assert!(!eval.can_approve("purchases"));
    assert!(eval.evaluate(
        &Requirement::permission("payments", Action::Export).with_role(Role::Bursar),
        Combinator::All,
    ));
}

#[tokio::test]
async fn test_evaluator_snapshot_after_logout_is_denied() {
    let store = SessionStore::new(FixedBackend);
    store.login("admin@x.test", "pw").await.unwrap();
    store.logout();

    let eval = PermissionEvaluator::from(store.snapshot());

    assert!(!eval.is_admin());
    assert!(!eval.can_read("students"));
    assert!(!eval.evaluate(&Requirement::signed_in(), Combinator::Any));
}
