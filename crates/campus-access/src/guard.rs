//! Route guards: decide what a route shows, then perform the redirect.
//!
//! The decision is a pure function ([`decide`]) of two booleans, so it can
//! be tested without any rendering environment. The side effect lives in
//! [`RouteGuard`], which remembers its last decision and navigates only
//! when the decision *changes into* a redirect.

use campus_session::Session;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};

// ---------------------------------------------------------------------------
// Policy and decision
// ---------------------------------------------------------------------------

/// Which side of the sign-in wall a route lives on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GuardPolicy {
    /// Only for signed-in users; others go to the sign-in page.
    Protected,
    /// Only for signed-out users (the sign-in page itself); signed-in
    /// users go to the landing page.
    Public,
}

/// What a guarded route should do right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session not known yet: show a neutral placeholder.
    Wait,
    Render,
    Redirect(String),
}

impl GuardDecision {
    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::Redirect(_))
    }
}

/// Where guards send people.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardDestinations {
    pub sign_in: String,
    pub landing: String,
}

impl Default for GuardDestinations {
    fn default() -> Self {
        Self {
            sign_in: "/login".into(),
            landing: "/dashboard".into(),
        }
    }
}

/// The guard decision for a given session state.
///
/// Never redirects while `is_loading`.
pub fn decide(
    policy: GuardPolicy,
    is_authenticated: bool,
    is_loading: bool,
    destinations: &GuardDestinations,
) -> GuardDecision {
    if is_loading {
        return GuardDecision::Wait;
    }
    match (policy, is_authenticated) {
        (GuardPolicy::Protected, false) => GuardDecision::Redirect(destinations.sign_in.clone()),
        (GuardPolicy::Public, true) => GuardDecision::Redirect(destinations.landing.clone()),
        _ => GuardDecision::Render,
    }
}

// ---------------------------------------------------------------------------
// Navigator
// ---------------------------------------------------------------------------

/// Performs navigation for a [`RouteGuard`].
pub trait Navigator: Send + Sync {
    fn navigate(&self, destination: &str);
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync,
{
    fn navigate(&self, destination: &str) {
        self(destination);
    }
}

// ---------------------------------------------------------------------------
// RouteGuard
// ---------------------------------------------------------------------------

/// A guard bound to one route and one navigator.
///
/// Feed it session states with [`observe`](Self::observe) (once per
/// render, as often as you like) or let [`follow`](Self::follow) feed it
/// from the store's watch channel. Navigation fires once per transition
/// into a redirect, never on repeated observations of the same state.
pub struct RouteGuard<N: Navigator> {
    policy: GuardPolicy,
    destinations: GuardDestinations,
    navigator: N,
    last: Option<GuardDecision>,
    redirects: u64,
}

impl<N: Navigator> RouteGuard<N> {
    pub fn new(policy: GuardPolicy, destinations: GuardDestinations, navigator: N) -> Self {
        Self {
            policy,
            destinations,
            navigator,
            last: None,
            redirects: 0,
        }
    }

    pub fn protected(destinations: GuardDestinations, navigator: N) -> Self {
        Self::new(GuardPolicy::Protected, destinations, navigator)
    }

    pub fn public(destinations: GuardDestinations, navigator: N) -> Self {
        Self::new(GuardPolicy::Public, destinations, navigator)
    }

    pub fn policy(&self) -> GuardPolicy {
        self.policy
    }

    /// The most recent decision, if any state has been observed.
    pub fn last_decision(&self) -> Option<&GuardDecision> {
        self.last.as_ref()
    }

    /// How many times this guard has navigated.
    pub fn redirects(&self) -> u64 {
        self.redirects
    }

    /// Decides for the given state and navigates if the decision just
    /// became a redirect.
    pub fn observe(&mut self, is_authenticated: bool, is_loading: bool) -> GuardDecision {
        let decision = decide(self.policy, is_authenticated, is_loading, &self.destinations);
        if self.last.as_ref() != Some(&decision) {
            debug!(policy = ?self.policy, ?decision, "guard decision changed");
            if let GuardDecision::Redirect(destination) = &decision {
                info!(policy = ?self.policy, destination = %destination, "redirecting");
                self.navigator.navigate(destination);
                self.redirects += 1;
            }
            self.last = Some(decision.clone());
        }
        decision
    }

    pub fn observe_session(&mut self, session: &Session) -> GuardDecision {
        self.observe(session.is_authenticated(), session.is_loading())
    }

    /// Drives the guard from a session channel until the sending store is
    /// dropped, then hands the guard back.
    pub async fn follow(mut self, mut session: watch::Receiver<Session>) -> Self {
        loop {
            let (authenticated, loading) = {
                let current = session.borrow_and_update();
                (current.is_authenticated(), current.is_loading())
            };
            self.observe(authenticated, loading);
            if session.changed().await.is_err() {
                return self;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn dest() -> GuardDestinations {
        GuardDestinations::default()
    }

    #[derive(Clone, Default)]
    struct Recorder(Arc<Mutex<Vec<String>>>);

    impl Navigator for Recorder {
        fn navigate(&self, destination: &str) {
            self.0.lock().unwrap().push(destination.to_owned());
        }
    }

    #[test]
    fn test_decide_waits_while_loading() {
        for policy in [GuardPolicy::Protected, GuardPolicy::Public] {
            for authenticated in [true, false] {
                assert_eq!(decide(policy, authenticated, true, &dest()), GuardDecision::Wait);
            }
        }
    }

    #[test]
    fn test_decide_protected() {
        assert_eq!(
            decide(GuardPolicy::Protected, false, false, &dest()),
            GuardDecision::Redirect("/login".into())
        );
        assert_eq!(
            decide(GuardPolicy::Protected, true, false, &dest()),
            GuardDecision::Render
        );
    }

    #[test]
    fn test_decide_public() {
        assert_eq!(
            decide(GuardPolicy::Public, true, false, &dest()),
            GuardDecision::Redirect("/dashboard".into())
        );
        assert_eq!(decide(GuardPolicy::Public, false, false, &dest()), GuardDecision::Render);
    }

    #[test]
    fn test_observe_redirects_once_per_transition() {
        let recorder = Recorder::default();
        let mut guard = RouteGuard::protected(dest(), recorder.clone());

        guard.observe(false, true);
        guard.observe(false, true);
        assert!(recorder.0.lock().unwrap().is_empty(), "no redirect while loading");

        guard.observe(false, false);
        guard.observe(false, false);
        guard.observe(false, false);

        assert_eq!(*recorder.0.lock().unwrap(), vec!["/login".to_string()]);
        assert_eq!(guard.redirects(), 1);
    }

    #[test]
    fn test_observe_redirects_again_after_new_transition() {
        let recorder = Recorder::default();
        let mut guard = RouteGuard::protected(dest(), recorder.clone());

        guard.observe(true, false);
        guard.observe(false, false);
        guard.observe(true, false);
        guard.observe(false, false);

        assert_eq!(guard.redirects(), 2);
    }

    #[test]
    fn test_closure_navigator() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let mut guard = RouteGuard::public(dest(), move |to: &str| {
            *sink.lock().unwrap() = Some(to.to_owned());
        });

        let decision = guard.observe(true, false);

        assert!(decision.is_redirect());
        assert_eq!(seen.lock().unwrap().as_deref(), Some("/dashboard"));
    }
}
