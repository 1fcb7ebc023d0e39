//! Session types: the client-held record of who is signed in.
//!
//! A [`Session`] is a value. The only way to change the live session is
//! through [`SessionStore`](crate::SessionStore); everybody else gets
//! snapshots, so fields are private and exposed through getters.

use std::time::Duration;

use tokio::time::Instant;

use crate::{Action, Role, User};

/// Bearer credential plus local validity bookkeeping.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
    value: String,
    expires_at: Option<Instant>,
    invalidated: bool,
}

impl AccessToken {
    pub fn new(value: impl Into<String>, expires_in: Option<Duration>) -> Self {
        Self {
            value: value.into(),
            expires_at: expires_in.map(|d| Instant::now() + d),
            invalidated: false,
        }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn expires_at(&self) -> Option<Instant> {
        self.expires_at
    }

    /// Expired by the clock, or marked invalid locally.
    pub fn is_expired(&self) -> bool {
        self.invalidated || self.expires_at.is_some_and(|at| Instant::now() >= at)
    }

    pub(crate) fn invalidate(&mut self) {
        self.invalidated = true;
    }
}

// Tokens never show up in logs.
impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("value", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .field("invalidated", &self.invalidated)
            .finish()
    }
}

/// Snapshot of the session.
///
/// `is_authenticated()` is true iff a user and a token are both present and
/// the token is neither expired nor invalidated. It is computed, never
/// stored, so it can't drift from the fields it depends on.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    user: Option<User>,
    token: Option<AccessToken>,
    is_loading: bool,
    last_error: Option<String>,
}

impl Session {
    /// The state a fresh store starts in: nothing known yet.
    pub fn unknown() -> Self {
        Self {
            is_loading: true,
            ..Self::default()
        }
    }

    /// A settled session with nobody signed in.
    pub fn signed_out() -> Self {
        Self::default()
    }

    /// A settled session for `user`. Building a value doesn't touch any
    /// store; it's for evaluating checks against a known state.
    pub fn signed_in(user: User, token: AccessToken) -> Self {
        let mut session = Self::default();
        session.establish(user, token);
        session
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn token(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }

    /// Bearer value, only while the session is authenticated.
    pub fn access_token(&self) -> Option<&str> {
        if self.is_authenticated() {
            self.token.as_ref().map(AccessToken::value)
        } else {
            None
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some() && self.token.as_ref().is_some_and(|t| !t.is_expired())
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    /// User-displayable message from the last failed login/refresh.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Fail-closed: false whenever the session isn't authenticated.
    pub fn has_permission(&self, resource: &str, action: Action) -> bool {
        self.authenticated_user()
            .is_some_and(|u| u.has_permission(resource, action))
    }

    /// Fail-closed: false whenever the session isn't authenticated.
    pub fn has_role(&self, role: Role) -> bool {
        self.authenticated_user().is_some_and(|u| u.has_role(role))
    }

    /// Role check by name; legacy names resolve through the alias table.
    /// Unknown names are never held.
    pub fn has_role_named(&self, name: &str) -> bool {
        Role::resolve(name).is_some_and(|role| self.has_role(role))
    }

    fn authenticated_user(&self) -> Option<&User> {
        if self.is_authenticated() {
            self.user.as_ref()
        } else {
            None
        }
    }

    // -- mutation, store only ---------------------------------------------

    pub(crate) fn establish(&mut self, user: User, token: AccessToken) {
        self.user = Some(user);
        self.token = Some(token);
        self.is_loading = false;
        self.last_error = None;
    }

    /// Back to empty, optionally remembering why.
    pub(crate) fn reset(&mut self, last_error: Option<String>) {
        *self = Self {
            last_error,
            ..Self::default()
        };
    }

    pub(crate) fn set_loading(&mut self, loading: bool) {
        self.is_loading = loading;
    }

    pub(crate) fn set_error(&mut self, message: Option<String>) {
        self.last_error = message;
    }

    pub(crate) fn invalidate_token(&mut self) {
        if let Some(token) = &mut self.token {
            token.invalidate();
        }
    }
}
