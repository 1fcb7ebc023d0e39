//! Error types for the session layer.

use campus_gateway::ApiError;

/// Errors returned by [`SessionStore`](crate::SessionStore) operations.
///
/// `Clone` because a coalesced refresh hands the same outcome to every
/// waiter.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    /// The backend rejected the credentials, or the call never made it.
    #[error("login failed: {0}")]
    LoginFailed(ApiError),

    /// The backend answered 401/403: the session is gone and has been
    /// cleared locally.
    #[error("session expired: {0}")]
    AuthExpired(ApiError),

    /// Renewal failed for a non-auth reason (network, 5xx). The current
    /// session is kept.
    #[error("refresh failed: {0}")]
    RefreshFailed(ApiError),

    /// The operation finished after a logout or a newer login and its
    /// result was discarded.
    #[error("superseded by a newer session change")]
    Superseded,
}

impl SessionError {
    /// The underlying gateway error, if there is one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            Self::LoginFailed(e) | Self::AuthExpired(e) | Self::RefreshFailed(e) => Some(e),
            Self::Superseded => None,
        }
    }

    /// Message suitable for showing next to a sign-in form.
    pub fn user_message(&self) -> String {
        match self.api_error() {
            Some(e) => e.message.clone(),
            None => self.to_string(),
        }
    }

    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::AuthExpired(_))
    }
}
