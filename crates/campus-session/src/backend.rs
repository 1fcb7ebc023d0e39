//! The authentication backend the store talks to.
//!
//! [`SessionStore`](crate::SessionStore) never builds HTTP requests itself.
//! It asks an [`AuthBackend`] to log in or renew, and the backend answers
//! with an [`AuthGrant`] or an [`ApiError`]. Production code uses
//! [`GatewayAuthBackend`]; tests plug in a scripted fake.

use std::time::Duration;

use campus_gateway::{ApiError, Envelope, Method, RequestGateway, RequestOptions, Transport};
use serde::{Deserialize, Serialize};

use crate::User;

pub const LOGIN_ENDPOINT: &str = "/auth/login";
pub const REFRESH_ENDPOINT: &str = "/auth/refresh";

/// Email + password, as typed into the sign-in form.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// What a successful login or refresh hands back.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthGrant {
    pub user: User,
    pub access_token: String,
    /// Token lifetime in seconds, when the backend reports one.
    #[serde(default)]
    pub expires_in: Option<u64>,
}

impl AuthGrant {
    pub fn new(user: User, access_token: impl Into<String>) -> Self {
        Self {
            user,
            access_token: access_token.into(),
            expires_in: None,
        }
    }

    #[must_use]
    pub fn expiring_in(mut self, secs: u64) -> Self {
        self.expires_in = Some(secs);
        self
    }

    pub fn lifetime(&self) -> Option<Duration> {
        self.expires_in.map(Duration::from_secs)
    }
}

impl std::fmt::Debug for AuthGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGrant")
            .field("user", &self.user.id)
            .field("access_token", &"<redacted>")
            .field("expires_in", &self.expires_in)
            .finish()
    }
}

/// Performs login and token renewal against the backend.
///
/// # Trait bounds
///
/// `Send + Sync + 'static` because the store shares the backend with the
/// spawned refresh future, which must outlive the caller that started it.
pub trait AuthBackend: Send + Sync + 'static {
    /// Exchanges credentials for a session.
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl std::future::Future<Output = Result<AuthGrant, ApiError>> + Send;

    /// Renews the session.
    ///
    /// `token` is the current access token, if any. Without one the
    /// backend is expected to fall back to its own session cookie.
    fn refresh(
        &self,
        token: Option<String>,
    ) -> impl std::future::Future<Output = Result<AuthGrant, ApiError>> + Send;
}

/// [`AuthBackend`] speaking the Campus auth endpoints through a
/// [`RequestGateway`].
pub struct GatewayAuthBackend<T: Transport> {
    gateway: RequestGateway<T>,
}

impl<T: Transport> GatewayAuthBackend<T> {
    pub fn new(gateway: RequestGateway<T>) -> Self {
        Self { gateway }
    }
}

impl<T: Transport> AuthBackend for GatewayAuthBackend<T> {
    async fn login(&self, credentials: &Credentials) -> Result<AuthGrant, ApiError> {
        let envelope: Envelope<AuthGrant> = self.gateway.post(LOGIN_ENDPOINT, credentials).await?;
        Ok(envelope.data)
    }

    async fn refresh(&self, token: Option<String>) -> Result<AuthGrant, ApiError> {
        let mut options = RequestOptions::new();
        if let Some(token) = token {
            options = options.header("Authorization", format!("Bearer {token}"));
        }
        let envelope: Envelope<AuthGrant> = self
            .gateway
            .request(Method::Post, REFRESH_ENDPOINT, options)
            .await?;
        Ok(envelope.data)
    }
}
