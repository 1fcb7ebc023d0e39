//! Authenticated access to the API.
//!
//! [`BearerTransport`] sits between the gateway and the real transport. It
//! attaches the session's bearer token to every request and, when the
//! backend answers 401/403 to a request that carried a token, expires the
//! session. The gateway still classifies the response, so the caller gets
//! an `AuthExpired` [`ApiError`](campus_gateway::ApiError) as usual.

use campus_gateway::{
    ErrorKind, GatewayConfig, HttpRequest, HttpResponse, RequestGateway, Transport,
    TransportError,
};
use campus_session::{AuthBackend, SessionStore};
use tracing::warn;

/// A [`RequestGateway`] whose requests carry the session's bearer token.
pub type AuthorizedGateway<T, B> = RequestGateway<BearerTransport<T, B>>;

/// Builds an [`AuthorizedGateway`] over `transport`.
pub fn authorized_gateway<T: Transport, B: AuthBackend>(
    transport: T,
    config: GatewayConfig,
    store: SessionStore<B>,
) -> AuthorizedGateway<T, B> {
    RequestGateway::new(BearerTransport::new(transport, store), config)
}

/// Transport wrapper adding `Authorization: Bearer <token>`.
pub struct BearerTransport<T: Transport, B: AuthBackend> {
    inner: T,
    store: SessionStore<B>,
}

impl<T: Transport, B: AuthBackend> BearerTransport<T, B> {
    pub fn new(inner: T, store: SessionStore<B>) -> Self {
        Self { inner, store }
    }
}

impl<T: Transport, B: AuthBackend> Transport for BearerTransport<T, B> {
    async fn send(&self, mut request: HttpRequest) -> Result<HttpResponse, TransportError> {
        let token = self.store.access_token();
        if let Some(token) = &token {
            if request.header("Authorization").is_none() {
                request
                    .headers
                    .push(("Authorization".into(), format!("Bearer {token}")));
            }
        }

        let response = self.inner.send(request).await?;

        // Only expire the session the token came from; a newer login that
        // happened meanwhile is left alone.
        if ErrorKind::of_status(response.status) == ErrorKind::AuthExpired
            && token.is_some()
            && self.store.access_token() == token
        {
            warn!(status = response.status, "authenticated request rejected, expiring session");
            self.store.expire_token();
        }
        Ok(response)
    }
}
