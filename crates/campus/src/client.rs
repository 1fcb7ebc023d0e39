//! The `Campus` client: one object wiring every layer together.

use campus_access::{GuardPolicy, Navigator, PermissionEvaluator, RouteGuard};
use campus_gateway::{ReqwestTransport, RequestGateway, Transport};
use campus_lifecycle::SessionLifecycle;
use campus_session::{
    Action, FileMarker, GatewayAuthBackend, Role, Session, SessionStore, User,
};
use tokio::sync::watch;
use tracing::info;

use crate::{AuthorizedGateway, CampusError, Config, authorized_gateway};

/// Auth backend used by [`Campus`] over transport `T`.
pub type Backend<T> = GatewayAuthBackend<T>;

/// A configured client.
///
/// Outer modules see only this surface: sign in and out, ask who is signed
/// in and what they may do, and call the API with the session attached.
/// The session itself stays private to the store.
///
/// ```rust,no_run
/// # async fn demo() -> Result<(), campus::CampusError> {
/// use campus::prelude::*;
///
/// let campus = Campus::from_config(Config::from_env())?;
/// campus.start().await?;
/// campus.login("admin@x.test", "admin123").await?;
/// assert!(campus.is_authenticated());
/// # Ok(())
/// # }
/// ```
pub struct Campus<T: Transport + Clone = ReqwestTransport> {
    config: Config,
    store: SessionStore<Backend<T>>,
    lifecycle: SessionLifecycle<Backend<T>>,
    api: AuthorizedGateway<T, Backend<T>>,
}

impl Campus<ReqwestTransport> {
    /// Builds a client speaking HTTP to `config.origin`.
    ///
    /// # Errors
    /// [`CampusError::Transport`] when the origin isn't a valid URL or the
    /// HTTP client can't be built.
    pub fn from_config(config: Config) -> Result<Self, CampusError> {
        let transport = ReqwestTransport::for_origin(&config.origin)?;
        Ok(Self::with_transport(config, transport))
    }
}

impl<T: Transport + Clone> Campus<T> {
    /// Builds a client over any transport. The auth endpoints and the
    /// API share it, so cookies set by one are seen by the other.
    pub fn with_transport(config: Config, transport: T) -> Self {
        let backend = GatewayAuthBackend::new(RequestGateway::new(
            transport.clone(),
            config.gateway_config(),
        ));
        let store = match &config.session_marker {
            Some(path) => SessionStore::with_marker(backend, FileMarker::new(path)),
            None => SessionStore::new(backend),
        };
        let lifecycle = SessionLifecycle::new(store.clone(), config.lifecycle_config());
        let api = authorized_gateway(transport, config.gateway_config(), store.clone());

        info!(api_url = %config.api_url, "campus client configured");
        Self {
            config,
            store,
            lifecycle,
            api,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // -- lifecycle ----------------------------------------------------------

    /// Restores a previous session if there was one and starts the
    /// keep-alive schedule.
    pub async fn start(&self) -> Result<(), CampusError> {
        self.lifecycle.start().await?;
        Ok(())
    }

    /// Resolves once startup has finished.
    pub async fn ready(&self) {
        self.lifecycle.ready().await;
    }

    pub fn is_ready(&self) -> bool {
        self.lifecycle.is_ready()
    }

    /// Stops background refreshing. The session is left as it is.
    pub fn shutdown(&self) {
        self.lifecycle.shutdown();
    }

    pub fn lifecycle(&self) -> &SessionLifecycle<Backend<T>> {
        &self.lifecycle
    }

    // -- session ------------------------------------------------------------

    pub async fn login(
        &self,
        email: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<(), CampusError> {
        self.store.login(email, password).await?;
        Ok(())
    }

    pub fn logout(&self) {
        self.store.logout();
    }

    pub fn is_authenticated(&self) -> bool {
        self.store.is_authenticated()
    }

    pub fn is_loading(&self) -> bool {
        self.store.is_loading()
    }

    pub fn user(&self) -> Option<User> {
        self.store.user()
    }

    pub fn last_error(&self) -> Option<String> {
        self.store.last_error()
    }

    pub fn has_permission(&self, resource: &str, action: Action) -> bool {
        self.store.has_permission(resource, action)
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.store.has_role(role)
    }

    /// Changes to the session, for anything that re-renders on them.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.store.subscribe()
    }

    // -- access -------------------------------------------------------------

    /// Checks against the current session.
    pub fn permissions(&self) -> PermissionEvaluator {
        PermissionEvaluator::new(self.store.snapshot())
    }

    /// A route guard using the configured destinations.
    pub fn guard<N: Navigator>(&self, policy: GuardPolicy, navigator: N) -> RouteGuard<N> {
        RouteGuard::new(policy, self.config.destinations(), navigator)
    }

    // -- api ----------------------------------------------------------------

    /// Gateway for domain requests, with the bearer token attached.
    pub fn api(&self) -> &AuthorizedGateway<T, Backend<T>> {
        &self.api
    }
}
