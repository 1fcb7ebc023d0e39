//! # Campus
//!
//! Session and access-control engine for Campus web clients.
//!
//! The workspace is split by layer; this crate ties the layers together:
//!
//! ```text
//! campus-access     ← route guards, permission checks
//! campus-lifecycle  ← startup restore, 15-minute keep-alive
//! campus-session    ← SessionStore, roles, grants
//! campus-gateway    ← HTTP requests, ApiError taxonomy
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use campus::prelude::*;
//!
//! # async fn run() -> Result<(), CampusError> {
//! campus::init_tracing();
//! let campus = Campus::from_config(Config::from_env())?;
//! campus.start().await?;
//!
//! campus.login("bursar@school.test", "secret").await?;
//! if campus.permissions().can_approve("invoices") {
//!     // ...
//! }
//! # Ok(())
//! # }
//! ```

mod api;
mod client;
mod config;
mod error;
mod telemetry;

pub use api::{AuthorizedGateway, BearerTransport, authorized_gateway};
pub use client::{Backend, Campus};
pub use config::{
    Config, ENV_API_URL, ENV_LANDING_PATH, ENV_ORIGIN, ENV_REFRESH_INTERVAL_SECS,
    ENV_SESSION_MARKER, ENV_SIGN_IN_PATH,
};
pub use error::CampusError;
pub use telemetry::{DEFAULT_FILTER, init_tracing};

pub use campus_access as access;
pub use campus_gateway as gateway;
pub use campus_lifecycle as lifecycle;
pub use campus_session as session;

pub mod prelude {
    pub use crate::{Campus, CampusError, Config};
    pub use campus_access::{
        Combinator, GuardDecision, GuardDestinations, GuardPolicy, Navigator,
        PermissionEvaluator, PermissionGate, Requirement, RouteGuard,
    };
    pub use campus_gateway::{
        ApiError, ErrorKind, Page, PageQuery, QueryParams, RetryPolicy, SortOrder,
    };
    pub use campus_lifecycle::{InitState, LifecycleConfig};
    pub use campus_session::{Action, Grant, Role, Session, User};
}
