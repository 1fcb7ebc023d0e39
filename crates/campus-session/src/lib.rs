//! Session engine for Campus clients.
//!
//! This crate owns the answer to "is anybody signed in, and who?":
//!
//! 1. **Identity model**: [`User`], the closed [`Role`] set with its legacy
//!    alias table, and [`Grant`]s of [`Action`]s on resources
//! 2. **Session state**: [`Session`] snapshots published by a
//!    [`SessionStore`], the only component allowed to change them
//! 3. **Backend seam**: the [`AuthBackend`] trait, implemented over the
//!    request gateway by [`GatewayAuthBackend`]
//! 4. **Restore hint**: a [`SessionMarker`] recording that a previous run
//!    was signed in
//!
//! # How it fits in the stack
//!
//! ```text
//! Lifecycle / Access (above)  ← schedule refreshes, guard routes, check grants
//!     ↕
//! Session Layer (this crate)  ← owns Session, serializes login/refresh/logout
//!     ↕
//! Gateway Layer (below)       ← HTTP requests, ApiError taxonomy
//! ```

#![allow(async_fn_in_trait)]

mod backend;
mod error;
mod grant;
mod marker;
mod role;
mod session;
mod store;
mod user;

pub use backend::{
    AuthBackend, AuthGrant, Credentials, GatewayAuthBackend, LOGIN_ENDPOINT, REFRESH_ENDPOINT,
};
pub use error::SessionError;
pub use grant::{ANY_RESOURCE, Action, Grant, GrantParseError};
pub use marker::{FileMarker, MemoryMarker, SessionMarker};
pub use role::{LEGACY_ALIASES, Role};
pub use session::{AccessToken, Session};
pub use store::{SESSION_EXPIRED, SessionStore};
pub use user::User;
