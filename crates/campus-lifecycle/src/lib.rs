//! Session bootstrap and keep-alive for Campus clients.
//!
//! [`SessionLifecycle`] does two jobs so callers never have to:
//!
//! - **Startup**: if a previous run left a session marker, try one refresh
//!   to restore the session, then declare the app ready whatever the
//!   outcome.
//! - **Keep-alive**: while the session is authenticated, refresh it every
//!   [`LifecycleConfig::refresh_interval`] (15 minutes by default). The
//!   timer is cancelled the moment the session ends.
//!
//! A token with a short lifetime is renewed a little before it lapses
//! instead of waiting for the next interval.
//!
//! A scheduled refresh that fails is logged and retried next interval,
//! unless the backend says the session expired (401/403); the store has
//! then already signed the user out and the schedule simply ends.
//!
//! # Integration
//!
//! ```ignore
//! let lifecycle = SessionLifecycle::new(store.clone(), LifecycleConfig::default());
//! lifecycle.start().await?;
//! // ... app runs; sign-in/out go through `store` ...
//! lifecycle.shutdown();
//! ```

mod config;
mod controller;
mod error;
mod schedule;

pub use config::{InitState, LifecycleConfig};
pub use controller::SessionLifecycle;
pub use error::LifecycleError;
pub use schedule::{LifecycleMetrics, RefreshSchedule};
