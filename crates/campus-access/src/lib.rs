//! Access control for Campus clients.
//!
//! # Key types
//!
//! - [`RouteGuard`]: redirects into or out of the sign-in wall, once per
//!   transition, never while the session is still loading
//! - [`decide`]: the guard's pure decision function
//! - [`PermissionEvaluator`]: fail-closed permission and role checks over
//!   a [`Session`](campus_session::Session) snapshot
//! - [`PermissionGate`]: a requirement bound to a combinator, for showing
//!   or hiding content

mod guard;
mod permissions;

pub use guard::{GuardDecision, GuardDestinations, GuardPolicy, Navigator, RouteGuard, decide};
pub use permissions::{Combinator, PermissionEvaluator, PermissionGate, Requirement};
