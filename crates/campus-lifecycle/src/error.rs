//! Error types for the lifecycle controller.

use crate::InitState;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LifecycleError {
    /// `start()` was called on a controller that already started.
    #[error("lifecycle already started (state: {0})")]
    AlreadyStarted(InitState),

    /// The controller was shut down; it can't be started again.
    #[error("lifecycle has been shut down")]
    ShutDown,
}
