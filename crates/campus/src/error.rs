//! Unified error type for the Campus client.

use campus_gateway::{ApiError, TransportError};
use campus_lifecycle::LifecycleError;
use campus_session::SessionError;

/// Top-level error wrapping every layer's error.
///
/// `#[from]` on each variant lets `?` lift sub-crate errors.
#[derive(Debug, thiserror::Error)]
pub enum CampusError {
    /// A request failed (network, client, auth or server error).
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The HTTP transport could not be built.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// Login or refresh failed.
    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

impl CampusError {
    /// Message suitable for showing to the user.
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(e) => e.message.clone(),
            Self::Session(e) => e.user_message(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_api_error() {
        let err: CampusError = ApiError::new(404, "Not found").into();
        assert!(matches!(err, CampusError::Api(_)));
        assert_eq!(err.to_string(), "Not found");
    }

    #[test]
    fn test_from_transport_error() {
        let err: CampusError = TransportError::InvalidUrl("::".into()).into();
        assert!(matches!(err, CampusError::Transport(_)));
        assert!(err.to_string().contains("::"));
    }

    #[test]
    fn test_from_session_error() {
        let err: CampusError =
            SessionError::LoginFailed(ApiError::new(401, "Invalid credentials")).into();
        assert!(matches!(err, CampusError::Session(_)));
        assert_eq!(err.user_message(), "Invalid credentials");
    }

    #[test]
    fn test_from_lifecycle_error() {
        let err: CampusError = LifecycleError::ShutDown.into();
        assert!(matches!(err, CampusError::Lifecycle(_)));
    }
}
