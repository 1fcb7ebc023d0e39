//! Error taxonomy for the gateway layer.
//!
//! Every failure that crosses the gateway boundary becomes an [`ApiError`].
//! Callers never see transport-specific errors: a refused connection, a
//! DNS failure and a reset stream all arrive as `status == 0`.
//!
//! ```text
//! status 0          → ErrorKind::Network      (transport never got an answer)
//! status 401 / 403  → ErrorKind::AuthExpired  (credentials rejected)
//! status 400..=499  → ErrorKind::Client       (caller's fault, never retried)
//! anything else     → ErrorKind::Server
//! ```

use std::fmt;

use serde_json::Value;

/// Coarse classification of an [`ApiError`].
///
/// `AuthExpired` is a refinement of `Client`: both mean "the request was
/// wrong", but an auth failure during an authenticated operation also
/// means the session is no longer usable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The request never produced an HTTP response.
    Network,
    /// 4xx other than 401/403.
    Client,
    /// 401 or 403.
    AuthExpired,
    /// 5xx, or any other unsuccessful status.
    Server,
}

impl ErrorKind {
    /// Classifies an HTTP status code.
    pub fn of_status(status: u16) -> Self {
        match status {
            0 => Self::Network,
            401 | 403 => Self::AuthExpired,
            400..=499 => Self::Client,
            _ => Self::Server,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network => write!(f, "network"),
            Self::Client => write!(f, "client"),
            Self::AuthExpired => write!(f, "auth-expired"),
            Self::Server => write!(f, "server"),
        }
    }
}

/// A failed API call.
///
/// Carries the HTTP status plus whatever structure the backend put in its
/// error body (`code`, the offending `field` for validation errors, and
/// free-form `details`).
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub message: String,
    pub status: u16,
    pub code: Option<String>,
    pub field: Option<String>,
    pub details: Option<serde_json::Value>,
}

/// Code attached to successful responses whose body could not be decoded.
pub const DECODE_ERROR: &str = "DECODE_ERROR";

/// Code attached to requests whose body could not be serialized. Nothing
/// was sent.
pub const ENCODE_ERROR: &str = "ENCODE_ERROR";

impl ApiError {
    /// Creates an error with only a status and message.
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            status,
            code: None,
            field: None,
            details: None,
        }
    }

    /// A transport-level failure (`status == 0`).
    pub fn network(cause: impl fmt::Display) -> Self {
        Self::new(0, cause.to_string())
    }

    /// A successful response whose payload didn't match the expected shape.
    pub fn decode(status: u16, cause: impl fmt::Display) -> Self {
        Self::new(status, format!("invalid response body: {cause}"))
            .with_code(DECODE_ERROR)
    }

    /// A request body that failed to serialize. Carries status 0 because
    /// no request went out, and [`ENCODE_ERROR`] so it isn't mistaken for a
    /// flaky network.
    pub fn encode(cause: impl fmt::Display) -> Self {
        Self::new(0, format!("invalid request body: {cause}")).with_code(ENCODE_ERROR)
    }

    /// Builds an error from an unsuccessful JSON response.
    ///
    /// Uses `message`/`code`/`field`/`details` from the body when present and
    /// falls back to `HTTP {status}: {status_text}` for the message. Members
    /// are read one by one, so a malformed `code` doesn't cost the message.
    pub fn from_body(status: u16, status_text: &str, body: &Value) -> Self {
        Self {
            message: body_text(body, "message")
                .unwrap_or_else(|| status_message(status, status_text)),
            status,
            code: body_text(body, "code"),
            field: body_text(body, "field"),
            details: body.get("details").filter(|d| !d.is_null()).cloned(),
        }
    }

    /// Builds an error from an unsuccessful non-JSON response.
    pub fn from_status(status: u16, status_text: &str) -> Self {
        Self::new(status, status_message(status, status_text))
    }

    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::of_status(self.status)
    }

    pub fn is_network(&self) -> bool {
        self.status == 0
    }

    /// True for every 4xx, including 401/403.
    pub fn is_client_error(&self) -> bool {
        (400..=499).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        (500..=599).contains(&self.status)
    }

    pub fn is_auth_expired(&self) -> bool {
        self.kind() == ErrorKind::AuthExpired
    }

    /// Whether trying again could give a different answer: not for client
    /// errors, and not for bodies this side failed to encode or decode.
    pub fn is_retryable(&self) -> bool {
        !self.is_client_error()
            && !matches!(self.code.as_deref(), Some(ENCODE_ERROR | DECODE_ERROR))
    }
}

fn status_message(status: u16, status_text: &str) -> String {
    format!("HTTP {status}: {status_text}")
}

/// A scalar member of the `{ message, code?, field?, details? }` error
/// body as text. Numbers and booleans are accepted; anything else counts as
/// absent.
fn body_text(body: &Value, key: &str) -> Option<String> {
    match body.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

/// Errors raised by a [`Transport`](crate::Transport) implementation.
///
/// These never leave the gateway; [`RequestGateway`](crate::RequestGateway)
/// turns them into `ApiError { status: 0 }`.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The target URL could not be resolved into something sendable.
    #[error("invalid url {0}")]
    InvalidUrl(String),

    /// Connecting, sending or reading the response failed.
    #[error("request failed: {0}")]
    Failed(String),
}
