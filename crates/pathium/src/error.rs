//! Error types for routing and dispatch.

use thiserror::Error;

/// Errors raised while registering routes.
///
/// These are configuration mistakes and surface at registration time, before
/// the application serves a single request.
#[derive(Debug, Error)]
pub enum RouteError {
    /// A `{` without a closing `}`.
    #[error("unmatched `{{` in route path: {pattern}")]
    UnmatchedBrace { pattern: String },

    /// The same parameter name appears twice in one template.
    #[error("duplicate parameter `{name}` in route path: {pattern}")]
    DuplicateParam { name: String, pattern: String },

    /// A placeholder with no name, e.g. `{}` or `{:int}`.
    #[error("empty parameter name in route path: {pattern}")]
    EmptyParam { pattern: String },

    /// The generated matcher was rejected by the regex engine.
    #[error("invalid path pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Result type alias for route registration.
pub type Result<T> = std::result::Result<T, RouteError>;

/// An HTTP error raised by a handler or middleware.
///
/// Converted into a JSON body `{"detail": ...}` carrying `status` by the
/// nearest enclosing boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{detail}")]
pub struct HttpError {
    /// HTTP status code.
    pub status: u16,
    /// Human readable detail.
    pub detail: String,
}

impl HttpError {
    /// Creates an error with an explicit detail message.
    ///
    /// An empty detail falls back to `HTTP {status}`.
    pub fn new(status: u16, detail: impl Into<String>) -> Self {
        let detail = detail.into();
        let detail = if detail.is_empty() {
            format!("HTTP {status}")
        } else {
            detail
        };
        Self { status, detail }
    }

    /// Creates an error with the default `HTTP {status}` detail.
    pub fn status(status: u16) -> Self {
        Self::new(status, "")
    }

    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(400, detail)
    }

    pub fn unauthorized(detail: impl Into<String>) -> Self {
        Self::new(401, detail)
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::new(403, detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(404, detail)
    }

    pub fn unprocessable(detail: impl Into<String>) -> Self {
        Self::new(422, detail)
    }

    pub fn too_many_requests() -> Self {
        Self::new(429, "Too Many Requests")
    }
}

/// A failure during request dispatch.
///
/// Only [`Failure::Http`] reaches the client with its own status and
/// detail. Every other variant is reported as an opaque 500.
#[derive(Debug, Error)]
pub enum Failure {
    /// An explicit HTTP error.
    #[error(transparent)]
    Http(#[from] HttpError),

    /// A JSON body or value failed to (de)serialize.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The handler panicked.
    #[error("handler panicked: {0}")]
    Panic(String),

    /// The host transport rejected an event.
    #[error("transport error: {0}")]
    Transport(String),

    /// Any other error.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl Failure {
    /// Wraps an arbitrary error as an unexpected failure.
    pub fn other(err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Other(err.into())
    }

    /// Returns the status this failure maps to.
    pub fn status(&self) -> u16 {
        match self {
            Self::Http(e) => e.status,
            _ => 500,
        }
    }

    /// Returns the detail shown to the client.
    pub fn detail(&self) -> &str {
        match self {
            Self::Http(e) => &e.detail,
            _ => "Internal Server Error",
        }
    }

    /// Returns the HTTP error if this failure carries one.
    pub fn as_http(&self) -> Option<&HttpError> {
        match self {
            Self::Http(e) => Some(e),
            _ => None,
        }
    }
}
