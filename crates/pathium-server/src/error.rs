//! Error types for the host adapter.

use thiserror::Error;

/// Server errors.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Binding or accepting on the listener failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The application could not be built.
    #[error("route error: {0}")]
    Route(#[from] pathium::RouteError),

    /// Token configuration failed.
    #[error("auth error: {0}")]
    Auth(#[from] pathium_auth::AuthError),
}

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
