//! Error types for token handling.

use thiserror::Error;

/// Configuration and token creation errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No verification algorithm was configured.
    #[error("at least one algorithm is required")]
    NoAlgorithms,

    /// An algorithm name was not recognised.
    #[error("unknown algorithm: {0}")]
    UnknownAlgorithm(String),

    /// The algorithm is not an HMAC algorithm.
    #[error("unsupported algorithm for a shared secret: {0}")]
    UnsupportedAlgorithm(String),

    /// Claims could not be encoded or signed.
    #[error("token encoding failed: {0}")]
    Encoding(#[from] jsonwebtoken::errors::Error),
}

/// Why a bearer token was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum VerifyError {
    /// The `exp` claim is in the past.
    #[error("token expired")]
    Expired,

    /// Bad signature, algorithm, format or claims.
    #[error("invalid token: {0}")]
    Invalid(String),
}

impl From<jsonwebtoken::errors::Error> for VerifyError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            jsonwebtoken::errors::ErrorKind::ExpiredSignature => Self::Expired,
            _ => Self::Invalid(err.to_string()),
        }
    }
}

/// Result type alias for token operations.
pub type Result<T> = std::result::Result<T, AuthError>;
