//! Bearer token middleware.

use std::sync::Arc;

use pathium::{
    BoxEndpoint, BoxFuture, Endpoint, Failure, HttpError, Middleware, ReceiveFn, Scope, SendFn,
};
use tracing::debug;

use crate::error::VerifyError;
use crate::token::{HmacVerifier, TokenVerifier};

/// Scope state key holding the verified claims.
pub const USER_STATE_KEY: &str = "user";

const BEARER: &str = "bearer ";

/// Middleware that requires a valid `Authorization: Bearer <token>` header.
///
/// Verified claims are stored in the scope state under [`USER_STATE_KEY`]
/// and are visible to handlers through `Request::state`. Exempt paths are
/// compared exactly; non-HTTP exchanges are never checked.
///
/// ```ignore
/// app.use_middleware(JwtAuth::hmac("secret").exempt(&["/login", "/health"]));
/// ```
#[derive(Clone)]
pub struct JwtAuth {
    verifier: Arc<dyn TokenVerifier>,
    exempt_paths: Vec<String>,
}

impl JwtAuth {
    /// Uses a custom verifier.
    pub fn new(verifier: impl TokenVerifier + 'static) -> Self {
        Self {
            verifier: Arc::new(verifier),
            exempt_paths: Vec::new(),
        }
    }

    /// Verifies HS256 tokens signed with `secret`.
    pub fn hmac(secret: &str) -> Self {
        Self::new(HmacVerifier::hs256(secret))
    }

    /// Paths that bypass authentication.
    #[must_use]
    pub fn exempt(mut self, paths: &[&str]) -> Self {
        self.exempt_paths = paths.iter().map(|p| (*p).to_string()).collect();
        self
    }

    fn is_exempt(&self, path: &str) -> bool {
        self.exempt_paths.iter().any(|p| p == path)
    }

    /// Checks the exchange and returns the verified claims.
    fn authenticate(&self, scope: &Scope) -> Result<serde_json::Value, HttpError> {
        let header = scope.header_value("authorization").unwrap_or_default();
        let token = match header.get(..BEARER.len()) {
            Some(scheme) if scheme.eq_ignore_ascii_case(BEARER) => header[BEARER.len()..].trim_start(),
            _ => {
                return Err(HttpError::unauthorized(
                    "Missing or invalid Authorization header",
                ))
            }
        };

        self.verifier.verify(token).map_err(|err| {
            debug!(path = %scope.path, error = %err, "bearer token rejected");
            match err {
                VerifyError::Expired => HttpError::unauthorized("Token expired"),
                VerifyError::Invalid(_) => HttpError::unauthorized("Invalid token"),
            }
        })
    }
}

impl std::fmt::Debug for JwtAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtAuth")
            .field("exempt_paths", &self.exempt_paths)
            .finish_non_exhaustive()
    }
}

impl Middleware for JwtAuth {
    fn wrap(&self, next: BoxEndpoint) -> BoxEndpoint {
        Arc::new(JwtEndpoint {
            auth: self.clone(),
            next,
        })
    }
}

struct JwtEndpoint {
    auth: JwtAuth,
    next: BoxEndpoint,
}

impl Endpoint for JwtEndpoint {
    fn call<'a>(
        &'a self,
        mut scope: Scope,
        receive: ReceiveFn,
        send: SendFn,
    ) -> BoxFuture<'a, Result<(), Failure>> {
        if !scope.is_http() || self.auth.is_exempt(&scope.path) {
            return self.next.call(scope, receive, send);
        }

        match self.auth.authenticate(&scope) {
            Ok(claims) => {
                scope.state.insert(USER_STATE_KEY.to_string(), claims);
                self.next.call(scope, receive, send)
            }
            Err(err) => Box::pin(async move { Err(Failure::from(err)) }),
        }
    }
}
