//! Cross-origin resource sharing headers.

use std::sync::Arc;

use super::{rewrite_start, set_header, Middleware};
use crate::error::Failure;
use crate::transport::{BoxEndpoint, BoxFuture, Endpoint, ReceiveFn, Scope, SendFn};

const DEFAULT_METHODS: [&str; 6] = ["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"];

/// Middleware that adds CORS headers to every HTTP response.
///
/// Only the outgoing start event is touched; the request passes through
/// unchanged.
#[derive(Debug, Clone)]
pub struct Cors {
    /// Allowed origins; `None` allows any origin.
    pub allow_origins: Option<Vec<String>>,
    /// Methods listed in `Access-Control-Allow-Methods`.
    pub allow_methods: Vec<String>,
    /// Headers listed in `Access-Control-Allow-Headers`, if any.
    pub allow_headers: Vec<String>,
    /// Whether to send `Access-Control-Allow-Credentials: true`.
    pub allow_credentials: bool,
}

impl Default for Cors {
    fn default() -> Self {
        Self::permissive()
    }
}

impl Cors {
    /// Creates CORS middleware that allows all origins.
    pub fn permissive() -> Self {
        Self {
            allow_origins: None,
            allow_methods: DEFAULT_METHODS.iter().map(|m| (*m).to_string()).collect(),
            allow_headers: Vec::new(),
            allow_credentials: false,
        }
    }

    /// Creates CORS middleware with specific origins.
    pub fn new(origins: &[&str]) -> Self {
        Self {
            allow_origins: Some(origins.iter().map(|s| (*s).to_string()).collect()),
            ..Self::permissive()
        }
    }

    /// Sets the allowed methods.
    #[must_use]
    pub fn methods(mut self, methods: &[&str]) -> Self {
        self.allow_methods = methods.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Sets the allowed request headers.
    #[must_use]
    pub fn headers(mut self, headers: &[&str]) -> Self {
        self.allow_headers = headers.iter().map(|s| (*s).to_string()).collect();
        self
    }

    /// Enables `Access-Control-Allow-Credentials`.
    #[must_use]
    pub fn credentials(mut self, allow: bool) -> Self {
        self.allow_credentials = allow;
        self
    }

    /// Computes `Access-Control-Allow-Origin` for a request origin.
    fn allow_origin(&self, origin: Option<&str>) -> Option<String> {
        match (origin, &self.allow_origins) {
            (Some(_), None) | (None, None) => Some("*".to_string()),
            (Some(origin), Some(list)) => {
                if list.iter().any(|o| o == origin || o == "*") {
                    if origin == "*" {
                        Some("*".to_string())
                    } else {
                        Some(origin.to_string())
                    }
                } else {
                    None
                }
            }
            (None, Some(_)) => None,
        }
    }
}

impl Middleware for Cors {
    fn wrap(&self, next: BoxEndpoint) -> BoxEndpoint {
        Arc::new(CorsEndpoint {
            cors: self.clone(),
            next,
        })
    }
}

struct CorsEndpoint {
    cors: Cors,
    next: BoxEndpoint,
}

impl Endpoint for CorsEndpoint {
    fn call<'a>(
        &'a self,
        scope: Scope,
        receive: ReceiveFn,
        send: SendFn,
    ) -> BoxFuture<'a, Result<(), Failure>> {
        if !scope.is_http() {
            return self.next.call(scope, receive, send);
        }

        let allow_origin = self
            .cors
            .allow_origin(scope.header_value("origin").as_deref());
        let methods = self.cors.allow_methods.join(", ");
        let headers = (!self.cors.allow_headers.is_empty()).then(|| self.cors.allow_headers.join(", "));
        let credentials = self.cors.allow_credentials;

        let send = rewrite_start(send, move |raw| {
            if let Some(origin) = &allow_origin {
                set_header(raw, "Access-Control-Allow-Origin", origin);
            }
            set_header(raw, "Access-Control-Allow-Methods", &methods);
            if let Some(headers) = &headers {
                set_header(raw, "Access-Control-Allow-Headers", headers);
            }
            if credentials {
                set_header(raw, "Access-Control-Allow-Credentials", "true");
            }
        });
        self.next.call(scope, receive, send)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{emit, receive_from, Recorder};

    fn ok_app() -> BoxEndpoint {
        Arc::new(|_scope: Scope, _receive: ReceiveFn, send: SendFn| async move {
            emit(&send, 200, Vec::new(), b"ok".to_vec()).await
        })
    }

    async fn run(cors: Cors, scope: Scope) -> Recorder {
        let recorder = Recorder::new();
        cors.wrap(ok_app())
            .call(scope, receive_from(Vec::new()), recorder.send())
            .await
            .unwrap();
        recorder
    }

    #[tokio::test]
    async fn test_permissive_adds_headers() {
        let scope = Scope::http("GET", "/").header("Origin", "https://example.com");
        let recorder = run(Cors::permissive(), scope).await;

        assert_eq!(
            recorder.header("Access-Control-Allow-Origin").as_deref(),
            Some("*")
        );
        assert_eq!(
            recorder.header("Access-Control-Allow-Methods").as_deref(),
            Some("GET, POST, PUT, PATCH, DELETE, OPTIONS")
        );
        assert!(recorder.header("Access-Control-Allow-Headers").is_none());
        assert!(recorder.header("Access-Control-Allow-Credentials").is_none());
        assert_eq!(recorder.body(), b"ok");
    }

    #[tokio::test]
    async fn test_listed_origin_is_echoed() {
        let cors = Cors::new(&["https://app.example"])
            .headers(&["Content-Type", "Authorization"])
            .credentials(true);
        let scope = Scope::http("GET", "/").header("origin", "https://app.example");
        let recorder = run(cors, scope).await;

        assert_eq!(
            recorder.header("Access-Control-Allow-Origin").as_deref(),
            Some("https://app.example")
        );
        assert_eq!(
            recorder.header("Access-Control-Allow-Headers").as_deref(),
            Some("Content-Type, Authorization")
        );
        assert_eq!(
            recorder.header("Access-Control-Allow-Credentials").as_deref(),
            Some("true")
        );
    }

    #[tokio::test]
    async fn test_unlisted_origin_gets_no_allow_origin() {
        let cors = Cors::new(&["https://app.example"]);
        let scope = Scope::http("GET", "/").header("origin", "https://evil.example");
        let recorder = run(cors, scope).await;

        assert!(recorder.header("Access-Control-Allow-Origin").is_none());
        assert!(recorder.header("Access-Control-Allow-Methods").is_some());
    }

    #[tokio::test]
    async fn test_wildcard_list_echoes_origin() {
        let scope = Scope::http("GET", "/").header("origin", "https://any.example");
        let recorder = run(Cors::new(&["*"]), scope).await;
        assert_eq!(
            recorder.header("Access-Control-Allow-Origin").as_deref(),
            Some("https://any.example")
        );
    }

    #[tokio::test]
    async fn test_missing_origin() {
        let recorder = run(Cors::permissive(), Scope::http("GET", "/")).await;
        assert_eq!(
            recorder.header("Access-Control-Allow-Origin").as_deref(),
            Some("*")
        );

        let recorder = run(Cors::new(&["https://app.example"]), Scope::http("GET", "/")).await;
        assert!(recorder.header("Access-Control-Allow-Origin").is_none());
    }

    #[tokio::test]
    async fn test_non_http_untouched() {
        let recorder = run(Cors::permissive(), Scope::lifespan()).await;
        assert!(recorder.headers().is_empty());
    }
}
