//! Common security response headers.

use std::sync::Arc;

use super::{rewrite_start, set_header, Middleware};
use crate::error::Failure;
use crate::transport::{BoxEndpoint, BoxFuture, Endpoint, ReceiveFn, Scope, SendFn};

/// Middleware that adds security headers to every HTTP response.
///
/// `X-Frame-Options`, `X-Content-Type-Options: nosniff` and
/// `Referrer-Policy: no-referrer` are always set. `Strict-Transport-Security`
/// is set only when `hsts_max_age` is configured.
#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    pub hsts_max_age: Option<u64>,
    pub include_subdomains: bool,
    pub frame_options: String,
}

impl Default for SecurityHeaders {
    fn default() -> Self {
        Self {
            hsts_max_age: Some(63_072_000),
            include_subdomains: true,
            frame_options: "DENY".to_string(),
        }
    }
}

impl SecurityHeaders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the HSTS max-age; `None` omits the header.
    #[must_use]
    pub fn hsts(mut self, max_age: Option<u64>) -> Self {
        self.hsts_max_age = max_age;
        self
    }

    #[must_use]
    pub fn include_subdomains(mut self, include: bool) -> Self {
        self.include_subdomains = include;
        self
    }

    #[must_use]
    pub fn frame_options(mut self, value: impl Into<String>) -> Self {
        self.frame_options = value.into();
        self
    }

    fn hsts_value(&self) -> Option<String> {
        self.hsts_max_age.map(|age| {
            if self.include_subdomains {
                format!("max-age={age}; includeSubDomains")
            } else {
                format!("max-age={age}")
            }
        })
    }
}

impl Middleware for SecurityHeaders {
    fn wrap(&self, next: BoxEndpoint) -> BoxEndpoint {
        Arc::new(SecurityEndpoint {
            hsts: self.hsts_value(),
            frame_options: self.frame_options.clone(),
            next,
        })
    }
}

struct SecurityEndpoint {
    hsts: Option<String>,
    frame_options: String,
    next: BoxEndpoint,
}

impl Endpoint for SecurityEndpoint {
    fn call<'a>(
        &'a self,
        scope: Scope,
        receive: ReceiveFn,
        send: SendFn,
    ) -> BoxFuture<'a, Result<(), Failure>> {
        if !scope.is_http() {
            return self.next.call(scope, receive, send);
        }

        let hsts = self.hsts.clone();
        let frame_options = self.frame_options.clone();
        let send = rewrite_start(send, move |raw| {
            if let Some(hsts) = &hsts {
                set_header(raw, "Strict-Transport-Security", hsts);
            }
            set_header(raw, "X-Frame-Options", &frame_options);
            set_header(raw, "X-Content-Type-Options", "nosniff");
            set_header(raw, "Referrer-Policy", "no-referrer");
        });
        self.next.call(scope, receive, send)
    }
}
