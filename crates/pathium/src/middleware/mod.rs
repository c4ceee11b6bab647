//! Middleware support for request/response processing.
//!
//! A middleware wraps the next endpoint and returns a new endpoint. The
//! application wraps its dispatch function with the registered middleware in
//! reverse order, so the first registered middleware is the outermost layer:
//! it sees the request first and the outgoing response last.
//!
//! Middleware can:
//! - Inspect or amend the scope before delegating
//! - Short-circuit by failing with an [`HttpError`](crate::HttpError)
//! - Rewrite outgoing events by wrapping the send capability
//!
//! # Example
//!
//! ```ignore
//! use pathium::{BoxEndpoint, Endpoint, Middleware};
//!
//! let tag = |next: BoxEndpoint| -> BoxEndpoint {
//!     Arc::new(move |scope, receive, send| {
//!         let next = Arc::clone(&next);
//!         async move { next.call(scope, receive, send).await }
//!     })
//! };
//! app.use_middleware(tag);
//! ```

mod cors;
mod errors;
mod logging;
mod rate_limit;
mod security;

use std::sync::Arc;

pub use cors::Cors;
pub use errors::CatchErrors;
pub use logging::{LogSink, RequestLogger, TracingSink};
pub use rate_limit::RateLimit;
pub use security::SecurityHeaders;

use crate::transport::{BoxEndpoint, Outbound, RawHeaders, SendFn};

/// Trait for middleware wrapping an endpoint.
pub trait Middleware: Send + Sync {
    /// Returns `next` wrapped with this middleware's behavior.
    fn wrap(&self, next: BoxEndpoint) -> BoxEndpoint;
}

impl<F> Middleware for F
where
    F: Fn(BoxEndpoint) -> BoxEndpoint + Send + Sync,
{
    fn wrap(&self, next: BoxEndpoint) -> BoxEndpoint {
        self(next)
    }
}

/// Wraps `send` so every start event has its headers rewritten by `edit`.
/// Body events pass through untouched.
pub fn rewrite_start<F>(send: SendFn, edit: F) -> SendFn
where
    F: Fn(&mut RawHeaders) + Send + Sync + 'static,
{
    Arc::new(move |event| {
        let event = match event {
            Outbound::Start {
                status,
                mut headers,
            } => {
                edit(&mut headers);
                Outbound::Start { status, headers }
            }
            body => body,
        };
        send(event)
    })
}

/// Sets a header, replacing any existing header with the same name
/// (compared case-insensitively).
pub fn set_header(headers: &mut RawHeaders, name: &str, value: &str) {
    headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name.as_bytes()));
    headers.push((name.as_bytes().to_vec(), value.as_bytes().to_vec()));
}
