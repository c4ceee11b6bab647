//! In-memory fixed-window rate limiting.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;

use super::Middleware;
use crate::error::{Failure, HttpError};
use crate::transport::{BoxEndpoint, BoxFuture, Endpoint, ReceiveFn, Scope, SendFn};

/// Bucket shared by every client without a known address.
const ANONYMOUS: &str = "anon";

#[derive(Debug, Clone, Copy)]
struct Window {
    start: Instant,
    count: u32,
}

/// Fixed-window rate limiter keyed by client IP.
///
/// Counters live in process memory for the lifetime of this value and are
/// shared by every endpoint it wraps. Requests over the limit fail with
/// `429 Too Many Requests`.
#[derive(Debug, Clone)]
pub struct RateLimit {
    requests: u32,
    window: Duration,
    store: Arc<Mutex<HashMap<String, Window>>>,
}

impl Default for RateLimit {
    fn default() -> Self {
        Self::new(10, Duration::from_secs(60))
    }
}

impl RateLimit {
    /// Allows `requests` per client in each `window`.
    pub fn new(requests: u32, window: Duration) -> Self {
        Self {
            requests,
            window,
            store: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Counts one request for `key`.
    ///
    /// # Errors
    ///
    /// Fails with 429 once the key is over its limit for the current window.
    pub fn check(&self, key: &str) -> Result<(), HttpError> {
        let now = Instant::now();
        let mut store = self.store.lock().unwrap_or_else(PoisonError::into_inner);

        let window = store.entry(key.to_string()).or_insert(Window {
            start: now,
            count: 0,
        });
        if now.duration_since(window.start) >= self.window {
            window.start = now;
            window.count = 0;
        }
        window.count = window.count.saturating_add(1);

        if window.count > self.requests {
            debug!(client = key, count = window.count, "rate limit exceeded");
            return Err(HttpError::too_many_requests());
        }
        Ok(())
    }

    fn key(scope: &Scope) -> String {
        scope
            .client
            .map_or_else(|| ANONYMOUS.to_string(), |addr| addr.ip().to_string())
    }
}

impl Middleware for RateLimit {
    fn wrap(&self, next: BoxEndpoint) -> BoxEndpoint {
        Arc::new(RateLimitEndpoint {
            limit: self.clone(),
            next,
        })
    }
}

struct RateLimitEndpoint {
    limit: RateLimit,
    next: BoxEndpoint,
}

impl Endpoint for RateLimitEndpoint {
    fn call<'a>(
        &'a self,
        scope: Scope,
        receive: ReceiveFn,
        send: SendFn,
    ) -> BoxFuture<'a, Result<(), Failure>> {
        if scope.is_http() {
            if let Err(err) = self.limit.check(&RateLimit::key(&scope)) {
                return Box::pin(async move { Err(Failure::from(err)) });
            }
        }
        self.next.call(scope, receive, send)
    }
}
