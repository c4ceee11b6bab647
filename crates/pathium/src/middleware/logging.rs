//! Request logging.

use std::sync::Arc;

use tracing::info;

use super::Middleware;
use crate::error::Failure;
use crate::transport::{BoxEndpoint, BoxFuture, Endpoint, ReceiveFn, Scope, SendFn};

/// Destination for access log lines.
pub trait LogSink: Send + Sync {
    fn log(&self, line: &str);
}

impl<F> LogSink for F
where
    F: Fn(&str) + Send + Sync,
{
    fn log(&self, line: &str) {
        self(line);
    }
}

/// Sink that emits lines as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn log(&self, line: &str) {
        info!(target: "pathium::access", "{line}");
    }
}

/// Middleware that logs `METHOD PATH` for every HTTP request before
/// delegating.
#[derive(Clone)]
pub struct RequestLogger {
    sink: Arc<dyn LogSink>,
}

impl RequestLogger {
    /// Logs through `tracing`.
    pub fn new() -> Self {
        Self::with_sink(TracingSink)
    }

    /// Logs through a custom sink.
    pub fn with_sink(sink: impl LogSink + 'static) -> Self {
        Self {
            sink: Arc::new(sink),
        }
    }
}

impl Default for RequestLogger {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for RequestLogger {
    fn wrap(&self, next: BoxEndpoint) -> BoxEndpoint {
        Arc::new(LoggerEndpoint {
            sink: Arc::clone(&self.sink),
            next,
        })
    }
}

struct LoggerEndpoint {
    sink: Arc<dyn LogSink>,
    next: BoxEndpoint,
}

impl Endpoint for LoggerEndpoint {
    fn call<'a>(
        &'a self,
        scope: Scope,
        receive: ReceiveFn,
        send: SendFn,
    ) -> BoxFuture<'a, Result<(), Failure>> {
        if scope.is_http() {
            self.sink
                .log(&format!("{} {}", scope.method_upper(), scope.path));
        }
        self.next.call(scope, receive, send)
    }
}
