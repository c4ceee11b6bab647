//! The boundary between pathium and the host transport.
//!
//! A host delivers one [`Scope`] per exchange together with a [`ReceiveFn`]
//! capability for the request body, and accepts outbound events through a
//! [`SendFn`] capability. Everything above this module speaks only in these
//! terms; sockets and HTTP parsing belong to the host.

use std::collections::HashMap;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::Failure;

/// A boxed future for async endpoints and capabilities.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Raw header pairs as delivered by or handed to the transport.
pub type RawHeaders = Vec<(Vec<u8>, Vec<u8>)>;

/// The protocol of an inbound exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScopeKind {
    /// A regular HTTP request.
    Http,
    /// A WebSocket handshake.
    WebSocket,
    /// Host lifecycle events (startup/shutdown).
    Lifespan,
}

/// Metadata describing one inbound exchange.
#[derive(Debug, Clone)]
pub struct Scope {
    /// Protocol of the exchange.
    pub kind: ScopeKind,
    /// Request method as sent by the client.
    pub method: String,
    /// Request path, without the query string.
    pub path: String,
    /// Header pairs in the order received.
    pub headers: RawHeaders,
    /// Raw query string, without the leading `?`.
    pub query_string: Vec<u8>,
    /// Peer address, when the host knows it.
    pub client: Option<SocketAddr>,
    /// Per-request state shared between middleware and handlers.
    pub state: HashMap<String, serde_json::Value>,
}

impl Scope {
    /// Creates an HTTP scope.
    pub fn http(method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            kind: ScopeKind::Http,
            method: method.into(),
            path: path.into(),
            headers: Vec::new(),
            query_string: Vec::new(),
            client: None,
            state: HashMap::new(),
        }
    }

    /// Creates a lifespan scope.
    pub fn lifespan() -> Self {
        Self {
            kind: ScopeKind::Lifespan,
            ..Self::http("", "")
        }
    }

    /// Appends a header.
    #[must_use]
    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .push((name.as_bytes().to_vec(), value.as_bytes().to_vec()));
        self
    }

    /// Sets the raw query string.
    #[must_use]
    pub fn query(mut self, query: &str) -> Self {
        self.query_string = query.as_bytes().to_vec();
        self
    }

    /// Sets the peer address.
    #[must_use]
    pub fn client(mut self, addr: SocketAddr) -> Self {
        self.client = Some(addr);
        self
    }

    /// Returns whether this is an HTTP exchange.
    pub fn is_http(&self) -> bool {
        self.kind == ScopeKind::Http
    }

    /// Returns the upper-cased method.
    pub fn method_upper(&self) -> String {
        self.method.to_uppercase()
    }

    /// Returns the last value of a header, matched case-insensitively.
    pub fn header_value(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .rev()
            .find(|(k, _)| k.eq_ignore_ascii_case(name.as_bytes()))
            .map(|(_, v)| String::from_utf8_lossy(v).into_owned())
    }
}

/// An event delivered by the transport's receive capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A chunk of the request body.
    Body { body: Vec<u8>, more_body: bool },
    /// The client went away.
    Disconnect,
}

/// An event handed to the transport's send capability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outbound {
    /// Status line and headers.
    Start { status: u16, headers: RawHeaders },
    /// The complete response body.
    Body { body: Vec<u8> },
}

/// Capability yielding inbound body events.
pub type ReceiveFn = Arc<dyn Fn() -> BoxFuture<'static, Inbound> + Send + Sync>;

/// Capability accepting outbound response events.
pub type SendFn =
    Arc<dyn Fn(Outbound) -> BoxFuture<'static, Result<(), Failure>> + Send + Sync>;

/// Anything that can handle a raw exchange.
///
/// The application itself, every middleware layer and the innermost dispatch
/// function are endpoints. Closures of the right shape implement it too:
///
/// ```ignore
/// let hello = |_scope: Scope, _receive: ReceiveFn, send: SendFn| async move {
///     send(Outbound::Start { status: 200, headers: Vec::new() }).await?;
///     send(Outbound::Body { body: b"hello".to_vec() }).await
/// };
/// ```
pub trait Endpoint: Send + Sync {
    /// Handles one exchange.
    fn call<'a>(
        &'a self,
        scope: Scope,
        receive: ReceiveFn,
        send: SendFn,
    ) -> BoxFuture<'a, Result<(), Failure>>;
}

/// A shared, type-erased endpoint.
pub type BoxEndpoint = Arc<dyn Endpoint>;

impl<F, Fut> Endpoint for F
where
    F: Fn(Scope, ReceiveFn, SendFn) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), Failure>> + Send + 'static,
{
    fn call<'a>(
        &'a self,
        scope: Scope,
        receive: ReceiveFn,
        send: SendFn,
    ) -> BoxFuture<'a, Result<(), Failure>> {
        Box::pin(self(scope, receive, send))
    }
}

/// Builds a receive capability that yields `events` in order, then
/// [`Inbound::Disconnect`] forever.
pub fn receive_from(events: Vec<Inbound>) -> ReceiveFn {
    let queue = Arc::new(std::sync::Mutex::new(std::collections::VecDeque::from(
        events,
    )));
    Arc::new(move || {
        let next = queue
            .lock()
            .ok()
            .and_then(|mut q| q.pop_front())
            .unwrap_or(Inbound::Disconnect);
        Box::pin(async move { next })
    })
}

/// Builds a receive capability for a body delivered in one chunk.
pub fn receive_body(body: impl Into<Vec<u8>>) -> ReceiveFn {
    receive_from(vec![Inbound::Body {
        body: body.into(),
        more_body: false,
    }])
}

/// Emits `status`, `headers` and `body` as a start/body event pair.
pub async fn emit(
    send: &SendFn,
    status: u16,
    headers: RawHeaders,
    body: Vec<u8>,
) -> Result<(), Failure> {
    send(Outbound::Start { status, headers }).await?;
    send(Outbound::Body { body }).await
}

/// Wraps `send`, returning a flag that is set once a start event has gone
/// through it.
///
/// Error boundaries check the flag: after a start event they must not emit a
/// second response.
pub fn track_start(send: SendFn) -> (SendFn, Arc<AtomicBool>) {
    let started = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&started);
    let tracked: SendFn = Arc::new(move |event| {
        if matches!(event, Outbound::Start { .. }) {
            flag.store(true, Ordering::Release);
        }
        send(event)
    });
    (tracked, started)
}

/// Sends a JSON `{"detail": ...}` error for `failure`.
pub async fn emit_failure(send: &SendFn, failure: &Failure) -> Result<(), Failure> {
    let body = serde_json::json!({ "detail": failure.detail() }).to_string();
    emit(
        send,
        failure.status(),
        vec![(
            b"content-type".to_vec(),
            crate::response::JSON_MEDIA_TYPE.as_bytes().to_vec(),
        )],
        body.into_bytes(),
    )
    .await
}

/// An in-memory send capability that records every outbound event.
///
/// Useful for driving an application without a network host.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    events: Arc<std::sync::Mutex<Vec<Outbound>>>,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a send capability appending to this recorder.
    pub fn send(&self) -> SendFn {
        let events = Arc::clone(&self.events);
        Arc::new(move |event| {
            if let Ok(mut events) = events.lock() {
                events.push(event);
            }
            Box::pin(async { Ok(()) })
        })
    }

    /// Returns every recorded event, in order.
    pub fn events(&self) -> Vec<Outbound> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Returns the status of the first start event.
    pub fn status(&self) -> Option<u16> {
        self.events().into_iter().find_map(|event| match event {
            Outbound::Start { status, .. } => Some(status),
            Outbound::Body { .. } => None,
        })
    }

    /// Returns the headers of the first start event, decoded.
    pub fn headers(&self) -> Vec<(String, String)> {
        self.events()
            .into_iter()
            .find_map(|event| match event {
                Outbound::Start { headers, .. } => Some(headers),
                Outbound::Body { .. } => None,
            })
            .unwrap_or_default()
            .into_iter()
            .map(|(k, v)| {
                (
                    String::from_utf8_lossy(&k).into_owned(),
                    String::from_utf8_lossy(&v).into_owned(),
                )
            })
            .collect()
    }

    /// Returns a header of the first start event, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers()
            .into_iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v)
    }

    /// Returns the concatenated body events.
    pub fn body(&self) -> Vec<u8> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Outbound::Body { body } => Some(body),
                Outbound::Start { .. } => None,
            })
            .flatten()
            .collect()
    }

    /// Returns the body parsed as JSON, or `Null` if it is not JSON.
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body()).unwrap_or(serde_json::Value::Null)
    }
}
