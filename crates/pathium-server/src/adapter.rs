//! Conversion between hyper messages and the pathium transport boundary.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use http_body_util::{BodyExt, Full};
use hyper::body::{Body, Bytes};
use hyper::header::{HeaderName, HeaderValue};
use hyper::StatusCode;
use pathium::{Endpoint, Failure, Inbound, Outbound, Pathium, RawHeaders, ReceiveFn, Scope, SendFn};
use tracing::{debug, warn};

/// Runs one hyper request through `app` and returns the collected response.
///
/// The application never sees hyper types: the request becomes a [`Scope`]
/// plus a receive capability streaming body frames, and the outbound events
/// are buffered into a single response. A response that never started is
/// reported as a bare 500.
pub async fn handle<B>(
    app: &Pathium,
    req: hyper::Request<B>,
    client: Option<SocketAddr>,
) -> hyper::Response<Full<Bytes>>
where
    B: Body<Data = Bytes> + Send + Unpin + 'static,
    B::Error: std::fmt::Display,
{
    let (parts, body) = req.into_parts();

    let mut scope = Scope::http(parts.method.as_str(), parts.uri.path());
    scope.query_string = parts.uri.query().unwrap_or_default().as_bytes().to_vec();
    scope.headers = parts
        .headers
        .iter()
        .map(|(name, value)| (name.as_str().as_bytes().to_vec(), value.as_bytes().to_vec()))
        .collect();
    scope.client = client;

    let collected = Arc::new(Mutex::new(Collected::default()));
    if let Err(err) = app
        .call(scope, receive_fn(body), send_fn(Arc::clone(&collected)))
        .await
    {
        warn!(error = %err, "exchange failed");
    }

    let collected = std::mem::take(&mut *collected.lock().unwrap_or_else(PoisonError::into_inner));
    collected.into_response()
}

struct BodyReader<B> {
    body: B,
    finished: bool,
}

impl<B> BodyReader<B>
where
    B: Body<Data = Bytes> + Unpin,
    B::Error: std::fmt::Display,
{
    async fn next_event(&mut self) -> Inbound {
        if self.finished {
            return Inbound::Disconnect;
        }
        loop {
            match self.body.frame().await {
                Some(Ok(frame)) => {
                    // Trailers are dropped.
                    if let Ok(data) = frame.into_data() {
                        let more_body = !self.body.is_end_stream();
                        self.finished = !more_body;
                        return Inbound::Body {
                            body: data.to_vec(),
                            more_body,
                        };
                    }
                }
                Some(Err(err)) => {
                    debug!(error = %err, "request body aborted");
                    self.finished = true;
                    return Inbound::Disconnect;
                }
                None => {
                    self.finished = true;
                    return Inbound::Body {
                        body: Vec::new(),
                        more_body: false,
                    };
                }
            }
        }
    }
}

fn receive_fn<B>(body: B) -> ReceiveFn
where
    B: Body<Data = Bytes> + Send + Unpin + 'static,
    B::Error: std::fmt::Display,
{
    let reader = Arc::new(tokio::sync::Mutex::new(BodyReader {
        body,
        finished: false,
    }));
    Arc::new(move || {
        let reader = Arc::clone(&reader);
        Box::pin(async move { reader.lock().await.next_event().await })
    })
}

#[derive(Debug, Default)]
struct Collected {
    status: Option<u16>,
    headers: RawHeaders,
    body: Vec<u8>,
}

impl Collected {
    fn push(&mut self, event: Outbound) -> Result<(), Failure> {
        match event {
            Outbound::Start { status, headers } => {
                if self.status.is_some() {
                    return Err(Failure::Transport("response already started".to_string()));
                }
                self.status = Some(status);
                self.headers = headers;
            }
            Outbound::Body { body } => {
                if self.status.is_none() {
                    return Err(Failure::Transport("body sent before start".to_string()));
                }
                self.body.extend_from_slice(&body);
            }
        }
        Ok(())
    }

    fn into_response(self) -> hyper::Response<Full<Bytes>> {
        let Some(status) = self.status else {
            let mut response = hyper::Response::new(Full::new(Bytes::from_static(
                b"Internal Server Error",
            )));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            return response;
        };

        let mut response = hyper::Response::new(Full::new(Bytes::from(self.body)));
        *response.status_mut() =
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        for (name, value) in self.headers {
            match (HeaderName::from_bytes(&name), HeaderValue::from_bytes(&value)) {
                (Ok(name), Ok(value)) => {
                    response.headers_mut().append(name, value);
                }
                _ => warn!(
                    name = %String::from_utf8_lossy(&name),
                    "dropping invalid response header"
                ),
            }
        }
        response
    }
}

fn send_fn(collected: Arc<Mutex<Collected>>) -> SendFn {
    Arc::new(move |event| {
        let result = collected
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(event);
        Box::pin(async move { result })
    })
}
