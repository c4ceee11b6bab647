//! The bundled middleware composed on a full application.

mod common;
use common::*;

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pathium::middleware::{CatchErrors, Cors, RateLimit, RequestLogger, SecurityHeaders};
use pathium::{Failure, PathParams, Pathium, Request, Scope};
use serde_json::json;

fn app_with(lines: Arc<Mutex<Vec<String>>>) -> Pathium {
    let mut app = Pathium::new();
    app.get("/health", |_req: Request, _params: PathParams| async {
        Ok::<_, Failure>(json!({ "status": "ok" }))
    })
    .unwrap();
    app.use_middleware(RequestLogger::with_sink(move |line: &str| {
        lines.lock().unwrap().push(line.to_string());
    }))
    .use_middleware(CatchErrors)
    .use_middleware(SecurityHeaders::default())
    .use_middleware(RateLimit::new(2, Duration::from_secs(60)))
    .use_middleware(Cors::new(&["https://app.example"]));
    app
}

fn from_client(path: &str) -> Scope {
    let addr: SocketAddr = "10.0.0.1:5000".parse().unwrap();
    Scope::http("GET", path)
        .client(addr)
        .header("origin", "https://app.example")
}

#[tokio::test(start_paused = true)]
async fn full_stack_decorates_response() {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let app = app_with(Arc::clone(&lines));

    let res = call(&app, from_client("/health")).await;
    assert_eq!(res.status(), Some(200));
    assert_eq!(res.json(), json!({ "status": "ok" }));
    assert_eq!(
        res.header("access-control-allow-origin").as_deref(),
        Some("https://app.example")
    );
    assert_eq!(res.header("x-frame-options").as_deref(), Some("DENY"));
    assert_eq!(res.header("x-content-type-options").as_deref(), Some("nosniff"));
    assert_eq!(*lines.lock().unwrap(), vec!["GET /health".to_string()]);
}

#[tokio::test(start_paused = true)]
async fn rate_limited_request_is_json_429() {
    let app = app_with(Arc::new(Mutex::new(Vec::new())));

    for _ in 0..2 {
        assert_eq!(call(&app, from_client("/health")).await.status(), Some(200));
    }
    let res = call(&app, from_client("/health")).await;
    assert_eq!(res.status(), Some(429));
    assert_eq!(res.json(), json!({ "detail": "Too Many Requests" }));
    // Rendered by CatchErrors, outside the security layer.
    assert!(res.header("x-frame-options").is_none());

    tokio::time::advance(Duration::from_secs(60)).await;
    assert_eq!(call(&app, from_client("/health")).await.status(), Some(200));
}

#[tokio::test(start_paused = true)]
async fn unmatched_route_still_gets_headers() {
    let app = app_with(Arc::new(Mutex::new(Vec::new())));
    let res = call(&app, from_client("/nope")).await;
    assert_eq!(res.status(), Some(404));
    assert_eq!(res.header("referrer-policy").as_deref(), Some("no-referrer"));
}
