//! End-to-end dispatch through the application.

mod common;
use common::*;

use std::sync::{Arc, Mutex};

use pathium::middleware::rewrite_start;
use pathium::{
    validate_body, BoxEndpoint, Failure, HttpError, Json, PathParams, Pathium, ReceiveFn, Request,
    Response, Scope, SendFn,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Deserialize, Serialize)]
struct Item {
    name: String,
    price: f64,
}

fn app() -> Pathium {
    let mut app = Pathium::new();
    app.get("/", |_req: Request, _params: PathParams| async {
        Ok::<_, Failure>(json!({ "message": "Hello, World!" }))
    })
    .unwrap();
    app.get("/items/{id:int}", |_req: Request, params: PathParams| async move {
        Ok::<_, Failure>(json!({ "item_id": params.int("id"), "kind": "int" }))
    })
    .unwrap();
    app.get("/items/{name}", |_req: Request, params: PathParams| async move {
        Ok::<_, Failure>(json!({ "name": params.str("name"), "kind": "str" }))
    })
    .unwrap();
    app.get("/missing", |_req: Request, _params: PathParams| async {
        Err::<Response, _>(Failure::from(HttpError::not_found("Item not found")))
    })
    .unwrap();
    app.get("/broken", |_req: Request, _params: PathParams| async {
        Err::<Response, _>(Failure::other("database password is hunter2"))
    })
    .unwrap();
    app.post("/echo", |mut req: Request, _params: PathParams| async move {
        let item: Item = validate_body(&mut req).await?;
        Ok::<_, Failure>(Json(item))
    })
    .unwrap();
    app.get("/search", |req: Request, _params: PathParams| async move {
        let query = req.query_params();
        Ok::<_, Failure>(json!({ "q": query.get("q"), "page": query.get("page") }))
    })
    .unwrap();
    app
}

#[tokio::test]
async fn root_returns_json() {
    let res = get(&app(), "/").await;
    assert_eq!(res.status(), Some(200));
    assert_eq!(
        res.header("content-type").as_deref(),
        Some("application/json; charset=utf-8")
    );
    assert_eq!(res.json(), json!({ "message": "Hello, World!" }));
}

#[tokio::test]
async fn int_route_registered_first_wins() {
    let app = app();
    assert_eq!(
        get(&app, "/items/42").await.json(),
        json!({ "item_id": 42, "kind": "int" })
    );
    assert_eq!(
        get(&app, "/items/pen").await.json(),
        json!({ "name": "pen", "kind": "str" })
    );
}

#[tokio::test]
async fn unmatched_path_and_method() {
    let app = app();

    let res = get(&app, "/nowhere").await;
    assert_eq!(res.status(), Some(404));
    assert_eq!(res.body(), b"Not Found");

    let res = call(&app, Scope::http("DELETE", "/")).await;
    assert_eq!(res.status(), Some(404));

    let res = get(&app, "/items/42/").await;
    assert_eq!(res.status(), Some(404));
}

#[tokio::test]
async fn lower_case_method_matches() {
    let res = call(&app(), Scope::http("get", "/")).await;
    assert_eq!(res.status(), Some(200));
}

#[tokio::test]
async fn http_error_detail_reaches_client() {
    let res = get(&app(), "/missing").await;
    assert_eq!(res.status(), Some(404));
    assert_eq!(res.json(), json!({ "detail": "Item not found" }));
}

#[tokio::test]
async fn unexpected_error_is_opaque() {
    let res = get(&app(), "/broken").await;
    assert_eq!(res.status(), Some(500));
    assert_eq!(res.json(), json!({ "detail": "Internal Server Error" }));
    assert!(!String::from_utf8_lossy(&res.body()).contains("hunter2"));
}

#[tokio::test]
async fn body_is_validated() {
    let app = app();

    let res = call_with_body(
        &app,
        Scope::http("POST", "/echo"),
        r#"{"name":"pen","price":2.5}"#,
    )
    .await;
    assert_eq!(res.status(), Some(200));
    assert_eq!(res.json(), json!({ "name": "pen", "price": 2.5 }));

    let res = call_with_body(&app, Scope::http("POST", "/echo"), r#"{"name":"pen"}"#).await;
    assert_eq!(res.status(), Some(422));
}

#[tokio::test]
async fn query_values_are_raw() {
    let res = call(&app(), Scope::http("GET", "/search").query("q=a%20b&page=2&page=3")).await;
    assert_eq!(res.json(), json!({ "q": "a%20b", "page": "3" }));
}

#[tokio::test]
async fn middleware_runs_as_onion() {
    let trace = Arc::new(Mutex::new(Vec::<String>::new()));

    let tracer = |name: &'static str, trace: Arc<Mutex<Vec<String>>>| {
        move |next: BoxEndpoint| -> BoxEndpoint {
            let trace = Arc::clone(&trace);
            Arc::new(move |scope: Scope, receive: ReceiveFn, send: SendFn| {
                let next = Arc::clone(&next);
                let trace = Arc::clone(&trace);
                let start_trace = Arc::clone(&trace);
                let send = rewrite_start(send, move |headers| {
                    start_trace.lock().unwrap().push(format!("{name}-start"));
                    headers.push((b"x-layer".to_vec(), name.as_bytes().to_vec()));
                });
                async move {
                    trace.lock().unwrap().push(format!("{name}-in"));
                    let result = next.call(scope, receive, send).await;
                    trace.lock().unwrap().push(format!("{name}-out"));
                    result
                }
            })
        }
    };

    let mut app = app();
    app.use_middleware(tracer("A", Arc::clone(&trace)))
        .use_middleware(tracer("B", Arc::clone(&trace)));

    let res = get(&app, "/").await;
    assert_eq!(res.status(), Some(200));
    assert_eq!(
        *trace.lock().unwrap(),
        vec!["A-in", "B-in", "B-start", "A-start", "B-out", "A-out"]
    );
    let layers: Vec<String> = res
        .headers()
        .into_iter()
        .filter(|(k, _)| k == "x-layer")
        .map(|(_, v)| v)
        .collect();
    assert_eq!(layers, vec!["B", "A"]);
}

#[tokio::test]
async fn middleware_failure_becomes_json() {
    let mut app = app();
    app.use_middleware(|_next: BoxEndpoint| -> BoxEndpoint {
        Arc::new(|_scope: Scope, _receive: ReceiveFn, _send: SendFn| async {
            Err::<(), _>(Failure::from(HttpError::forbidden("blocked")))
        })
    });

    let res = get(&app, "/").await;
    assert_eq!(res.status(), Some(403));
    assert_eq!(res.json(), json!({ "detail": "blocked" }));
}

#[tokio::test]
async fn non_http_scope_gets_plain_404() {
    let res = call(&app(), Scope::lifespan()).await;
    assert_eq!(res.status(), Some(404));
    assert!(res.headers().is_empty());
    assert_eq!(res.body(), b"Not Found");
}
