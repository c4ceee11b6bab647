//! OpenAPI and docs routes served by a live application.

mod common;
use common::*;

use pathium::openapi::{add_docs, add_openapi};
use pathium::{Failure, ParamKind, PathParams, Pathium, Request, Response};
use serde_json::json;

async fn noop(_req: Request, _params: PathParams) -> Result<Response, Failure> {
    Ok(Response::ok())
}

#[tokio::test]
async fn document_lists_routes_registered_later() {
    let mut app = Pathium::new();
    add_openapi(&mut app, "/openapi.json", "Inventory", "2.1.0").unwrap();
    app.get("/items/{id:int}", noop)
        .unwrap()
        .summary("Read an item")
        .response_model("Item", json!({ "type": "object" }));
    app.get("/search", noop)
        .unwrap()
        .query_param("q", ParamKind::Str, true);

    let res = get(&app, "/openapi.json").await;
    assert_eq!(res.status(), Some(200));

    let doc = res.json();
    assert_eq!(doc["openapi"], "3.0.0");
    assert_eq!(doc["info"], json!({ "title": "Inventory", "version": "2.1.0" }));
    assert!(doc["paths"]["/openapi.json"]["get"].is_object());

    let item = &doc["paths"]["/items/{id:int}"]["get"];
    assert_eq!(item["summary"], "Read an item");
    assert_eq!(item["parameters"][0]["in"], "path");
    assert_eq!(item["parameters"][0]["schema"]["type"], "integer");
    assert_eq!(doc["components"]["schemas"]["Item"], json!({ "type": "object" }));

    assert_eq!(doc["paths"]["/search"]["get"]["parameters"][0]["name"], "q");
}

#[tokio::test]
async fn docs_page_is_html() {
    let mut app = Pathium::new();
    add_docs(&mut app, "/docs", "/openapi.json").unwrap();

    let res = get(&app, "/docs").await;
    assert_eq!(res.status(), Some(200));
    assert!(res
        .header("content-type")
        .is_some_and(|ct| ct.starts_with("text/html")));
    assert!(String::from_utf8_lossy(&res.body()).contains("/openapi.json"));
}
