//! OpenAPI document generation and a Swagger UI page.
//!
//! The document is derived by walking the router's routes and whatever
//! metadata was attached to them at registration:
//!
//! ```ignore
//! app.post("/items", create_item)?
//!     .summary("Create an item")
//!     .request_body("Item", item_schema())
//!     .query_model("ItemQuery", item_query_schema())
//!     .response_model("Item", item_schema());
//!
//! openapi::add_openapi(&mut app, "/openapi.json", "Inventory", "1.0.0")?;
//! openapi::add_docs(&mut app, "/docs", "/openapi.json")?;
//! ```

use serde_json::{json, Map, Value};

use crate::app::Pathium;
use crate::error::{Failure, HttpError, Result};
use crate::path::ParamKind;
use crate::request::{PathParams, Request};
use crate::response::Response;
use crate::router::{Route, Router};

/// Default path of the OpenAPI document.
pub const DEFAULT_OPENAPI_PATH: &str = "/openapi.json";
/// Default path of the docs page.
pub const DEFAULT_DOCS_PATH: &str = "/docs";
/// Default document title.
pub const DEFAULT_TITLE: &str = "Pathium API";

/// A named JSON schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Model {
    pub name: String,
    pub schema: Value,
}

impl Model {
    pub fn new(name: impl Into<String>, schema: Value) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }

    fn reference(&self) -> Value {
        json!({ "$ref": format!("#/components/schemas/{}", self.name) })
    }
}

/// A documented query parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryParam {
    pub name: String,
    pub kind: ParamKind,
    pub required: bool,
}

/// Documentation attached to a route.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteDoc {
    pub summary: String,
    pub query: Vec<QueryParam>,
    pub query_model: Option<Model>,
    pub request_body: Option<Model>,
    pub response: Option<Model>,
}

fn kind_schema(kind: ParamKind) -> Value {
    match kind {
        ParamKind::Int => json!({ "type": "integer", "format": "int32" }),
        ParamKind::Str => json!({ "type": "string" }),
    }
}

fn operation(route: &Route) -> Value {
    let mut parameters: Vec<Value> = route
        .params()
        .iter()
        .map(|(name, kind)| {
            json!({
                "name": name,
                "in": "path",
                "required": true,
                "schema": kind_schema(*kind),
            })
        })
        .collect();
    parameters.extend(route.doc.query.iter().map(|q| {
        json!({
            "name": q.name,
            "in": "query",
            "required": q.required,
            "schema": kind_schema(q.kind),
        })
    }));
    if let Some(model) = &route.doc.query_model {
        parameters.extend(model_query_params(&model.schema));
    }

    let ok = match &route.doc.response {
        Some(model) => json!({
            "description": "Successful Response",
            "content": { "application/json": { "schema": model.reference() } },
        }),
        None => json!({ "description": "Successful Response" }),
    };

    let mut op = json!({
        "summary": route.doc.summary,
        "parameters": parameters,
        "responses": {
            "200": ok,
            "default": { "description": "Unexpected error" },
        },
    });
    if let Some(model) = &route.doc.request_body {
        op["requestBody"] = json!({
            "content": { "application/json": { "schema": model.reference() } },
            "required": true,
        });
    }
    op
}

/// One `in: query` parameter per property of an object schema.
fn model_query_params(schema: &Value) -> Vec<Value> {
    let required: Vec<&str> = schema["required"]
        .as_array()
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();
    schema["properties"]
        .as_object()
        .map(|props| {
            props
                .iter()
                .map(|(name, prop)| {
                    json!({
                        "name": name,
                        "in": "query",
                        "required": required.contains(&name.as_str()),
                        "schema": prop,
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Builds an OpenAPI 3.0.0 document for every route in `router`.
pub fn document(router: &Router, title: &str, version: &str) -> Value {
    let mut paths = Map::new();
    let mut schemas = Map::new();

    for route in router.routes() {
        let entry = paths
            .entry(route.path().to_string())
            .or_insert_with(|| Value::Object(Map::new()));
        entry[route.method.as_str().to_lowercase()] = operation(route);

        for model in [
            &route.doc.query_model,
            &route.doc.request_body,
            &route.doc.response,
        ]
            .into_iter()
            .flatten()
        {
            schemas.insert(model.name.clone(), model.schema.clone());
        }
    }

    let mut doc = json!({
        "openapi": "3.0.0",
        "info": { "title": title, "version": version },
        "paths": paths,
    });
    if !schemas.is_empty() {
        doc["components"] = json!({ "schemas": schemas });
    }
    doc
}

/// Registers a GET route at `path` serving the application's document.
///
/// The document is built per request, so routes registered later are
/// included.
///
/// # Errors
///
/// Fails when `path` does not compile.
pub fn add_openapi<'a>(
    app: &'a mut Pathium,
    path: &str,
    title: &str,
    version: &str,
) -> Result<&'a mut Route> {
    let title = title.to_string();
    let version = version.to_string();
    app.get(path, move |req: Request, _params: PathParams| {
        let doc = req
            .router()
            .map(|router| document(router, &title, &version));
        async move {
            doc.map(|doc| Response::json(&doc))
                .ok_or_else(|| Failure::from(HttpError::not_found("Not Found")))
        }
    })
}

/// Registers a GET route at `path` serving a Swagger UI page for
/// `openapi_url`.
///
/// # Errors
///
/// Fails when `path` does not compile.
pub fn add_docs<'a>(app: &'a mut Pathium, path: &str, openapi_url: &str) -> Result<&'a mut Route> {
    let html = swagger_ui_html(openapi_url);
    app.get(path, move |_req: Request, _params: PathParams| {
        let html = html.clone();
        async move { Ok::<_, Failure>(Response::html(html)) }
    })
}

/// Registers the document and docs page at their default paths, titled
/// [`DEFAULT_TITLE`] with this crate's version.
///
/// # Errors
///
/// Fails when a default path does not compile.
pub fn add_defaults(app: &mut Pathium) -> Result<()> {
    add_openapi(app, DEFAULT_OPENAPI_PATH, DEFAULT_TITLE, env!("CARGO_PKG_VERSION"))?;
    add_docs(app, DEFAULT_DOCS_PATH, DEFAULT_OPENAPI_PATH)?;
    Ok(())
}

fn swagger_ui_html(openapi_url: &str) -> String {
    let url = Value::from(openapi_url).to_string();
    format!(
        r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8" />
    <meta name="viewport" content="width=device-width, initial-scale=1" />
    <title>API Docs</title>
    <link rel="stylesheet" href="https://unpkg.com/swagger-ui-dist@4/swagger-ui.css" />
  </head>
  <body>
    <div id="swagger-ui"></div>
    <script src="https://unpkg.com/swagger-ui-dist@4/swagger-ui-bundle.js"></script>
    <script>
      const ui = SwaggerUIBundle({{
        url: {url},
        dom_id: '#swagger-ui',
      }});
    </script>
  </body>
</html>
"#
    )
}
