//! The demo application served by `pathium-demo`.

use std::sync::Arc;
use std::time::Duration;

use pathium::middleware::{CatchErrors, Cors, RateLimit, RequestLogger, SecurityHeaders};
use pathium::openapi::{add_docs, add_openapi};
use pathium::{
    BoxEndpoint, Failure, HttpError, Middleware, PathParams, Pathium, ReceiveFn, Request,
    Response, Scope, SendFn,
};
use pathium_auth::{create_expiring_token, JwtAuth};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::Result;

/// Paths under this prefix require a bearer token.
pub const PROTECTED_PREFIX: &str = "/protected";

#[derive(Debug, Deserialize)]
struct Credentials {
    #[serde(default)]
    username: String,
    #[serde(default)]
    password: String,
}

#[derive(Debug, Deserialize, Serialize)]
struct SearchQuery {
    q: String,
    #[serde(default = "default_limit")]
    limit: i64,
}

const fn default_limit() -> i64 {
    10
}

#[derive(Debug, Serialize)]
struct Item {
    item_id: i64,
}

fn item_schema() -> Value {
    json!({
        "type": "object",
        "properties": { "item_id": { "type": "integer" } },
        "required": ["item_id"],
    })
}

fn search_query_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "q": { "type": "string" },
            "limit": { "type": "integer", "default": 10 },
        },
        "required": ["q"],
    })
}

fn credentials_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "username": { "type": "string" },
            "password": { "type": "string" },
        },
        "required": ["username", "password"],
    })
}

/// Returns whether `path` is `prefix` itself or a path below it.
fn under_prefix(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

/// Applies `auth` only to `prefix` and the paths below it.
fn protect_prefix(auth: JwtAuth, prefix: &'static str) -> impl Middleware {
    move |next: BoxEndpoint| -> BoxEndpoint {
        let guarded = auth.wrap(Arc::clone(&next));
        Arc::new(move |scope: Scope, receive: ReceiveFn, send: SendFn| {
            let target = if under_prefix(&scope.path, prefix) {
                Arc::clone(&guarded)
            } else {
                Arc::clone(&next)
            };
            async move { target.call(scope, receive, send).await }
        })
    }
}

/// Builds the demo application.
///
/// # Errors
///
/// Fails when a route template does not compile.
pub fn build(secret: &str) -> Result<Pathium> {
    let mut app = Pathium::new();

    app.use_middleware(RequestLogger::new())
        .use_middleware(CatchErrors)
        .use_middleware(SecurityHeaders::default())
        .use_middleware(Cors::permissive().headers(&["Authorization", "Content-Type"]))
        .use_middleware(RateLimit::new(100, Duration::from_secs(60)))
        .use_middleware(protect_prefix(JwtAuth::hmac(secret), PROTECTED_PREFIX));

    app.get("/", |_req: Request, _params: PathParams| async {
        Ok::<_, Failure>("Hello from Pathium")
    })?
    .summary("Greeting");

    app.get("/items/{id:int}", |_req: Request, params: PathParams| async move {
        let item_id = params
            .int("id")
            .ok_or_else(|| HttpError::bad_request("missing item id"))?;
        Ok::<_, Failure>(pathium::Json(Item { item_id }))
    })?
    .summary("Read an item")
    .response_model("Item", item_schema());

    app.get("/hello/{name}", |_req: Request, params: PathParams| async move {
        let name = params.str("name").unwrap_or_default();
        Ok::<_, Failure>(json!({ "message": format!("Hello, {name}") }))
    })?
    .summary("Greet by name");

    app.get("/search", |req: Request, _params: PathParams| async move {
        let query: SearchQuery = pathium::validate_query(&req)?;
        Ok::<_, Failure>(pathium::Json(query))
    })?
    .summary("Echo a search query")
    .query_model("SearchQuery", search_query_schema());

    app.post("/echo", |mut req: Request, _params: PathParams| async move {
        match req.json::<Value>().await? {
            Some(data @ Value::Object(_)) => Ok(json!({ "you_sent": data })),
            _ => Err(Failure::from(HttpError::bad_request("Expected JSON object"))),
        }
    })?
    .summary("Echo a JSON object");

    app.get("/health", |_req: Request, _params: PathParams| async {
        Ok::<_, Failure>(Response::text("ok"))
    })?;

    let signing_secret = secret.to_string();
    app.post("/login", move |mut req: Request, _params: PathParams| {
        let secret = signing_secret.clone();
        async move {
            let creds: Credentials = pathium::validate_body(&mut req).await?;
            if creds.username.is_empty() || creds.password.is_empty() {
                return Ok(Response::detail(400, "invalid credentials"));
            }
            let mut claims = Map::new();
            claims.insert("sub".to_string(), Value::from(creds.username));
            let token = create_expiring_token(claims, &secret, chrono::Duration::hours(1))
                .map_err(Failure::other)?;
            Ok::<_, Failure>(Response::json(&json!({ "access_token": token })))
        }
    })?
    .summary("Issue a bearer token")
    .request_body("Credentials", credentials_schema());

    app.get(PROTECTED_PREFIX, |req: Request, _params: PathParams| async move {
        Ok::<_, Failure>(json!({ "user": req.state(pathium_auth::USER_STATE_KEY) }))
    })?
    .summary("Show the authenticated user");

    add_openapi(&mut app, "/openapi.json", "Pathium Demo", env!("CARGO_PKG_VERSION"))?;
    add_docs(&mut app, "/docs", "/openapi.json")?;

    Ok(app)
}
