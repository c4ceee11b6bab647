//! # pathium
//!
//! A minimal routing and middleware layer over an async transport boundary.
//!
//! This crate provides:
//! - Path templates with typed parameters (`{name}`, `{id:int}`)
//! - First-match routing on method and path
//! - Onion-style middleware around the dispatch function
//! - JSON error responses for handler failures and panics
//! - Bundled CORS, security header, rate limit and logging middleware
//! - OpenAPI document generation
//! - Typed body and query validation
//!
//! ## Quick Start
//!
//! ```ignore
//! use pathium::{Failure, PathParams, Pathium, Request, Response};
//!
//! let mut app = Pathium::new();
//! app.get("/", |_req: Request, _params: PathParams| async {
//!     Ok::<_, Failure>(Response::text("Hello, World!"))
//! })?;
//! app.get("/items/{id:int}", |_req, params: PathParams| async move {
//!     Ok::<_, Failure>(serde_json::json!({ "item_id": params.int("id") }))
//! })?;
//! ```
//!
//! ## Path Parameters
//!
//! A `{name}` segment matches any run of characters other than `/` and is
//! passed to the handler as a string. `{name:int}` matches digits only and is
//! converted to an integer. Every other tag behaves like a string. A request
//! whose segment does not fit the converter simply does not match the route.
//!
//! ## Transport
//!
//! The application is an [`Endpoint`]: it takes a [`Scope`], a receive
//! capability and a send capability. A host (see the `pathium-server` crate)
//! or a test [`Recorder`] supplies them:
//!
//! ```ignore
//! let recorder = Recorder::new();
//! app.call(Scope::http("GET", "/items/7"), receive_from(vec![]), recorder.send())
//!     .await?;
//! assert_eq!(recorder.status(), Some(200));
//! ```
//!
//! ## Middleware
//!
//! ```ignore
//! use pathium::middleware::{CatchErrors, Cors, RateLimit, RequestLogger};
//!
//! app.use_middleware(RequestLogger::new())
//!     .use_middleware(CatchErrors)
//!     .use_middleware(RateLimit::new(100, Duration::from_secs(60)))
//!     .use_middleware(Cors::permissive());
//! ```

pub mod app;
mod error;
pub mod middleware;
pub mod openapi;
mod path;
mod request;
mod response;
mod router;
pub mod transport;
pub mod validation;

pub use app::Pathium;
pub use error::{Failure, HttpError, Result, RouteError};
pub use middleware::Middleware;
pub use path::{ParamKind, PathPattern};
pub use request::{parse_query_string, Method, ParamValue, PathParams, Request};
pub use response::{
    Content, IntoResponse, Json, Response, HTML_MEDIA_TYPE, JSON_MEDIA_TYPE, TEXT_MEDIA_TYPE,
};
pub use router::{Handler, Route, Router};
pub use transport::{
    emit, emit_failure, receive_body, receive_from, track_start, BoxEndpoint, BoxFuture, Endpoint,
    Inbound, Outbound, RawHeaders, ReceiveFn, Recorder, Scope, ScopeKind, SendFn,
};
pub use validation::{validate_body, validate_query};
