//! Routes and first-match route resolution.

use std::future::Future;
use std::sync::Arc;

use serde_json::Value;
use tracing::debug;

use crate::error::{Failure, Result};
use crate::openapi::{Model, QueryParam, RouteDoc};
use crate::path::{ParamKind, PathPattern};
use crate::request::{Method, PathParams, Request};
use crate::response::{IntoResponse, Response};
use crate::transport::BoxFuture;

/// A boxed async handler function.
pub type Handler = Arc<
    dyn Fn(Request, PathParams) -> BoxFuture<'static, std::result::Result<Response, Failure>>
        + Send
        + Sync,
>;

/// Wraps a typed handler into a [`Handler`], coercing its result.
pub fn boxed<F, Fut, R>(handler: F) -> Handler
where
    F: Fn(Request, PathParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = std::result::Result<R, Failure>> + Send + 'static,
    R: IntoResponse,
{
    Arc::new(move |req, params| {
        let fut = handler(req, params);
        Box::pin(async move { fut.await.map(IntoResponse::into_response) })
    })
}

/// A single route definition.
#[derive(Clone)]
pub struct Route {
    /// HTTP method.
    pub method: Method,
    /// Path pattern.
    pub pattern: PathPattern,
    /// Request handler.
    pub handler: Handler,
    /// Documentation metadata.
    pub doc: RouteDoc,
}

impl Route {
    /// Creates a new route.
    ///
    /// # Errors
    ///
    /// Fails when `pattern` does not compile.
    pub fn new<F, Fut, R>(method: impl Into<Method>, pattern: &str, handler: F) -> Result<Self>
    where
        F: Fn(Request, PathParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, Failure>> + Send + 'static,
        R: IntoResponse,
    {
        Ok(Self {
            method: method.into(),
            pattern: PathPattern::new(pattern)?,
            handler: boxed(handler),
            doc: RouteDoc::default(),
        })
    }

    /// Returns the typed parameters if this route serves `method` and `path`.
    pub fn matches(&self, method: &str, path: &str) -> Option<PathParams> {
        if !self.method.matches(method) {
            return None;
        }
        self.pattern.match_path(path)
    }

    /// Returns the path template.
    pub fn path(&self) -> &str {
        self.pattern.pattern()
    }

    /// Returns the declared path parameters.
    pub fn params(&self) -> &[(String, ParamKind)] {
        self.pattern.params()
    }

    /// Sets the documentation summary.
    pub fn summary(&mut self, summary: impl Into<String>) -> &mut Self {
        self.doc.summary = summary.into();
        self
    }

    /// Documents a query parameter.
    pub fn query_param(&mut self, name: &str, kind: ParamKind, required: bool) -> &mut Self {
        self.doc.query.push(QueryParam {
            name: name.to_string(),
            kind,
            required,
        });
        self
    }

    /// Documents a query model: each property of `schema` becomes a query
    /// parameter and `schema` is published under `name`.
    pub fn query_model(&mut self, name: &str, schema: Value) -> &mut Self {
        self.doc.query_model = Some(Model::new(name, schema));
        self
    }

    /// Documents the JSON request body model.
    pub fn request_body(&mut self, name: &str, schema: Value) -> &mut Self {
        self.doc.request_body = Some(Model::new(name, schema));
        self
    }

    /// Documents the JSON response model.
    pub fn response_model(&mut self, name: &str, schema: Value) -> &mut Self {
        self.doc.response = Some(Model::new(name, schema));
        self
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.pattern())
            .finish_non_exhaustive()
    }
}

/// Ordered route table.
///
/// Lookup is a linear scan in registration order; the first route whose
/// method and pattern both match wins. Shadowed routes are legal.
#[derive(Clone, Default)]
pub struct Router {
    /// Registered routes.
    routes: Vec<Route>,
}

impl Router {
    /// Creates a new empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Compiles `path` and appends a route.
    ///
    /// # Errors
    ///
    /// Fails when `path` does not compile.
    pub fn add<F, Fut, R>(&mut self, method: impl Into<Method>, path: &str, handler: F) -> Result<&mut Route>
    where
        F: Fn(Request, PathParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, Failure>> + Send + 'static,
        R: IntoResponse,
    {
        let route = Route::new(method, path, handler)?;
        debug!(method = %route.method, path, "route registered");
        Ok(self.push(route))
    }

    /// Appends an already built route.
    pub fn push(&mut self, route: Route) -> &mut Route {
        self.routes.push(route);
        let last = self.routes.len() - 1;
        &mut self.routes[last]
    }

    /// Finds the first route serving `method` and `path`.
    pub fn resolve(&self, method: &str, path: &str) -> Option<(&Route, PathParams)> {
        self.routes
            .iter()
            .find_map(|route| route.matches(method, path).map(|params| (route, params)))
    }

    /// Returns the registered routes in order.
    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// Returns the number of routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns whether no route is registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn hello_handler(_req: Request, _params: PathParams) -> std::result::Result<Response, Failure> {
        Ok(Response::text("Hello, World!"))
    }

    async fn item_handler(_req: Request, params: PathParams) -> std::result::Result<Value, Failure> {
        Ok(serde_json::json!({ "id": params.int("id") }))
    }

    async fn name_handler(_req: Request, params: PathParams) -> std::result::Result<String, Failure> {
        Ok(format!("name {}", params.str("name").unwrap_or_default()))
    }

    #[test]
    fn test_simple_match() {
        let mut router = Router::new();
        router.add(Method::Get, "/hello", hello_handler).unwrap();

        let (route, params) = router.resolve("GET", "/hello").unwrap();
        assert_eq!(route.path(), "/hello");
        assert!(params.is_empty());
    }

    #[test]
    fn test_method_is_case_insensitive() {
        let mut router = Router::new();
        router.add("get", "/hello", hello_handler).unwrap();
        assert!(router.resolve("GET", "/hello").is_some());
        assert!(router.resolve("get", "/hello").is_some());
        assert!(router.resolve("POST", "/hello").is_none());
    }

    #[test]
    fn test_params_and_converter() {
        let mut router = Router::new();
        router.add(Method::Get, "/items/{id:int}", item_handler).unwrap();

        let (_, params) = router.resolve("GET", "/items/42").unwrap();
        assert_eq!(params.int("id"), Some(42));
        assert!(router.resolve("GET", "/items/abc").is_none());
    }

    #[test]
    fn test_first_registration_wins() {
        let mut router = Router::new();
        router.add(Method::Get, "/items/{id:int}", item_handler).unwrap();
        router.add(Method::Get, "/items/{name}", name_handler).unwrap();

        let (route, params) = router.resolve("GET", "/items/42").unwrap();
        assert_eq!(route.path(), "/items/{id:int}");
        assert_eq!(params.int("id"), Some(42));

        let (route, params) = router.resolve("GET", "/items/abc").unwrap();
        assert_eq!(route.path(), "/items/{name}");
        assert_eq!(params.str("name"), Some("abc"));
    }

    #[test]
    fn test_shadowed_route_is_kept() {
        let mut router = Router::new();
        router.add(Method::Get, "/a", hello_handler).unwrap();
        router.add(Method::Get, "/a", hello_handler).unwrap();
        assert_eq!(router.len(), 2);
    }

    #[test]
    fn test_invalid_template_is_rejected() {
        let mut router = Router::new();
        assert!(router.add(Method::Get, "/items/{id", hello_handler).is_err());
        assert!(router.is_empty());
    }

    #[tokio::test]
    async fn test_handler_result_is_coerced() {
        let route = Route::new(Method::Get, "/items/{id:int}", item_handler).unwrap();
        let params = route.matches("GET", "/items/5").unwrap();
        let req = Request::new(
            crate::transport::Scope::http("GET", "/items/5"),
            crate::transport::receive_from(Vec::new()),
        );
        let res = (route.handler)(req, params).await.unwrap();
        assert_eq!(res.body, br#"{"id":5}"#);
        assert_eq!(
            res.get_header("content-type"),
            Some(crate::response::JSON_MEDIA_TYPE)
        );
    }
}
