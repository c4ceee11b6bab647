//! The application: route registration, middleware and dispatch.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use futures::FutureExt;
use tracing::warn;

use crate::error::{Failure, Result};
use crate::middleware::Middleware;
use crate::request::{Method, PathParams, Request};
use crate::response::{IntoResponse, Response};
use crate::router::{Route, Router};
use crate::transport::{
    emit, emit_failure, track_start, BoxEndpoint, BoxFuture, Endpoint, ReceiveFn, Scope,
    SendFn,
};

/// A routing application.
///
/// Register routes and middleware, then hand the value to a host as an
/// [`Endpoint`]:
///
/// ```ignore
/// let mut app = Pathium::new();
/// app.use_middleware(RequestLogger::new());
/// app.get("/items/{id:int}", |_req, params: PathParams| async move {
///     Ok::<_, Failure>(json!({ "id": params.int("id") }))
/// })?;
/// ```
///
/// Every call builds the middleware chain afresh around the current route
/// table, so registration may continue after the first request.
#[derive(Clone, Default)]
pub struct Pathium {
    router: Arc<Router>,
    middleware: Vec<Arc<dyn Middleware>>,
}

impl Pathium {
    /// Creates an application with no routes and no middleware.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `handler` for `method` and `path`.
    ///
    /// # Errors
    ///
    /// Fails when `path` does not compile.
    pub fn route<F, Fut, R>(
        &mut self,
        method: impl Into<Method>,
        path: &str,
        handler: F,
    ) -> Result<&mut Route>
    where
        F: Fn(Request, PathParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, Failure>> + Send + 'static,
        R: IntoResponse,
    {
        Arc::make_mut(&mut self.router).add(method, path, handler)
    }

    /// Registers a GET route.
    ///
    /// # Errors
    ///
    /// Fails when `path` does not compile.
    pub fn get<F, Fut, R>(&mut self, path: &str, handler: F) -> Result<&mut Route>
    where
        F: Fn(Request, PathParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, Failure>> + Send + 'static,
        R: IntoResponse,
    {
        self.route(Method::Get, path, handler)
    }

    /// Registers a POST route.
    ///
    /// # Errors
    ///
    /// Fails when `path` does not compile.
    pub fn post<F, Fut, R>(&mut self, path: &str, handler: F) -> Result<&mut Route>
    where
        F: Fn(Request, PathParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, Failure>> + Send + 'static,
        R: IntoResponse,
    {
        self.route(Method::Post, path, handler)
    }

    /// Registers a PUT route.
    ///
    /// # Errors
    ///
    /// Fails when `path` does not compile.
    pub fn put<F, Fut, R>(&mut self, path: &str, handler: F) -> Result<&mut Route>
    where
        F: Fn(Request, PathParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, Failure>> + Send + 'static,
        R: IntoResponse,
    {
        self.route(Method::Put, path, handler)
    }

    /// Registers a PATCH route.
    ///
    /// # Errors
    ///
    /// Fails when `path` does not compile.
    pub fn patch<F, Fut, R>(&mut self, path: &str, handler: F) -> Result<&mut Route>
    where
        F: Fn(Request, PathParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, Failure>> + Send + 'static,
        R: IntoResponse,
    {
        self.route(Method::Patch, path, handler)
    }

    /// Registers a DELETE route.
    ///
    /// # Errors
    ///
    /// Fails when `path` does not compile.
    pub fn delete<F, Fut, R>(&mut self, path: &str, handler: F) -> Result<&mut Route>
    where
        F: Fn(Request, PathParams) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, Failure>> + Send + 'static,
        R: IntoResponse,
    {
        self.route(Method::Delete, path, handler)
    }

    /// Appends a middleware. The first one registered is the outermost.
    pub fn use_middleware(&mut self, middleware: impl Middleware + 'static) -> &mut Self {
        self.middleware.push(Arc::new(middleware));
        self
    }

    /// Returns the route table.
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Builds the middleware chain around dispatch.
    fn chain(&self) -> BoxEndpoint {
        let dispatch: BoxEndpoint = Arc::new(Dispatch {
            router: Arc::clone(&self.router),
        });
        self.middleware
            .iter()
            .rev()
            .fold(dispatch, |next, middleware| middleware.wrap(next))
    }
}

impl std::fmt::Debug for Pathium {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pathium")
            .field("routes", &self.router.len())
            .field("middleware", &self.middleware.len())
            .finish()
    }
}

impl Endpoint for Pathium {
    fn call<'a>(
        &'a self,
        scope: Scope,
        receive: ReceiveFn,
        send: SendFn,
    ) -> BoxFuture<'a, std::result::Result<(), Failure>> {
        Box::pin(async move {
            if !scope.is_http() {
                return emit(&send, 404, Vec::new(), b"Not Found".to_vec()).await;
            }

            let chain = self.chain();
            let (tracked, started) = track_start(Arc::clone(&send));
            match chain.call(scope, receive, tracked).await {
                Ok(()) => Ok(()),
                Err(failure) if started.load(Ordering::Acquire) => {
                    warn!(error = %failure, "failure after response started");
                    Ok(())
                }
                Err(failure) => {
                    if failure.as_http().is_none() {
                        warn!(error = %failure, "failure escaped middleware");
                    }
                    emit_failure(&send, &failure).await
                }
            }
        })
    }
}

/// Innermost endpoint: resolves the route and runs its handler.
struct Dispatch {
    router: Arc<Router>,
}

impl Dispatch {
    async fn respond(&self, scope: Scope, receive: ReceiveFn) -> Response {
        let method = scope.method.clone();
        let path = scope.path.clone();
        let Some((route, params)) = self.router.resolve(&method, &path) else {
            return Response::not_found();
        };

        let request = Request::new(scope, receive).with_router(Arc::clone(&self.router));
        let handler = Arc::clone(&route.handler);
        // The call itself runs inside the guarded future: handlers may panic
        // before returning their future.
        let outcome = AssertUnwindSafe(async move { handler(request, params).await })
            .catch_unwind()
            .await;

        match outcome {
            Ok(Ok(response)) => response,
            Ok(Err(Failure::Http(err))) => Response::detail(err.status, &err.detail),
            Ok(Err(failure)) => {
                warn!(%method, %path, error = %failure, "handler failed");
                Response::internal_server_error()
            }
            Err(panic) => {
                let failure = Failure::Panic(panic_message(panic.as_ref()));
                warn!(%method, %path, error = %failure, "handler panicked");
                Response::internal_server_error()
            }
        }
    }
}

impl Endpoint for Dispatch {
    fn call<'a>(
        &'a self,
        scope: Scope,
        receive: ReceiveFn,
        send: SendFn,
    ) -> BoxFuture<'a, std::result::Result<(), Failure>> {
        Box::pin(async move {
            let response = self.respond(scope, receive).await;
            let headers = response.raw_headers();
            emit(&send, response.status, headers, response.body).await
        })
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    panic
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| panic.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
