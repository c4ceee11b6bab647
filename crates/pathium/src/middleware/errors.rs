//! Conversion of escaped failures into JSON error responses.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use tracing::warn;

use super::Middleware;
use crate::error::Failure;
use crate::transport::{
    emit_failure, track_start, BoxEndpoint, BoxFuture, Endpoint, ReceiveFn, Scope, SendFn,
};

/// Middleware that turns any failure from the wrapped chain into a JSON
/// response.
///
/// An [`HttpError`](crate::HttpError) keeps its status and detail; anything
/// else becomes `500 {"detail": "Internal Server Error"}`. A failure raised
/// after the wrapped chain already started its response is only logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatchErrors;

impl Middleware for CatchErrors {
    fn wrap(&self, next: BoxEndpoint) -> BoxEndpoint {
        Arc::new(CatchErrorsEndpoint { next })
    }
}

struct CatchErrorsEndpoint {
    next: BoxEndpoint,
}

impl Endpoint for CatchErrorsEndpoint {
    fn call<'a>(
        &'a self,
        scope: Scope,
        receive: ReceiveFn,
        send: SendFn,
    ) -> BoxFuture<'a, Result<(), Failure>> {
        Box::pin(async move {
            let path = scope.path.clone();
            let (tracked, started) = track_start(Arc::clone(&send));
            match self.next.call(scope, receive, tracked).await {
                Ok(()) => Ok(()),
                Err(failure) if started.load(Ordering::Acquire) => {
                    warn!(%path, error = %failure, "failure after response started");
                    Ok(())
                }
                Err(failure) => {
                    if failure.as_http().is_none() {
                        warn!(%path, error = %failure, "unhandled failure");
                    }
                    emit_failure(&send, &failure).await
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::HttpError;
    use crate::transport::{receive_from, Recorder};

    #[tokio::test]
    async fn test_http_error_becomes_json() {
        let failing: BoxEndpoint = Arc::new(|_: Scope, _: ReceiveFn, _: SendFn| async {
            Err::<(), _>(Failure::from(HttpError::new(429, "Too Many Requests")))
        });
        let app = CatchErrors.wrap(failing);

        let recorder = Recorder::new();
        app.call(Scope::http("GET", "/"), receive_from(Vec::new()), recorder.send())
            .await
            .unwrap();

        assert_eq!(recorder.status(), Some(429));
        assert_eq!(
            recorder.header("content-type").as_deref(),
            Some(crate::response::JSON_MEDIA_TYPE)
        );
        assert_eq!(recorder.json(), serde_json::json!({"detail": "Too Many Requests"}));
    }

    #[tokio::test]
    async fn test_failure_after_start_is_not_rendered() {
        let partial: BoxEndpoint = Arc::new(|_: Scope, _: ReceiveFn, send: SendFn| async move {
            crate::transport::emit(&send, 200, Vec::new(), b"partial".to_vec()).await?;
            Err::<(), _>(Failure::other("too late"))
        });
        let app = CatchErrors.wrap(partial);

        let recorder = Recorder::new();
        app.call(Scope::http("GET", "/"), receive_from(Vec::new()), recorder.send())
            .await
            .unwrap();

        assert_eq!(recorder.events().len(), 2);
        assert_eq!(recorder.status(), Some(200));
        assert_eq!(recorder.body(), b"partial");
    }

    #[tokio::test]
    async fn test_other_failure_is_opaque() {
        let failing: BoxEndpoint = Arc::new(|_: Scope, _: ReceiveFn, _: SendFn| async {
            Err::<(), _>(Failure::other("secret connection string"))
        });
        let app = CatchErrors.wrap(failing);

        let recorder = Recorder::new();
        app.call(Scope::http("GET", "/"), receive_from(Vec::new()), recorder.send())
            .await
            .unwrap();

        assert_eq!(recorder.status(), Some(500));
        assert_eq!(
            recorder.json(),
            serde_json::json!({"detail": "Internal Server Error"})
        );
        assert!(!String::from_utf8_lossy(&recorder.body()).contains("secret"));
    }
}
