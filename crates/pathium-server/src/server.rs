//! TCP listener and connection loop.
//!
//! Every accepted connection is served on its own task by hyper's automatic
//! HTTP/1.1 / HTTP/2 builder. On shutdown the listener stops accepting and the
//! in-flight connections are drained before [`Server::serve`] returns.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use pathium::Pathium;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::adapter::handle;
use crate::error::Result;

/// A bound HTTP server.
#[derive(Debug)]
pub struct Server {
    listener: TcpListener,
}

impl Server {
    /// Binds a listener on `addr`.
    ///
    /// # Errors
    ///
    /// Fails when the address cannot be bound.
    pub async fn bind(addr: SocketAddr) -> Result<Self> {
        Ok(Self {
            listener: TcpListener::bind(addr).await?,
        })
    }

    /// Returns the bound address.
    ///
    /// # Errors
    ///
    /// Fails when the socket has no local address.
    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Serves `app` until SIGTERM or Ctrl-C.
    ///
    /// # Errors
    ///
    /// Fails when the local address cannot be read.
    pub async fn serve(self, app: Pathium) -> Result<()> {
        self.serve_with_shutdown(app, shutdown_signal()).await
    }

    /// Serves `app` until `signal` resolves.
    ///
    /// # Errors
    ///
    /// Fails when the local address cannot be read.
    pub async fn serve_with_shutdown<F>(self, app: Pathium, signal: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let app = Arc::new(app);
        let addr = self.local_addr()?;
        info!(%addr, routes = app.router().len(), "pathium listening");

        let mut tasks = tokio::task::JoinSet::new();
        tokio::pin!(signal);

        loop {
            tokio::select! {
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = self.listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let app = Arc::clone(&app);
                    let io = TokioIo::new(stream);
                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let app = Arc::clone(&app);
                            async move {
                                Ok::<_, std::convert::Infallible>(
                                    handle(&app, req, Some(remote_addr)).await,
                                )
                            }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            warn!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("pathium stopped");
        Ok(())
    }
}

/// Resolves on SIGTERM (Unix) or Ctrl-C.
///
/// A handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = sigterm => {}
    }
}

#[cfg(test)]
mod tests {
    use pathium::{Failure, PathParams, Request};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpStream;

    use super::*;

    #[tokio::test]
    async fn test_serves_over_tcp() {
        let mut app = Pathium::new();
        app.get("/health", |_req: Request, _params: PathParams| async {
            Ok::<_, Failure>("ok")
        })
        .unwrap();

        let server = Server::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr = server.local_addr().unwrap();
        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let handle = tokio::spawn(server.serve_with_shutdown(app, async {
            let _ = stopped.await;
        }));

        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut raw = Vec::new();
        stream.read_to_end(&mut raw).await.unwrap();
        let raw = String::from_utf8_lossy(&raw);

        assert!(raw.starts_with("HTTP/1.1 200 OK"), "{raw}");
        assert!(raw.to_ascii_lowercase().contains("content-type: text/plain; charset=utf-8"));
        assert!(raw.ends_with("ok"));

        stop.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }
}
