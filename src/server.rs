//! HTTP server, dispatch, and graceful shutdown.
//!
//! The server is the recovery boundary the chain driver counts on: a request
//! abort (handler failure, missing binding) is logged with its cause
//! preserved and converted to an empty 500 here — never inside the chain.
//!
//! Shutdown follows the Kubernetes contract: on SIGTERM (or Ctrl-C) the
//! listener stops accepting immediately, in-flight connection tasks drain to
//! completion, then [`Server::serve`] returns. Set
//! `terminationGracePeriodSeconds` longer than your slowest request.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::app::App;
use crate::error::Error;
use crate::method::Method;
use crate::request::Request;

/// The HTTP server.
pub struct Server {
    addr: SocketAddr,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string.
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { addr }
    }

    /// Starts accepting connections and dispatching them through `app`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, app: App) -> Result<(), Error> {
        let listener = TcpListener::bind(self.addr).await?;

        // Arc so every connection task shares one chain/table/binding set.
        let app = Arc::new(app);

        info!(addr = %self.addr, "cauce listening");

        // JoinSet tracks spawned connection tasks for the shutdown drain.
        let mut tasks = tokio::task::JoinSet::new();

        // The shutdown future is polled across loop iterations; pin it on
        // the stack once.
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown before queued accepts so SIGTERM stops new
                // connections immediately.
                biased;

                () = &mut shutdown => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
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
                        // One service call per request on the connection.
                        let svc = service_fn(move |req| {
                            let app = Arc::clone(&app);
                            async move { dispatch(app, req, remote_addr).await }
                        });

                        // auto::Builder speaks whatever the client negotiated,
                        // HTTP/1.1 or HTTP/2.
                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished tasks so the set stays bounded.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("cauce stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Routes one request, builds its execution context, and drives the chain.
///
/// The error type is [`Infallible`] — every failure becomes a response here
/// (405, 404, 400, 500) so hyper never sees one.
async fn dispatch(
    app: Arc<App>,
    req: hyper::Request<hyper::body::Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let Ok(method) = req.method().as_str().parse::<Method>() else {
        return Ok(empty_response(http::StatusCode::METHOD_NOT_ALLOWED));
    };

    let path = req.uri().path().to_owned();
    let target = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_owned())
        .unwrap_or_else(|| path.clone());

    let Some((action, params)) = app.lookup(method, &path) else {
        return Ok(empty_response(http::StatusCode::NOT_FOUND));
    };

    let headers: Vec<(String, String)> = req
        .headers()
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_owned(),
                String::from_utf8_lossy(v.as_bytes()).into_owned(),
            )
        })
        .collect();

    let body = match req.into_body().collect().await {
        Ok(collected) => collected.to_bytes().to_vec(),
        Err(e) => {
            error!(peer = %remote_addr, "body read error: {e}");
            return Ok(empty_response(http::StatusCode::BAD_REQUEST));
        }
    };

    let request = Request::new(method.as_str(), &target, headers, body, remote_addr.to_string());
    let mut cx = app.context_for(request, action, params);

    if let Err(e) = cx.run().await {
        // Recovery boundary: the abort reaches no further than this log line
        // and an empty 500.
        error!(peer = %remote_addr, error = %e, "request aborted");
        return Ok(empty_response(http::StatusCode::INTERNAL_SERVER_ERROR));
    }

    Ok(cx.resp.into_http())
}

fn empty_response(status: http::StatusCode) -> http::Response<Full<Bytes>> {
    let mut resp = http::Response::new(Full::new(Bytes::new()));
    *resp.status_mut() = status;
    resp
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives: SIGTERM or
/// SIGINT on Unix, Ctrl-C elsewhere.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let sigterm = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    // pending() never resolves — the SIGTERM arm is disabled off-Unix.
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
