//! HTTP server, connection limits and graceful shutdown.
//!
//! # Limits
//!
//! Fixed for the life of the process through [`ServerConfig`]:
//!
//! - **read timeout** (5 s): applied twice, once by hyper to the request
//!   head and once more to collecting the body. A request may therefore
//!   spend up to twice this long being read; each phase on its own is
//!   bounded by it.
//! - **write timeout** (7 s): the handler must produce its response within
//!   this window. A handler that runs longer (the 5 s sleeper on a loaded
//!   box, say) has its connection closed with no response. That is expected,
//!   not a fault. The handler itself still runs to completion in its own
//!   task, so its latency is observed like any other request's.
//! - **max header size** (1 MiB).
//!
//! # Shutdown
//!
//! On SIGTERM or Ctrl-C the server stops accepting, lets every in-flight
//! connection task finish, then returns from [`Server::serve`].

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo, TokioTimer};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tokio::time::timeout;
use tracing::{debug, error, info, warn};

use crate::error::Error;
use crate::response::Response;
use crate::router::Router;

pub const DEFAULT_ADDR: &str = "0.0.0.0:8080";

/// Listen address and per-connection limits.
#[derive(Clone, Copy, Debug)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub max_header_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            read_timeout: Duration::from_secs(5),
            write_timeout: Duration::from_secs(7),
            max_header_bytes: 1 << 20,
        }
    }
}

impl ServerConfig {
    /// Default limits, listening on `addr`.
    pub fn with_addr(addr: &str) -> Result<Self, Error> {
        let addr = addr.parse().map_err(|source| Error::Addr { addr: addr.to_owned(), source })?;
        Ok(Self { addr, ..Self::default() })
    }
}

/// The HTTP server.
pub struct Server {
    config: ServerConfig,
}

impl Server {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Addr`] if `addr` is not a valid `host:port` string.
    ///
    /// ```rust,no_run
    /// use lapse::Server;
    /// let server = Server::bind("0.0.0.0:8080")?;
    /// # Ok::<(), lapse::Error>(())
    /// ```
    pub fn bind(addr: &str) -> Result<Self, Error> {
        ServerConfig::with_addr(addr).map(Self::new)
    }

    /// Binds, then serves `router` until SIGTERM or Ctrl-C and every
    /// in-flight request has completed.
    pub async fn serve(self, router: Router) -> Result<(), Error> {
        let listener = TcpListener::bind(self.config.addr).await?;
        self.serve_with(listener, router, shutdown_signal()).await
    }

    /// Serves `router` on an already bound `listener` until `shutdown`
    /// resolves, then drains in-flight connections.
    pub async fn serve_with(
        self,
        listener: TcpListener,
        router: Router,
        shutdown: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let router = Arc::new(router);
        let config = self.config;

        let mut conn = ConnBuilder::new(TokioExecutor::new());
        conn.http1()
            .timer(TokioTimer::new())
            .header_read_timeout(config.read_timeout)
            .max_buf_size(config.max_header_bytes);
        conn.http2()
            .timer(TokioTimer::new())
            .max_header_list_size(u32::try_from(config.max_header_bytes).unwrap_or(u32::MAX));
        let conn = Arc::new(conn);

        info!(addr = %listener.local_addr()?, "lapse listening");

        // Tracks every connection task so shutdown can wait for them.
        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                // Check shutdown first so a signal stops accepting at once,
                // even with more connections queued.
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

                    let router = Arc::clone(&router);
                    let conn = Arc::clone(&conn);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        // Called once per request on the connection.
                        let svc = service_fn(move |req| {
                            let router = Arc::clone(&router);
                            async move { handle(router, req, config).await }
                        });

                        if let Err(e) = conn.serve_connection(io, svc).await {
                            debug!(peer = %remote_addr, "connection closed: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the set stays small.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("lapse stopped");
        Ok(())
    }
}

// ── Request handling ──────────────────────────────────────────────────────────

/// Collects the body under the read timeout, then routes under the write
/// timeout. Missing the write deadline is the only error surfaced to hyper,
/// which then drops the connection.
///
/// Routing runs on its own task: when the deadline passes only the wait is
/// abandoned, and the handler (with its middleware) finishes detached.
async fn handle(
    router: Arc<Router>,
    req: hyper::Request<Incoming>,
    config: ServerConfig,
) -> Result<http::Response<Full<Bytes>>, Error> {
    let (parts, body) = req.into_parts();

    let body = match timeout(config.read_timeout, body.collect()).await {
        Ok(Ok(collected)) => collected.to_bytes(),
        Ok(Err(e)) => {
            debug!("request body: {e}");
            return Ok(Response::status(StatusCode::BAD_REQUEST).into_http());
        }
        Err(_) => return Ok(Response::status(StatusCode::REQUEST_TIMEOUT).into_http()),
    };

    let req = http::Request::from_parts(parts, body);
    let routed = tokio::spawn(async move { router.respond(req).await });
    match timeout(config.write_timeout, routed).await {
        Ok(Ok(resp)) => Ok(resp.into_http()),
        Ok(Err(e)) => {
            error!("handler task failed: {e}");
            Ok(Response::status(StatusCode::INTERNAL_SERVER_ERROR).into_http())
        }
        Err(_) => {
            warn!(timeout = ?config.write_timeout, "handler overran write timeout; dropping response");
            Err(Error::WriteTimeout(config.write_timeout))
        }
    }
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first SIGTERM (Unix) or Ctrl-C.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("cannot listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("cannot listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c  => {}
        () = sigterm => {}
    }
}
