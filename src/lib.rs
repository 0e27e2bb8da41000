//! # lapse
//!
//! A small instrumented HTTP server. A handful of static routes either
//! answer at once or sleep for a fixed time; every named route is timed into
//! a Prometheus histogram; the exposition endpoint sits behind HTTP Basic
//! authentication.
//!
//! ## Request path
//!
//! ```text
//! request ─► Router ──► [BasicAuth] ─► LatencyRecorder ─► AccessLog ─► handler
//!              │ no match                 └─ observe API{endpoint=<route>} after
//!              └─► 404
//! ```
//!
//! - [`Router`] picks the route (exact path, else the `*` wildcard) and
//!   stamps the request with the route's name.
//! - [`middleware::Chain`] is a fixed list of layers applied when a route is
//!   registered.
//! - [`Metrics`] is built once and handed to whatever records or exposes it.
//!
//! Requests that match nothing, and requests to unnamed routes such as
//! `/metrics`, are never observed. This keeps the `endpoint` label set equal
//! to the set of named routes; do not add a fallback label.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use lapse::{Metrics, Server, app};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), lapse::Error> {
//!     let metrics = Metrics::new()?;
//!     let router = app::router(&metrics)?;
//!     Server::bind("0.0.0.0:8080")?.serve(router).await
//! }
//! ```

mod error;
mod handler;
mod metrics;
mod request;
mod response;
mod router;
mod server;

pub mod app;
pub mod demo;
pub mod middleware;

pub use error::Error;
pub use handler::{BoxFuture, BoxedHandler, ErasedHandler, Handler};
pub use metrics::{API_BUCKETS, API_HISTOGRAM, ENDPOINT_LABEL, Metrics};
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::{Matched, Router, WILDCARD};
pub use server::{DEFAULT_ADDR, Server, ServerConfig};
