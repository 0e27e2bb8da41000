//! Middleware layer.
//!
//! Middleware intercepts requests and responses and is the right place for
//! cross-cutting concerns: access logging, latency metrics, authentication.
//!
//! A [`Middleware`] turns one [`BoxedHandler`] into another. A [`Chain`] is a
//! fixed, ordered list of them applied once, at route-registration time:
//!
//! ```rust,no_run
//! use lapse::middleware::{AccessLog, Chain, LatencyRecorder};
//! use lapse::{Metrics, Router, demo};
//!
//! # fn build() -> Result<Router, lapse::Error> {
//! let metrics = Metrics::new()?;
//! let chain = Chain::new()
//!     .with(LatencyRecorder::new(metrics.clone()))
//!     .with(AccessLog::stdout());
//!
//! Router::new().named("1s", "1s", chain.then(demo::sleep_1s))
//! # }
//! ```
//!
//! The first middleware added is the outermost: above, the latency clock
//! starts before the access record is written.

mod access_log;
mod auth;
mod latency;

use std::sync::Arc;

pub use access_log::AccessLog;
pub use auth::BasicAuth;
pub use latency::LatencyRecorder;

use crate::handler::{BoxedHandler, Handler};

/// A handler transformer.
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;
}

/// An ordered list of middleware, outermost first.
#[derive(Clone, Default)]
pub struct Chain {
    layers: Vec<Arc<dyn Middleware>>,
}

impl Chain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `middleware` inside every layer added so far.
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        self.layers.push(Arc::new(middleware));
        self
    }

    /// Wraps `handler` in every layer of the chain.
    pub fn then(&self, handler: impl Handler) -> BoxedHandler {
        self.layers
            .iter()
            .rev()
            .fold(handler.into_boxed_handler(), |next, layer| layer.wrap(next))
    }
}
