//! Per-route latency histogram.

use tokio::time::Instant;

use super::Middleware;
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::metrics::Metrics;
use crate::request::Request;

/// Observes how long the wrapped handler took, labelled with the route name.
///
/// Requests without a route name are not observed at all. Unmatched paths
/// and unnamed routes therefore never create a series, which keeps the
/// `endpoint` label bounded by the routing table.
#[derive(Clone)]
pub struct LatencyRecorder {
    metrics: Metrics,
}

impl LatencyRecorder {
    pub fn new(metrics: Metrics) -> Self {
        Self { metrics }
    }
}

impl Middleware for LatencyRecorder {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        BoxedHandler::new(Recorded { metrics: self.metrics.clone(), next })
    }
}

struct Recorded {
    metrics: Metrics,
    next: BoxedHandler,
}

impl ErasedHandler for Recorded {
    fn call(&self, req: Request) -> BoxFuture {
        let started = Instant::now();
        let route = req.route.clone();
        let metrics = self.metrics.clone();
        let fut = self.next.call(req);
        Box::pin(async move {
            let resp = fut.await;
            if let Some(route) = route {
                metrics.observe(&route, started.elapsed());
            }
            resp
        })
    }
}
