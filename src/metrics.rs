//! Prometheus metrics collector and exposition handler.
//!
//! # Metrics
//! - `API` (histogram, label `endpoint`): request latency in seconds per
//!   named route, buckets 0.5 / 1 / 3 / 5 / 7.
//! - `process_*` (Linux only): CPU, memory, file descriptors of this process.
//!
//! The metric name, label name and buckets are what dashboards key on; they
//! do not change.
//!
//! There is no global registry. [`Metrics::new`] builds one and every
//! component that records or exposes metrics is handed a clone.

use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use prometheus::{Encoder, HistogramOpts, HistogramVec, Registry, TextEncoder};
use tracing::error;

use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::{ContentType, Response};

pub const API_HISTOGRAM: &str = "API";
pub const ENDPOINT_LABEL: &str = "endpoint";
pub const API_BUCKETS: [f64; 5] = [0.5, 1.0, 3.0, 5.0, 7.0];

/// Metrics collector for the server.
///
/// Clones share the same registry and series.
#[derive(Clone)]
pub struct Metrics {
    registry: Arc<Registry>,
    api: HistogramVec,
}

impl Metrics {
    /// Creates a registry and registers every metric in it.
    ///
    /// # Errors
    ///
    /// Returns an error if a metric is rejected by the registry.
    pub fn new() -> Result<Self, Error> {
        let registry = Registry::new();

        let api = HistogramVec::new(
            HistogramOpts::new(API_HISTOGRAM, "Request latency in seconds by endpoint.")
                .buckets(API_BUCKETS.to_vec()),
            &[ENDPOINT_LABEL],
        )?;
        registry.register(Box::new(api.clone()))?;

        #[cfg(target_os = "linux")]
        registry.register(Box::new(prometheus::process_collector::ProcessCollector::for_self()))?;

        Ok(Self { registry: Arc::new(registry), api })
    }

    /// Records one request of `elapsed` against `endpoint`.
    pub fn observe(&self, endpoint: &str, elapsed: Duration) {
        self.api
            .with_label_values(&[endpoint])
            .observe(elapsed.as_secs_f64());
    }

    /// Renders every registered metric in the Prometheus text format.
    pub fn render(&self) -> Result<String, Error> {
        let mut buffer = Vec::new();
        TextEncoder::new().encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| Error::Metrics(prometheus::Error::Msg(e.to_string())))
    }

    /// Endpoint labels that have at least one observation, in exposition order.
    pub fn endpoints(&self) -> Vec<String> {
        self.registry
            .gather()
            .iter()
            .filter(|family| family.name() == API_HISTOGRAM)
            .flat_map(|family| family.get_metric())
            .flat_map(|metric| metric.get_label())
            .filter(|pair| pair.name() == ENDPOINT_LABEL)
            .map(|pair| pair.value().to_owned())
            .collect()
    }

    /// Handler serving [`render`](Self::render) output.
    pub fn handler(&self) -> BoxedHandler {
        let metrics = self.clone();
        let serve = move |_req: Request| {
            let metrics = metrics.clone();
            async move {
                match metrics.render() {
                    Ok(body) => Response::builder().bytes(ContentType::Prometheus, body),
                    Err(e) => {
                        error!("metrics exposition failed: {e}");
                        Response::status(StatusCode::INTERNAL_SERVER_ERROR)
                    }
                }
            }
        };
        serve.into_boxed_handler()
    }
}
