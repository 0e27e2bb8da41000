//! The demo routing table.
//!
//! | Path | Route name | Chain |
//! |---|---|---|
//! | `/metrics` | none | Basic auth only |
//! | `*` | `catch-all` | latency + access log |
//! | `1s` / `3s` / `5s` | same as path | latency + access log |
//!
//! `/metrics` sits outside the chain and has no route name, so neither
//! scrapes nor rejected scrapes are logged or observed. Unmatched paths are
//! absorbed by `catch-all`. Both omissions keep the `endpoint` label bounded
//! and are deliberate.

use std::io::Write;

use crate::demo;
use crate::error::Error;
use crate::metrics::Metrics;
use crate::middleware::{AccessLog, BasicAuth, Chain, LatencyRecorder, Middleware};
use crate::router::{Router, WILDCARD};

pub const METRICS_USER: &str = "instrument";
pub const METRICS_PASSWORD: &str = "everything";
pub const METRICS_REALM: &str = "metrics";

/// Builds the routing table with access records going to stdout.
pub fn router(metrics: &Metrics) -> Result<Router, Error> {
    build(metrics, AccessLog::stdout())
}

/// Same table, access records written to `sink`.
pub fn router_with_sink(
    metrics: &Metrics,
    sink: impl Write + Send + 'static,
) -> Result<Router, Error> {
    build(metrics, AccessLog::new(sink))
}

fn build(metrics: &Metrics, access_log: AccessLog) -> Result<Router, Error> {
    let chain = Chain::new()
        .with(LatencyRecorder::new(metrics.clone()))
        .with(access_log);
    let auth = BasicAuth::new(METRICS_USER, METRICS_PASSWORD, METRICS_REALM);

    Router::new()
        .route("/metrics", auth.wrap(metrics.handler()))?
        .named(WILDCARD, "catch-all", chain.then(demo::catch_all))?
        .named("1s", "1s", chain.then(demo::sleep_1s))?
        .named("3s", "3s", chain.then(demo::sleep_3s))?
        .named("5s", "5s", chain.then(demo::sleep_5s))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use base64::Engine as _;
    use base64::engine::general_purpose::STANDARD;
    use bytes::Bytes;
    use http::StatusCode;

    use super::*;

    async fn scrape(router: &Router) -> crate::Response {
        let auth = format!(
            "Basic {}",
            STANDARD.encode(format!("{METRICS_USER}:{METRICS_PASSWORD}"))
        );
        let req = http::Request::builder()
            .uri("/metrics")
            .header("authorization", auth)
            .body(Bytes::new())
            .unwrap();
        router.respond(req).await
    }

    #[tokio::test(start_paused = true)]
    async fn one_second_route_is_bucketed_at_one() {
        let metrics = Metrics::new().unwrap();
        let router = router_with_sink(&metrics, std::io::sink()).unwrap();

        const N: usize = 4;
        for _ in 0..N {
            assert_eq!(router.get("/1s").await.body(), b"sleeping 1 second");
        }

        let resp = scrape(&router).await;
        assert_eq!(resp.status_code(), StatusCode::OK);
        let text = std::str::from_utf8(resp.body()).unwrap();
        assert!(text.contains(&format!(r#"API_count{{endpoint="1s"}} {N}"#)), "{text}");
        assert!(text.contains(&format!(r#"API_bucket{{endpoint="1s",le="1"}} {N}"#)), "{text}");
        assert!(text.contains(r#"API_bucket{endpoint="1s",le="0.5"} 0"#), "{text}");
    }

    #[tokio::test(start_paused = true)]
    async fn every_sleeper_lands_in_its_bucket() {
        let metrics = Metrics::new().unwrap();
        let router = router_with_sink(&metrics, std::io::sink()).unwrap();

        assert_eq!(router.get("/3s").await.body(), b"sleeping 3 seconds");
        assert_eq!(router.get("/5s").await.body(), b"sleeping 5 second");

        let text = metrics.render().unwrap();
        assert!(text.contains(r#"API_bucket{endpoint="3s",le="1"} 0"#), "{text}");
        assert!(text.contains(r#"API_bucket{endpoint="3s",le="3"} 1"#), "{text}");
        assert!(text.contains(r#"API_bucket{endpoint="5s",le="3"} 0"#), "{text}");
        assert!(text.contains(r#"API_bucket{endpoint="5s",le="5"} 1"#), "{text}");
    }

    #[tokio::test]
    async fn unknown_paths_are_caught_all() {
        let metrics = Metrics::new().unwrap();
        let router = router_with_sink(&metrics, std::io::sink()).unwrap();

        for path in ["/unknown", "/", "/1s/extra", "/2s"] {
            let resp = router.get(path).await;
            assert_eq!(resp.body(), b"I'm catching all\n", "{path}");
        }
        assert_eq!(metrics.endpoints(), ["catch-all"]);
    }

    #[tokio::test]
    async fn metrics_requires_credentials_and_is_never_observed() {
        let metrics = Metrics::new().unwrap();
        let router = router_with_sink(&metrics, std::io::sink()).unwrap();

        let resp = router.get("/metrics").await;
        assert_eq!(resp.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.header("www-authenticate"), Some(r#"Basic realm="metrics""#));

        assert_eq!(scrape(&router).await.status_code(), StatusCode::OK);
        assert!(metrics.endpoints().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn requests_do_not_block_each_other() {
        let metrics = Metrics::new().unwrap();
        let router = std::sync::Arc::new(router_with_sink(&metrics, std::io::sink()).unwrap());
        let start = tokio::time::Instant::now();

        let mut tasks = tokio::task::JoinSet::new();
        for path in ["/5s", "/3s", "/1s", "/now"] {
            let router = router.clone();
            tasks.spawn(async move {
                router.get(path).await;
                (path, start.elapsed())
            });
        }

        let mut finished = Vec::new();
        while let Some(done) = tasks.join_next().await {
            finished.push(done.unwrap());
        }
        finished.sort_by_key(|(_, elapsed)| *elapsed);

        let order: Vec<_> = finished.iter().map(|(path, _)| *path).collect();
        assert_eq!(order, ["/now", "/1s", "/3s", "/5s"]);
        // Run side by side: the slowest sets the total, not the sum.
        assert_eq!(finished[3].1, Duration::from_secs(5));
    }
}
