//! One JSON access record per request.
//!
//! ```text
//! {"Host":"localhost:8080","Time":"2026-10-16T09:14:02Z","UA":"curl/8.5.0","URL":"/1s"}
//! ```

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::warn;

use super::Middleware;
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::request::Request;

type Sink = Arc<Mutex<Box<dyn Write + Send>>>;

#[derive(Serialize)]
struct Record<'a> {
    #[serde(rename = "Host")]
    host: &'a str,
    #[serde(rename = "Time")]
    time: String,
    #[serde(rename = "UA")]
    user_agent: &'a str,
    #[serde(rename = "URL")]
    url: &'a str,
}

/// Writes an access record before the wrapped handler runs.
///
/// Every record is serialised in full and written with a single locked
/// `write_all`, so concurrent requests never interleave inside a line.
/// Failures are reported through `tracing` and otherwise ignored: the
/// request is served whether or not its record made it out.
#[derive(Clone)]
pub struct AccessLog {
    sink: Sink,
}

impl AccessLog {
    pub fn new(sink: impl Write + Send + 'static) -> Self {
        Self { sink: Arc::new(Mutex::new(Box::new(sink))) }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    fn emit(&self, req: &Request) {
        let url = req.uri().path_and_query().map_or("/", |pq| pq.as_str());
        let record = Record {
            host: req.host(),
            time: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            user_agent: req.header("user-agent").unwrap_or(""),
            url,
        };

        let mut line = match serde_json::to_vec(&record) {
            Ok(line) => line,
            Err(e) => {
                warn!("access record not serialised: {e}");
                return;
            }
        };
        line.push(b'\n');

        let Ok(mut sink) = self.sink.lock() else {
            warn!("access log sink poisoned");
            return;
        };
        if let Err(e) = sink.write_all(&line).and_then(|()| sink.flush()) {
            warn!("access record not written: {e}");
        }
    }
}

impl Middleware for AccessLog {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        BoxedHandler::new(Logged { log: self.clone(), next })
    }
}

struct Logged {
    log: AccessLog,
    next: BoxedHandler,
}

impl ErasedHandler for Logged {
    fn call(&self, req: Request) -> BoxFuture {
        let log = self.log.clone();
        let next = self.next.clone();
        Box::pin(async move {
            log.emit(&req);
            next.call(req).await
        })
    }
}
