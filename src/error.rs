//! Unified error type.

use std::net::AddrParseError;
use std::time::Duration;

/// The error type returned by lapse's fallible operations.
///
/// Application-level outcomes (404, 401, etc.) are expressed as HTTP
/// [`Response`](crate::Response) values, not as `Error`s. This type surfaces
/// startup misconfiguration and infrastructure failures: a bad route table,
/// an unusable listen address, metric registration, socket I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid listen address `{addr}`: {source}")]
    Addr {
        addr: String,
        #[source]
        source: AddrParseError,
    },

    #[error("route pattern must not be empty")]
    EmptyPattern,

    #[error("route pattern `{0}` is already registered")]
    DuplicatePattern(String),

    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("metrics: {0}")]
    Metrics(#[from] prometheus::Error),

    /// The handler did not finish inside the server's write timeout; the
    /// connection is closed without a response.
    #[error("response not produced within {0:?}")]
    WriteTimeout(Duration),
}
