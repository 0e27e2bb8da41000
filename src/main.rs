//! Demo server binary.
//!
//! Run with:
//!   RUST_LOG=info cargo run
//!
//! Try:
//!   curl http://localhost:8080/1s
//!   curl http://localhost:8080/anything
//!   curl -u instrument:everything http://localhost:8080/metrics

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lapse::{DEFAULT_ADDR, Metrics, Server, app};

#[derive(Parser, Debug)]
#[command(name = "lapse", version, about = "Instrumented demo HTTP server")]
struct Cli {
    /// Address to listen on
    #[arg(long, default_value = DEFAULT_ADDR)]
    addr: String,
}

#[tokio::main]
async fn main() -> Result<(), lapse::Error> {
    // stdout carries the access log; diagnostics go to stderr.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let metrics = Metrics::new()?;
    let router = app::router(&metrics)?;

    Server::bind(&cli.addr)?.serve(router).await
}
