//! Demonstration handlers.
//!
//! One answers immediately; the others hold their request for a fixed time
//! so the latency histogram has something to bucket. The sleeps yield to the
//! runtime, so a sleeping request never holds up any other.

use std::time::Duration;

use crate::request::Request;

pub async fn catch_all(_req: Request) -> &'static str {
    "I'm catching all\n"
}

pub async fn sleep_1s(_req: Request) -> &'static str {
    tokio::time::sleep(Duration::from_secs(1)).await;
    "sleeping 1 second"
}

pub async fn sleep_3s(_req: Request) -> &'static str {
    tokio::time::sleep(Duration::from_secs(3)).await;
    "sleeping 3 seconds"
}

// Body text is matched by existing clients; keep it as is.
pub async fn sleep_5s(_req: Request) -> &'static str {
    tokio::time::sleep(Duration::from_secs(5)).await;
    "sleeping 5 second"
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;
    use tokio::time::Instant;

    use super::*;

    fn request() -> Request {
        http::Request::builder().uri("/").body(Bytes::new()).unwrap().into()
    }

    #[tokio::test(start_paused = true)]
    async fn sleepers_take_their_time() {
        let start = Instant::now();
        assert_eq!(sleep_3s(request()).await, "sleeping 3 seconds");
        assert_eq!(start.elapsed(), Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn catch_all_is_immediate() {
        let start = Instant::now();
        assert_eq!(catch_all(request()).await, "I'm catching all\n");
        assert_eq!(start.elapsed(), Duration::ZERO);
    }
}
