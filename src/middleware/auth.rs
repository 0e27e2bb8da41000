//! HTTP Basic authentication gate.

use std::sync::Arc;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use http::StatusCode;

use super::Middleware;
use crate::handler::{BoxFuture, BoxedHandler, ErasedHandler};
use crate::request::Request;
use crate::response::Response;

struct Credentials {
    username: Vec<u8>,
    password: Vec<u8>,
    challenge: String,
}

/// Lets a request through only if it presents the configured Basic
/// credentials; everything else gets `401` with a `WWW-Authenticate`
/// challenge and never reaches the wrapped handler.
#[derive(Clone)]
pub struct BasicAuth {
    credentials: Arc<Credentials>,
}

impl BasicAuth {
    pub fn new(username: &str, password: &str, realm: &str) -> Self {
        Self {
            credentials: Arc::new(Credentials {
                username: username.as_bytes().to_vec(),
                password: password.as_bytes().to_vec(),
                challenge: format!(r#"Basic realm="{realm}""#),
            }),
        }
    }

    /// Both halves are always compared, so a wrong username costs as much as
    /// a wrong password.
    fn accepts(&self, req: &Request) -> bool {
        let Some((user, pass)) = req.header("authorization").and_then(parse_basic) else {
            return false;
        };
        let user_ok = constant_time_eq(&self.credentials.username, &user);
        let pass_ok = constant_time_eq(&self.credentials.password, &pass);
        user_ok & pass_ok
    }

    fn challenge(&self) -> Response {
        Response::builder()
            .status(StatusCode::UNAUTHORIZED)
            .header("www-authenticate", &self.credentials.challenge)
            .text("Unauthorized.\n")
    }
}

impl Middleware for BasicAuth {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        BoxedHandler::new(Gated { auth: self.clone(), next })
    }
}

struct Gated {
    auth: BasicAuth,
    next: BoxedHandler,
}

impl ErasedHandler for Gated {
    fn call(&self, req: Request) -> BoxFuture {
        if !self.auth.accepts(&req) {
            let denied = self.auth.challenge();
            return Box::pin(async move { denied });
        }
        self.next.call(req)
    }
}

/// Splits `Basic <base64(user:pass)>` into its two halves. The scheme name
/// is case-insensitive; the password may itself contain `:`.
fn parse_basic(header: &str) -> Option<(Vec<u8>, Vec<u8>)> {
    let (scheme, encoded) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("basic") {
        return None;
    }
    let decoded = STANDARD.decode(encoded).ok()?;
    let colon = decoded.iter().position(|&b| b == b':')?;
    Some((decoded[..colon].to_vec(), decoded[colon + 1..].to_vec()))
}

/// Compares `supplied` against `expected` without early exit.
///
/// The loop always runs over `expected`, so the time taken depends only on
/// the configured secret: neither the supplied length nor how many leading
/// bytes match is observable.
fn constant_time_eq(expected: &[u8], supplied: &[u8]) -> bool {
    let mut diff = expected.len() ^ supplied.len();
    for (i, &byte) in expected.iter().enumerate() {
        let other = supplied.get(i).copied().unwrap_or(!byte);
        diff |= usize::from(byte ^ other);
    }
    std::hint::black_box(diff) == 0
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use bytes::Bytes;

    use super::*;
    use crate::handler::Handler;

    async fn secret(_req: Request) -> &'static str { "secret" }

    fn gate() -> BoxedHandler {
        BasicAuth::new("instrument", "everything", "metrics").wrap(secret.into_boxed_handler())
    }

    fn request(authorization: Option<&str>) -> Request {
        let mut builder = http::Request::builder().uri("/metrics");
        if let Some(value) = authorization {
            builder = builder.header("authorization", value);
        }
        builder.body(Bytes::new()).unwrap().into()
    }

    fn basic(user: &str, pass: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{user}:{pass}")))
    }

    fn assert_challenged(resp: &Response) {
        assert_eq!(resp.status_code(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.header("www-authenticate"), Some(r#"Basic realm="metrics""#));
        assert_eq!(resp.body(), b"Unauthorized.\n");
    }

    #[tokio::test]
    async fn correct_credentials_pass_through() {
        let resp = gate().call(request(Some(&basic("instrument", "everything")))).await;
        assert_eq!(resp.status_code(), StatusCode::OK);
        assert_eq!(resp.body(), b"secret");
        assert!(resp.header("www-authenticate").is_none());
    }

    #[tokio::test]
    async fn scheme_is_case_insensitive() {
        let header = basic("instrument", "everything").replacen("Basic", "bAsIc", 1);
        let resp = gate().call(request(Some(&header))).await;
        assert_eq!(resp.status_code(), StatusCode::OK);
    }

    #[tokio::test]
    async fn missing_credentials_are_challenged() {
        assert_challenged(&gate().call(request(None)).await);
    }

    #[tokio::test]
    async fn wrong_credentials_are_challenged() {
        let cases = [
            basic("instrument", "everythin"),
            basic("instrument", "everything!"),
            basic("Instrument", "everything"),
            basic("", ""),
            basic("instrument", ""),
            "Bearer abc".to_owned(),
            "Basic not-base64!!".to_owned(),
            format!("Basic {}", STANDARD.encode("no-colon")),
            "Basic".to_owned(),
        ];
        for header in cases {
            assert_challenged(&gate().call(request(Some(&header))).await);
        }
    }

    #[test]
    fn password_may_contain_colons() {
        let header = basic("user", "pa:ss:word");
        let (user, pass) = parse_basic(&header).unwrap();
        assert_eq!(user, b"user");
        assert_eq!(pass, b"pa:ss:word");
    }

    #[test]
    fn constant_time_eq_semantics() {
        assert!(constant_time_eq(b"everything", b"everything"));
        assert!(constant_time_eq(b"", b""));
        assert!(!constant_time_eq(b"everything", b"everythinG"));
        assert!(!constant_time_eq(b"everything", b"every"));
        assert!(!constant_time_eq(b"every", b"everything"));
        assert!(!constant_time_eq(b"", b"x"));
        assert!(!constant_time_eq(b"x", b""));
    }

    const EXPECTED: &[u8] = b"everything-everything-everything";
    const NEAR_MISS: &[u8] = b"everything-everything-everythinX";
    const FAR_MISS: &[u8] = b"Xverything-everything-everything";

    fn batch_time(expected: &[u8], supplied: &[u8]) -> Duration {
        let start = Instant::now();
        for _ in 0..2_000 {
            std::hint::black_box(constant_time_eq(
                std::hint::black_box(expected),
                std::hint::black_box(supplied),
            ));
        }
        start.elapsed()
    }

    /// Median near-miss time over median far-miss time. Batches alternate
    /// so drift in machine load hits both sides alike.
    fn near_far_ratio(rounds: usize) -> f64 {
        let (mut near, mut far) = (Vec::with_capacity(rounds), Vec::with_capacity(rounds));
        for _ in 0..rounds {
            near.push(batch_time(EXPECTED, NEAR_MISS));
            far.push(batch_time(EXPECTED, FAR_MISS));
        }
        near.sort();
        far.sort();
        near[rounds / 2].as_secs_f64() / far[rounds / 2].as_secs_f64()
    }

    #[test]
    fn comparison_time_ignores_matching_prefix() {
        // An early-exit compare would differ by ~32x here; the band only
        // has to rule that out on a noisy host.
        let ratio = near_far_ratio(401);
        assert!((0.5..2.0).contains(&ratio), "near/far ratio {ratio}");
    }

    #[test]
    #[ignore = "timing-sensitive; run on a quiet machine with --ignored"]
    fn comparison_time_ignores_matching_prefix_tightly() {
        let ratio = near_far_ratio(1_001);
        assert!((0.8..1.25).contains(&ratio), "near/far ratio {ratio}");
    }
}
