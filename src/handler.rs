//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! The router holds handlers of *different* types in one table, and
//! middleware wraps handlers it knows nothing about. Both work on trait
//! objects (`dyn ErasedHandler`) behind a cheap, clonable [`BoxedHandler`].
//!
//! ```text
//! async fn sleep_1s(req: Request) -> Response { … }   ← user writes this
//!        ↓ chain.then(sleep_1s)
//! sleep_1s.into_boxed_handler()                       ← Handler blanket impl
//!        ↓
//! BoxedHandler(Arc::new(FnHandler(sleep_1s)))
//!        ↓ middleware.wrap(boxed)                      ← one layer per middleware
//! BoxedHandler(Arc::new(Recorded { next, .. }))
//!        ↓ handler.call(req) at request time
//! Box::pin(async { … })                               ← BoxFuture
//! ```
//!
//! The runtime cost per layer is one virtual call and one boxed future.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// `Send + 'static` let tokio move the future across worker threads.
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// Object-safe dispatch interface.
///
/// Implement this to write a middleware layer: hold the next
/// [`BoxedHandler`] and decide what happens around calling it.
pub trait ErasedHandler: Send + Sync + 'static {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A type-erased handler shared across concurrent requests.
///
/// Cloning bumps a reference count; the handler itself is never copied.
#[derive(Clone)]
pub struct BoxedHandler(Arc<dyn ErasedHandler>);

impl BoxedHandler {
    pub fn new(handler: impl ErasedHandler) -> Self {
        Self(Arc::new(handler))
    }

    pub fn call(&self, req: Request) -> BoxFuture {
        self.0.call(req)
    }
}

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid route handler.
///
/// Satisfied by any `async fn` (or closure) with the signature
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// and by [`BoxedHandler`] itself, so wrapped handlers can be registered
/// the same way as plain functions. The trait is sealed.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        BoxedHandler::new(FnHandler(self))
    }
}

impl private::Sealed for BoxedHandler {}

impl Handler for BoxedHandler {
    fn into_boxed_handler(self) -> BoxedHandler { self }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// Bridges a concrete handler function to [`ErasedHandler`].
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    async fn hello(_req: Request) -> &'static str {
        "hello"
    }

    #[tokio::test]
    async fn async_fn_becomes_boxed_handler() {
        let handler = hello.into_boxed_handler();
        let req = http::Request::builder().uri("/").body(Bytes::new()).unwrap();
        let resp = handler.call(req.into()).await;
        assert_eq!(resp.body(), b"hello");
    }

    #[tokio::test]
    async fn boxed_handler_round_trips_through_handler() {
        let boxed = hello.into_boxed_handler();
        let again = boxed.clone().into_boxed_handler();
        let req = http::Request::builder().uri("/").body(Bytes::new()).unwrap();
        assert_eq!(again.call(req.into()).await.body(), b"hello");
    }
}
