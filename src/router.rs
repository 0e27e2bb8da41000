//! Static request router.
//!
//! Exact paths live in a radix tree; one optional wildcard route (`*`)
//! catches everything else. A route may carry a symbolic name, which is
//! handed to downstream middleware as part of the dispatch result.

use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use matchit::{InsertError, Router as MatchitRouter};

use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::request::Request;
use crate::response::Response;

/// Pattern that matches any path without an exact registration.
pub const WILDCARD: &str = "*";

#[derive(Clone)]
struct Route {
    handler: BoxedHandler,
    name: Option<Arc<str>>,
}

/// Outcome of a successful [`Router::dispatch`].
pub struct Matched {
    pub handler: BoxedHandler,
    pub name: Option<Arc<str>>,
}

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Registration methods take and return `self` so they chain with `?`:
///
/// ```rust,no_run
/// # use lapse::{Router, demo};
/// # fn build() -> Result<Router, lapse::Error> {
/// let router = Router::new()
///     .named("*",  "catch-all", demo::catch_all)?
///     .named("1s", "1s",        demo::sleep_1s)?;
/// # Ok(router)
/// # }
/// ```
pub struct Router {
    exact: MatchitRouter<Route>,
    wildcard: Option<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self { exact: MatchitRouter::new(), wildcard: None }
    }

    /// Registers an unnamed route. Requests it serves carry no route name, so
    /// name-keyed middleware ignores them.
    pub fn route(self, pattern: &str, handler: impl Handler) -> Result<Self, Error> {
        self.add(pattern, None, handler)
    }

    /// Registers a route under a symbolic `name`.
    pub fn named(self, pattern: &str, name: &str, handler: impl Handler) -> Result<Self, Error> {
        self.add(pattern, Some(Arc::from(name)), handler)
    }

    fn add(
        mut self,
        pattern: &str,
        name: Option<Arc<str>>,
        handler: impl Handler,
    ) -> Result<Self, Error> {
        let route = Route { handler: handler.into_boxed_handler(), name };

        if pattern == WILDCARD {
            if self.wildcard.is_some() {
                return Err(Error::DuplicatePattern(pattern.to_owned()));
            }
            self.wildcard = Some(route);
            return Ok(self);
        }

        let key = normalize(pattern);
        if key == "/" {
            return Err(Error::EmptyPattern);
        }
        // matchit reads braces as parameters; routes here are literal.
        if key.contains(['{', '}']) {
            return Err(Error::InvalidPattern {
                pattern: pattern.to_owned(),
                reason: "braces are not allowed in a static route".to_owned(),
            });
        }

        self.exact.insert(key, route).map_err(|e| match e {
            InsertError::Conflict { .. } => Error::DuplicatePattern(pattern.to_owned()),
            other => Error::InvalidPattern {
                pattern: pattern.to_owned(),
                reason: other.to_string(),
            },
        })?;
        Ok(self)
    }

    /// Finds the route for `path`: exact match first, then the wildcard.
    pub fn dispatch(&self, path: &str) -> Option<Matched> {
        let route = match self.exact.at(&normalize(path)) {
            Ok(matched) => matched.value,
            Err(_) => self.wildcard.as_ref()?,
        };
        Some(Matched { handler: route.handler.clone(), name: route.name.clone() })
    }

    /// Routes one request and produces one response. Unmatched paths get a
    /// bare `404` and never reach any handler or middleware.
    pub async fn respond(&self, req: impl Into<Request>) -> Response {
        let req = req.into();
        match self.dispatch(req.path()) {
            Some(Matched { handler, name }) => handler.call(req.with_route(name)).await,
            None => Response::status(StatusCode::NOT_FOUND),
        }
    }

    /// Convenience for tests and tools: route a bodiless request for `uri`.
    pub async fn get(&self, uri: &str) -> Response {
        match http::Request::builder().uri(uri).body(Bytes::new()) {
            Ok(req) => self.respond(req).await,
            Err(_) => Response::status(StatusCode::BAD_REQUEST),
        }
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

/// `1s`, `/1s` and `/1s/` all name the same route.
fn normalize(path: &str) -> String {
    format!("/{}", path.trim_matches('/'))
}
