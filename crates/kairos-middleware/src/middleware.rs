//! Core middleware trait and types.
//!
//! A middleware receives the owned [`RequestContext`] and a [`Next`] handle
//! for the rest of the chain. It may run code before and after awaiting
//! `next`, or return early without calling it at all.
//!
//! # Example
//!
//! ```
//! use kairos_core::{RequestContext, Response};
//! use kairos_middleware::{BoxFuture, Middleware, Next};
//!
//! struct Logging;
//!
//! impl Middleware for Logging {
//!     fn name(&self) -> &'static str {
//!         "logging"
//!     }
//!
//!     fn process<'a>(&'a self, ctx: RequestContext, next: Next<'a>) -> BoxFuture<'a, Response> {
//!         Box::pin(async move {
//!             let path = ctx.path().to_owned();
//!             let response = next.run(ctx).await;
//!             println!("{path} -> {}", response.status());
//!             response
//!         })
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use kairos_core::{RequestContext, Response};

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A shared, type-erased middleware.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// The terminal stage of a pipeline: the adapted user handler.
pub type Endpoint = Arc<dyn Fn(RequestContext) -> BoxFuture<'static, Response> + Send + Sync>;

/// The core middleware trait.
///
/// `next` is consumed by [`Next::run`], so it can be invoked at most once.
pub trait Middleware: Send + Sync + 'static {
    /// Returns the name of this middleware, used in logs.
    fn name(&self) -> &'static str;

    /// Processes the request, optionally delegating to `next`.
    fn process<'a>(&'a self, ctx: RequestContext, next: Next<'a>) -> BoxFuture<'a, Response>;
}

/// Handle to the remainder of the chain.
pub struct Next<'a> {
    middleware: &'a [BoxedMiddleware],
    endpoint: &'a Endpoint,
}

impl<'a> Next<'a> {
    pub(crate) fn new(middleware: &'a [BoxedMiddleware], endpoint: &'a Endpoint) -> Self {
        Self {
            middleware,
            endpoint,
        }
    }

    /// Invokes the next middleware, or the endpoint when none remain.
    pub async fn run(self, ctx: RequestContext) -> Response {
        match self.middleware.split_first() {
            Some((current, rest)) => {
                current
                    .process(ctx, Next::new(rest, self.endpoint))
                    .await
            }
            None => (self.endpoint)(ctx).await,
        }
    }

    /// Number of middleware still ahead of the endpoint.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.middleware.len()
    }
}

/// A middleware built from a closure.
///
/// The closure returns a boxed future borrowing the `Next` handle.
///
/// ```
/// use kairos_middleware::FnMiddleware;
///
/// let timing = FnMiddleware::new("timing", |ctx, next| {
///     Box::pin(async move {
///         let start = std::time::Instant::now();
///         let response = next.run(ctx).await;
///         tracing::debug!(elapsed = ?start.elapsed(), "request finished");
///         response
///     })
/// });
/// ```
pub struct FnMiddleware<F> {
    name: &'static str,
    func: F,
}

impl<F> FnMiddleware<F>
where
    F: for<'a> Fn(RequestContext, Next<'a>) -> BoxFuture<'a, Response> + Send + Sync + 'static,
{
    /// Creates a new function-based middleware.
    pub const fn new(name: &'static str, func: F) -> Self {
        Self { name, func }
    }
}

impl<F> Middleware for FnMiddleware<F>
where
    F: for<'a> Fn(RequestContext, Next<'a>) -> BoxFuture<'a, Response> + Send + Sync + 'static,
{
    fn name(&self) -> &'static str {
        self.name
    }

    fn process<'a>(&'a self, ctx: RequestContext, next: Next<'a>) -> BoxFuture<'a, Response> {
        (self.func)(ctx, next)
    }
}

/// Wraps an async closure as an [`Endpoint`].
pub fn endpoint<F, Fut>(f: F) -> Endpoint
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |ctx| Box::pin(f(ctx)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use kairos_core::{ConnectionInfo, ResponseExt};

    fn request() -> RequestContext {
        let request = http::Request::get("/test")
            .body(http_body_util::Empty::<bytes::Bytes>::new())
            .unwrap();
        RequestContext::from_request(request, ConnectionInfo::default())
    }

    struct Tag(&'static str);

    impl Middleware for Tag {
        fn name(&self) -> &'static str {
            self.0
        }

        fn process<'a>(&'a self, ctx: RequestContext, next: Next<'a>) -> BoxFuture<'a, Response> {
            Box::pin(async move {
                let mut response = next.run(ctx).await;
                response
                    .headers_mut()
                    .append("x-tag", http::HeaderValue::from_static(self.0));
                response
            })
        }
    }

    #[tokio::test]
    async fn test_next_without_middleware_calls_endpoint() {
        let ep = endpoint(|_ctx| async { Response::text(StatusCode::OK, "OK") });
        let next = Next::new(&[], &ep);
        assert_eq!(next.remaining(), 0);

        let response = next.run(request()).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_chain_unwinds_in_reverse() {
        let ep = endpoint(|_ctx| async { Response::empty(StatusCode::OK) });
        let chain: Vec<BoxedMiddleware> = vec![Arc::new(Tag("outer")), Arc::new(Tag("inner"))];

        let response = Next::new(&chain, &ep).run(request()).await;
        let tags: Vec<_> = response.headers().get_all("x-tag").iter().collect();
        assert_eq!(tags, vec!["inner", "outer"]);
    }

    #[tokio::test]
    async fn test_fn_middleware_short_circuit() {
        let ep = endpoint(|_ctx| async { Response::empty(StatusCode::OK) });
        let deny = FnMiddleware::new("deny", |_ctx, _next| {
            Box::pin(async { Response::empty(StatusCode::FORBIDDEN) })
        });
        assert_eq!(deny.name(), "deny");

        let chain: Vec<BoxedMiddleware> = vec![Arc::new(deny)];
        let response = Next::new(&chain, &ep).run(request()).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }
}
