//! Per-route composed pipelines.
//!
//! A [`Pipeline`] is built once per route when the application is built.
//! Its middleware list is already in execution order (global, then scope
//! middleware from outermost to innermost, then route middleware), so
//! dispatch is a direct walk down a slice.

use std::fmt;
use std::sync::Arc;

use kairos_core::{RequestContext, Response};

use crate::middleware::{BoxFuture, BoxedMiddleware, Endpoint, Next};

/// A composed middleware chain terminating in an endpoint.
///
/// # Example
///
/// ```
/// use kairos_core::{ConnectionInfo, RequestContext, Response, ResponseExt};
/// use kairos_middleware::{endpoint, Pipeline};
///
/// # tokio_test::block_on(async {
/// let pipeline = Pipeline::new(
///     Vec::new(),
///     endpoint(|_ctx| async { Response::text(http::StatusCode::OK, "hi") }),
/// );
///
/// let request = http::Request::get("/")
///     .body(http_body_util::Empty::<bytes::Bytes>::new())
///     .unwrap();
/// let response = pipeline
///     .run(RequestContext::from_request(request, ConnectionInfo::default()))
///     .await;
/// assert_eq!(response.status(), http::StatusCode::OK);
/// # });
/// ```
#[derive(Clone)]
pub struct Pipeline {
    middleware: Arc<[BoxedMiddleware]>,
    endpoint: Endpoint,
}

impl Pipeline {
    /// Composes `middleware` (outermost first) around `endpoint`.
    #[must_use]
    pub fn new(middleware: Vec<BoxedMiddleware>, endpoint: Endpoint) -> Self {
        Self {
            middleware: middleware.into(),
            endpoint,
        }
    }

    /// Runs a request through the chain.
    pub fn run(&self, ctx: RequestContext) -> BoxFuture<'_, Response> {
        Box::pin(Next::new(&self.middleware, &self.endpoint).run(ctx))
    }

    /// Number of middleware in the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    /// Returns `true` if the endpoint is called directly.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    /// Names of the middleware in execution order.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.middleware.iter().map(|m| m.name()).collect()
    }
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("middleware", &self.names())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::{endpoint, FnMiddleware};
    use http::StatusCode;
    use http_body_util::BodyExt;
    use kairos_core::{ConnectionInfo, ResponseExt};

    fn ctx() -> RequestContext {
        let request = http::Request::get("/")
            .body(http_body_util::Empty::<bytes::Bytes>::new())
            .unwrap();
        RequestContext::from_request(request, ConnectionInfo::default())
    }

    #[tokio::test]
    async fn test_pipeline_is_reusable() {
        let pipeline = Pipeline::new(
            vec![Arc::new(FnMiddleware::new("pass", |ctx, next| {
                Box::pin(next.run(ctx))
            }))],
            endpoint(|_ctx| async { Response::empty(StatusCode::ACCEPTED) }),
        );

        for _ in 0..3 {
            assert_eq!(pipeline.run(ctx()).await.status(), StatusCode::ACCEPTED);
        }
        assert_eq!(pipeline.names(), vec!["pass"]);
        assert_eq!(pipeline.len(), 1);
    }

    #[tokio::test]
    async fn test_middleware_sees_locals_from_earlier_stage() {
        #[derive(Clone)]
        struct Marker(u8);

        let pipeline = Pipeline::new(
            vec![Arc::new(FnMiddleware::new("mark", |mut ctx, next| {
                ctx.locals_mut().insert(Marker(7));
                Box::pin(next.run(ctx))
            }))],
            endpoint(|ctx| async move {
                let value = ctx.locals().get::<Marker>().map_or(0, |m| m.0);
                Response::text(StatusCode::OK, value.to_string())
            }),
        );

        let response = pipeline.run(ctx()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!pipeline.is_empty());
        let body = response.into_body().collect().await.unwrap().to_bytes();
        assert_eq!(&body[..], b"7");
    }
}
