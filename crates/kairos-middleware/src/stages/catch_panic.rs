//! Panic isolation.
//!
//! A panic in a downstream stage or handler is caught at this boundary and
//! answered with a `500` envelope. Other in-flight requests are unaffected.

use std::any::Any;
use std::panic::AssertUnwindSafe;

use futures_util::FutureExt;
use http::StatusCode;
use kairos_core::{RequestContext, Response, ResponseExt};

use crate::middleware::{BoxFuture, Middleware, Next};

/// Middleware converting panics into `500 Internal Server Error`.
#[derive(Debug, Clone, Copy, Default)]
pub struct CatchPanic;

impl CatchPanic {
    /// Creates the middleware.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

/// Extracts a readable message from a panic payload.
#[must_use]
pub fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "non-string panic payload"
    }
}

/// The response sent when a handler panics.
#[must_use]
pub fn internal_error() -> Response {
    Response::json_error(
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR",
        "internal server error",
    )
}

impl Middleware for CatchPanic {
    fn name(&self) -> &'static str {
        "catch_panic"
    }

    fn process<'a>(&'a self, ctx: RequestContext, next: Next<'a>) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let request_id = ctx.request_id();
            match AssertUnwindSafe(next.run(ctx)).catch_unwind().await {
                Ok(response) => response,
                Err(payload) => {
                    tracing::error!(
                        request_id = %request_id,
                        panic = panic_message(payload.as_ref()),
                        "handler panicked"
                    );
                    internal_error()
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::endpoint;
    use crate::Pipeline;
    use kairos_core::ConnectionInfo;
    use std::sync::Arc;

    fn ctx() -> RequestContext {
        let request = http::Request::get("/boom")
            .body(http_body_util::Empty::<bytes::Bytes>::new())
            .unwrap();
        RequestContext::from_request(request, ConnectionInfo::default())
    }

    #[tokio::test]
    async fn test_panic_becomes_500() {
        let pipeline = Pipeline::new(
            vec![Arc::new(CatchPanic::new())],
            endpoint(|ctx| async move {
                if ctx.path() == "/boom" {
                    panic!("handler exploded");
                }
                Response::empty(StatusCode::OK)
            }),
        );

        let response = pipeline.run(ctx()).await;
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_normal_response_untouched() {
        let pipeline = Pipeline::new(
            vec![Arc::new(CatchPanic::new())],
            endpoint(|_ctx| async { Response::empty(StatusCode::NO_CONTENT) }),
        );
        assert_eq!(pipeline.run(ctx()).await.status(), StatusCode::NO_CONTENT);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("static");
        assert_eq!(panic_message(payload.as_ref()), "static");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(42_u8);
        assert_eq!(panic_message(payload.as_ref()), "non-string panic payload");
    }
}
