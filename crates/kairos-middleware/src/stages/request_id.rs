//! Request ID middleware.
//!
//! Every request already carries a [`RequestId`] in its context, taken from a
//! UUID-valued `X-Request-ID` header or freshly generated. This stage decides
//! whether an incoming ID is trusted and echoes the final ID on the response
//! so clients can correlate their calls with server logs.

use http::HeaderValue;
use kairos_core::{RequestContext, RequestId, Response, REQUEST_ID_HEADER};

use crate::middleware::{BoxFuture, Middleware, Next};

/// Middleware that propagates request IDs.
#[derive(Debug, Clone)]
pub struct RequestIdStage {
    trust_incoming: bool,
}

impl Default for RequestIdStage {
    fn default() -> Self {
        Self {
            trust_incoming: true,
        }
    }
}

impl RequestIdStage {
    /// Creates a stage that keeps a valid incoming `X-Request-ID`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a stage that always assigns a fresh ID.
    ///
    /// Use this at the edge, where callers are not trusted.
    #[must_use]
    pub fn regenerate() -> Self {
        Self {
            trust_incoming: false,
        }
    }
}

impl Middleware for RequestIdStage {
    fn name(&self) -> &'static str {
        "request_id"
    }

    fn process<'a>(&'a self, mut ctx: RequestContext, next: Next<'a>) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            if !self.trust_incoming {
                ctx.set_request_id(RequestId::new());
            }
            let request_id = ctx.request_id();

            let mut response = next.run(ctx).await;

            if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                response.headers_mut().insert(REQUEST_ID_HEADER, value);
            }
            response
        })
    }
}
