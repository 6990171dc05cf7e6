//! Per-scope request deadline.

use std::time::Duration;

use http::StatusCode;
use kairos_core::{RequestContext, Response, ResponseExt};

use crate::middleware::{BoxFuture, Middleware, Next};

/// Middleware that answers `408 Request Timeout` when downstream stages
/// take longer than the configured duration.
///
/// The downstream future is dropped at its next suspension point.
#[derive(Debug, Clone, Copy)]
pub struct Timeout {
    duration: Duration,
}

impl Timeout {
    /// Creates a timeout stage.
    #[must_use]
    pub const fn new(duration: Duration) -> Self {
        Self { duration }
    }

    /// The configured deadline.
    #[must_use]
    pub const fn duration(&self) -> Duration {
        self.duration
    }
}

impl Middleware for Timeout {
    fn name(&self) -> &'static str {
        "timeout"
    }

    fn process<'a>(&'a self, ctx: RequestContext, next: Next<'a>) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let path = ctx.path().to_owned();
            match tokio::time::timeout(self.duration, next.run(ctx)).await {
                Ok(response) => response,
                Err(_) => {
                    tracing::warn!(
                        http.path = %path,
                        timeout_ms = u64::try_from(self.duration.as_millis()).unwrap_or(u64::MAX),
                        "request timed out"
                    );
                    Response::json_error(
                        StatusCode::REQUEST_TIMEOUT,
                        "REQUEST_TIMEOUT",
                        "request timed out",
                    )
                }
            }
        })
    }
}
