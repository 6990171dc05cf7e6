//! Access logging.
//!
//! Emits one `info` event per request after the response is produced:
//!
//! - `request_id` - request identifier
//! - `http.method` / `http.path` - request line
//! - `route` - matched pattern, e.g. `/users/{id}`
//! - `http.status_code` - response status
//! - `bytes` - response body size
//! - `user_agent` / `remote_addr` - client details
//! - `duration_ms` - time spent in downstream stages

use std::time::Instant;

use http::header::USER_AGENT;
use http_body::Body;
use kairos_core::{RequestContext, Response};

use crate::middleware::{BoxFuture, Middleware, Next};

/// Middleware that logs a summary line for every request.
#[derive(Debug, Clone, Default)]
pub struct AccessLog {
    service_name: Option<String>,
}

impl AccessLog {
    /// Creates an access logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a `service` field to every event.
    #[must_use]
    pub fn service_name(mut self, name: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self
    }
}

struct Entry {
    request_id: String,
    method: String,
    path: String,
    route: Option<String>,
    user_agent: Option<String>,
    remote_addr: Option<String>,
}

impl Entry {
    fn capture(ctx: &RequestContext) -> Self {
        Self {
            request_id: ctx.request_id().to_string(),
            method: ctx.method().to_string(),
            path: ctx.path().to_owned(),
            route: ctx.route_pattern().map(ToOwned::to_owned),
            user_agent: ctx.header(USER_AGENT).map(ToOwned::to_owned),
            remote_addr: ctx.connection().remote_addr().map(|a| a.to_string()),
        }
    }
}

impl Middleware for AccessLog {
    fn name(&self) -> &'static str {
        "access_log"
    }

    fn process<'a>(&'a self, ctx: RequestContext, next: Next<'a>) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            let entry = Entry::capture(&ctx);
            let start = Instant::now();

            let response = next.run(ctx).await;

            let duration_ms = start.elapsed().as_secs_f64() * 1000.0;
            let bytes = response.body().size_hint().exact().unwrap_or(0);
            tracing::info!(
                service = self.service_name.as_deref().unwrap_or_default(),
                request_id = %entry.request_id,
                http.method = %entry.method,
                http.path = %entry.path,
                route = entry.route.as_deref().unwrap_or("-"),
                http.status_code = response.status().as_u16(),
                bytes,
                user_agent = entry.user_agent.as_deref().unwrap_or("-"),
                remote_addr = entry.remote_addr.as_deref().unwrap_or("-"),
                duration_ms,
                "request completed"
            );
            response
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::endpoint;
    use crate::Pipeline;
    use http::StatusCode;
    use kairos_core::{ConnectionInfo, ResponseExt};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_access_log_passes_response_through() {
        let pipeline = Pipeline::new(
            vec![Arc::new(AccessLog::new().service_name("svc"))],
            endpoint(|_ctx| async { Response::text(StatusCode::CREATED, "made") }),
        );

        let request = http::Request::post("/items")
            .header("user-agent", "test/1.0")
            .body(http_body_util::Empty::<bytes::Bytes>::new())
            .unwrap();
        let response = pipeline
            .run(RequestContext::from_request(request, ConnectionInfo::default()))
            .await;

        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.body().size_hint().exact(), Some(4));
    }

    #[test]
    fn test_entry_capture() {
        let local = "127.0.0.1:80".parse().unwrap();
        let remote = "192.0.2.1:4000".parse().unwrap();
        let request = http::Request::get("/a?b=c")
            .header("user-agent", "curl")
            .body(http_body_util::Empty::<bytes::Bytes>::new())
            .unwrap();
        let ctx = RequestContext::from_request(request, ConnectionInfo::new(local, remote));

        let entry = Entry::capture(&ctx);
        assert_eq!(entry.method, "GET");
        assert_eq!(entry.path, "/a");
        assert_eq!(entry.user_agent.as_deref(), Some("curl"));
        assert_eq!(entry.remote_addr.as_deref(), Some("192.0.2.1:4000"));
        assert!(entry.route.is_none());
    }
}
