//! Response type and error-envelope helpers.

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE};
use http::StatusCode;
use http_body_util::Full;
use serde::Serialize;

/// The HTTP response type produced by handlers and middleware.
pub type Response = http::Response<Full<Bytes>>;

const JSON: &str = "application/json";
const TEXT: &str = "text/plain; charset=utf-8";

/// Body of a JSON error response: `{"error":{"code":..,"message":..}}`.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope<'a> {
    /// Error details.
    pub error: ErrorDetail<'a>,
}

/// Inner object of an [`ErrorEnvelope`].
#[derive(Debug, Serialize)]
pub struct ErrorDetail<'a> {
    /// Machine-readable code such as `NOT_FOUND`.
    pub code: &'a str,
    /// Human-readable message.
    pub message: &'a str,
}

/// Constructors for common responses.
pub trait ResponseExt {
    /// An empty response with `status`.
    fn empty(status: StatusCode) -> Response;

    /// A plain-text response.
    fn text(status: StatusCode, body: impl Into<Bytes>) -> Response;

    /// A JSON response with an already-encoded body.
    fn json_bytes(status: StatusCode, body: impl Into<Bytes>) -> Response;

    /// A JSON error envelope.
    fn json_error(status: StatusCode, code: &str, message: &str) -> Response;
}

impl ResponseExt for Response {
    fn empty(status: StatusCode) -> Response {
        let mut response = Response::new(Full::new(Bytes::new()));
        *response.status_mut() = status;
        response
    }

    fn text(status: StatusCode, body: impl Into<Bytes>) -> Response {
        let mut response = Response::new(Full::new(body.into()));
        *response.status_mut() = status;
        response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(TEXT));
        response
    }

    fn json_bytes(status: StatusCode, body: impl Into<Bytes>) -> Response {
        let mut response = Response::new(Full::new(body.into()));
        *response.status_mut() = status;
        response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static(JSON));
        response
    }

    fn json_error(status: StatusCode, code: &str, message: &str) -> Response {
        let envelope = ErrorEnvelope {
            error: ErrorDetail { code, message },
        };
        // Serializing two string fields cannot fail.
        let body = serde_json::to_vec(&envelope).unwrap_or_default();
        Self::json_bytes(status, body)
    }
}
