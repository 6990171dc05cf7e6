//! Conversion of handler outputs into HTTP responses.
//!
//! | Type | Status | Content-Type |
//! |------|--------|--------------|
//! | `()` | `200` | none |
//! | `&'static str`, `String` | `200` | `text/plain; charset=utf-8` |
//! | `Bytes` | `200` | `application/octet-stream` |
//! | `StatusCode` | as given | none |
//! | `(StatusCode, T)` | as given | from `T` |
//! | [`Json<T>`] | `200` | `application/json` |
//! | [`Html`] | `200` | `text/html; charset=utf-8` |
//! | [`Redirect`] | `301`/`302`/`303`/`307`/`308` | none |
//! | [`NoContent`] | `204` | none |
//! | `HandlerFault` | `500` | `application/json` |

use bytes::Bytes;
use http::header::{HeaderValue, CONTENT_TYPE, LOCATION};
use http::StatusCode;
use http_body_util::Full;
use kairos_core::{HandlerFault, Response, ResponseExt};
use serde::Serialize;

use crate::{ExtractionError, Json};

const OCTET_STREAM: &str = "application/octet-stream";
const HTML: &str = "text/html; charset=utf-8";

/// Types a handler may return.
pub trait IntoResponse {
    /// Converts `self` into a response.
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response {
        self
    }
}

impl IntoResponse for () {
    fn into_response(self) -> Response {
        Response::empty(StatusCode::OK)
    }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response {
        Response::text(StatusCode::OK, self)
    }
}

impl IntoResponse for String {
    fn into_response(self) -> Response {
        Response::text(StatusCode::OK, self)
    }
}

impl IntoResponse for Bytes {
    fn into_response(self) -> Response {
        let mut response = Response::new(Full::new(self));
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(OCTET_STREAM));
        response
    }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response {
        Response::empty(self)
    }
}

impl<T: IntoResponse> IntoResponse for (StatusCode, T) {
    fn into_response(self) -> Response {
        let (status, inner) = self;
        let mut response = inner.into_response();
        *response.status_mut() = status;
        response
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        match serde_json::to_vec(&self.0) {
            Ok(body) => Response::json_bytes(StatusCode::OK, body),
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize JSON response");
                Response::json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "SERIALIZATION_FAILED",
                    "failed to serialize response body",
                )
            }
        }
    }
}

impl<T: IntoResponse, E: IntoResponse> IntoResponse for Result<T, E> {
    fn into_response(self) -> Response {
        match self {
            Ok(value) => value.into_response(),
            Err(err) => err.into_response(),
        }
    }
}

impl IntoResponse for HandlerFault {
    fn into_response(self) -> Response {
        match std::error::Error::source(&self) {
            Some(source) => tracing::error!(error = %self, source = %source, "handler failed"),
            None => tracing::error!(error = %self, "handler failed"),
        }
        Response::json_error(
            StatusCode::INTERNAL_SERVER_ERROR,
            "INTERNAL_ERROR",
            "internal server error",
        )
    }
}

impl IntoResponse for ExtractionError {
    fn into_response(self) -> Response {
        Response::json_error(self.status_code(), self.error_code(), self.message())
    }
}

/// An HTML response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Html<T>(pub T);

impl<T: Into<Bytes>> IntoResponse for Html<T> {
    fn into_response(self) -> Response {
        let mut response = Response::new(Full::new(self.0.into()));
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static(HTML));
        response
    }
}

/// A redirect to another location.
///
/// ```rust
/// use kairos_extract::{IntoResponse, Redirect};
///
/// let response = Redirect::see_other("/result").into_response();
/// assert_eq!(response.status(), http::StatusCode::SEE_OTHER);
/// ```
#[derive(Debug, Clone)]
pub struct Redirect {
    location: String,
    status: StatusCode,
}

impl Redirect {
    fn with_status(location: impl Into<String>, status: StatusCode) -> Self {
        Self {
            location: location.into(),
            status,
        }
    }

    /// `302 Found`.
    #[must_use]
    pub fn to(location: impl Into<String>) -> Self {
        Self::with_status(location, StatusCode::FOUND)
    }

    /// `301 Moved Permanently`.
    #[must_use]
    pub fn permanent(location: impl Into<String>) -> Self {
        Self::with_status(location, StatusCode::MOVED_PERMANENTLY)
    }

    /// `303 See Other`, typically after a `POST`.
    #[must_use]
    pub fn see_other(location: impl Into<String>) -> Self {
        Self::with_status(location, StatusCode::SEE_OTHER)
    }

    /// `307 Temporary Redirect`; the method is preserved.
    #[must_use]
    pub fn temporary(location: impl Into<String>) -> Self {
        Self::with_status(location, StatusCode::TEMPORARY_REDIRECT)
    }

    /// `308 Permanent Redirect`; the method is preserved.
    #[must_use]
    pub fn permanent_redirect(location: impl Into<String>) -> Self {
        Self::with_status(location, StatusCode::PERMANENT_REDIRECT)
    }

    /// The redirect target.
    #[must_use]
    pub fn location(&self) -> &str {
        &self.location
    }
}

impl IntoResponse for Redirect {
    fn into_response(self) -> Response {
        match HeaderValue::try_from(self.location) {
            Ok(location) => {
                let mut response = Response::empty(self.status);
                response.headers_mut().insert(LOCATION, location);
                response
            }
            Err(_) => Response::json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INVALID_REDIRECT",
                "redirect location is not a valid header value",
            ),
        }
    }
}

/// `204 No Content`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoContent;

impl IntoResponse for NoContent {
    fn into_response(self) -> Response {
        Response::empty(StatusCode::NO_CONTENT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExtractionSource;
    use http_body_util::BodyExt;

    async fn body_string(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[derive(Serialize)]
    struct User {
        id: u64,
        name: &'static str,
    }

    #[tokio::test]
    async fn test_json_response() {
        let response = Json(User { id: 1, name: "Alice" }).into_response();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), "application/json");
        assert_eq!(body_string(response).await, r#"{"id":1,"name":"Alice"}"#);
    }

    #[tokio::test]
    async fn test_status_tuple_keeps_content_type() {
        let response = (StatusCode::CREATED, "made").into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(response.headers().get(CONTENT_TYPE).is_some());
        assert_eq!(body_string(response).await, "made");
    }

    #[test]
    fn test_unit_and_status() {
        assert_eq!(().into_response().status(), StatusCode::OK);
        assert_eq!(
            StatusCode::ACCEPTED.into_response().status(),
            StatusCode::ACCEPTED
        );
        assert_eq!(NoContent.into_response().status(), StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_handler_fault_hides_details() {
        let fault = HandlerFault::new("database password rejected");
        let response = Err::<String, _>(fault).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_string(response).await;
        assert!(body.contains("INTERNAL_ERROR"));
        assert!(!body.contains("password"));
    }

    #[tokio::test]
    async fn test_extraction_error_envelope() {
        let err = ExtractionError::missing(ExtractionSource::Query, "page");
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let value: serde_json::Value =
            serde_json::from_str(&body_string(response).await).unwrap();
        assert_eq!(value["error"]["code"], "MISSING_PARAMETER");
    }

    #[test]
    fn test_redirect() {
        let response = Redirect::to("/login").into_response();
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(response.headers().get(LOCATION).unwrap(), "/login");

        let response = Redirect::to("/bad\nlocation").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn test_html() {
        let response = Html("<h1>hi</h1>").into_response();
        assert_eq!(response.headers().get(CONTENT_TYPE).unwrap(), HTML);
    }
}
