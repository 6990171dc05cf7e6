//! Collected responses and assertion helpers.

use std::fmt;

use bytes::Bytes;
use http::{header, HeaderMap, HeaderValue, StatusCode};
use http_body_util::BodyExt;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::TestError;

/// A response whose body has been read into memory.
///
/// The `assert_*` helpers panic with a descriptive message and return
/// `&Self`, so they chain.
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    /// Collects an HTTP response.
    ///
    /// # Errors
    ///
    /// Returns [`TestError::BodyRead`] if the body yields an error.
    pub async fn from_http<B>(response: http::Response<B>) -> Result<Self, TestError>
    where
        B: http_body::Body,
        B::Error: fmt::Display,
    {
        let (parts, body) = response.into_parts();
        let body = body
            .collect()
            .await
            .map_err(|e| TestError::BodyRead(e.to_string()))?
            .to_bytes();

        Ok(Self::new(parts.status, parts.headers, body))
    }

    /// Creates a response from parts.
    #[must_use]
    pub fn new(status: StatusCode, headers: HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// Status code.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Status code as a number.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        self.status.as_u16()
    }

    /// `true` for 2xx.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// `true` for 4xx.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        self.status.is_client_error()
    }

    /// `true` for 5xx.
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        self.status.is_server_error()
    }

    /// Response headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// First value of a header.
    #[must_use]
    pub fn header(&self, name: impl AsRef<str>) -> Option<&HeaderValue> {
        self.headers.get(name.as_ref())
    }

    /// First value of a header as text.
    #[must_use]
    pub fn header_str(&self, name: impl AsRef<str>) -> Option<&str> {
        self.header(name).and_then(|v| v.to_str().ok())
    }

    /// `Content-Type`, if present.
    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header_str(header::CONTENT_TYPE.as_str())
    }

    /// Raw body.
    #[must_use]
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body as UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns [`TestError::Utf8`] if the body is not valid UTF-8.
    pub fn text(&self) -> Result<String, TestError> {
        Ok(String::from_utf8(self.body.to_vec())?)
    }

    /// Body decoded as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`TestError::Json`] if the body does not decode into `T`.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, TestError> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// `(code, message)` from a `{"error":{"code","message"}}` envelope.
    #[must_use]
    pub fn error_envelope(&self) -> Option<(String, String)> {
        let value: Value = serde_json::from_slice(&self.body).ok()?;
        let error = value.get("error")?;
        Some((
            error.get("code")?.as_str()?.to_string(),
            error.get("message")?.as_str()?.to_string(),
        ))
    }

    /// Asserts the status code.
    ///
    /// # Panics
    ///
    /// Panics on mismatch.
    pub fn assert_status(&self, expected: StatusCode) -> &Self {
        assert_eq!(
            self.status,
            expected,
            "expected status {expected}, got {} with body {}",
            self.status,
            String::from_utf8_lossy(&self.body)
        );
        self
    }

    /// Asserts the numeric status code.
    ///
    /// # Panics
    ///
    /// Panics on mismatch.
    pub fn assert_status_code(&self, expected: u16) -> &Self {
        match StatusCode::from_u16(expected) {
            Ok(status) => self.assert_status(status),
            Err(_) => panic!("{expected} is not a valid status code"),
        }
    }

    /// Asserts a 2xx status.
    ///
    /// # Panics
    ///
    /// Panics if the status is not 2xx.
    pub fn assert_success(&self) -> &Self {
        assert!(self.is_success(), "expected a 2xx status, got {}", self.status);
        self
    }

    /// Asserts a header value.
    ///
    /// # Panics
    ///
    /// Panics if the header is missing or differs.
    pub fn assert_header(&self, name: impl AsRef<str>, expected: impl AsRef<str>) -> &Self {
        let name = name.as_ref();
        let expected = expected.as_ref();
        let Some(actual) = self.header_str(name) else {
            panic!("header '{name}' not found");
        };
        assert_eq!(actual, expected, "header '{name}'");
        self
    }

    /// Asserts that a header is absent.
    ///
    /// # Panics
    ///
    /// Panics if the header is present.
    pub fn assert_no_header(&self, name: impl AsRef<str>) -> &Self {
        let name = name.as_ref();
        assert!(self.header(name).is_none(), "header '{name}' should be absent");
        self
    }

    /// Asserts that `Content-Type` starts with `expected`.
    ///
    /// # Panics
    ///
    /// Panics if the header is missing or does not match.
    pub fn assert_content_type(&self, expected: impl AsRef<str>) -> &Self {
        let expected = expected.as_ref();
        let Some(actual) = self.content_type() else {
            panic!("Content-Type header not found");
        };
        assert!(
            actual.starts_with(expected),
            "Content-Type: expected '{expected}', got '{actual}'"
        );
        self
    }

    /// Asserts the exact body text.
    ///
    /// # Panics
    ///
    /// Panics if the body differs.
    pub fn assert_body_eq(&self, expected: impl AsRef<str>) -> &Self {
        assert_eq!(String::from_utf8_lossy(&self.body), expected.as_ref(), "body mismatch");
        self
    }

    /// Asserts that the body contains `expected`.
    ///
    /// # Panics
    ///
    /// Panics if the substring is missing.
    pub fn assert_body_contains(&self, expected: impl AsRef<str>) -> &Self {
        let expected = expected.as_ref();
        let body = String::from_utf8_lossy(&self.body);
        assert!(body.contains(expected), "body should contain '{expected}', got: {body}");
        self
    }

    /// Asserts the whole JSON body.
    ///
    /// # Panics
    ///
    /// Panics if the body is not JSON or differs.
    pub fn assert_json_eq(&self, expected: &Value) -> &Self {
        let actual = self.json_or_panic();
        assert_eq!(&actual, expected, "JSON body mismatch");
        self
    }

    /// Asserts one field addressed by a dotted path, e.g. `"items.0.name"`.
    ///
    /// # Panics
    ///
    /// Panics if the path is missing or the value differs.
    pub fn assert_json_field(&self, path: impl AsRef<str>, expected: &Value) -> &Self {
        let path = path.as_ref();
        let json = self.json_or_panic();
        let Some(actual) = json_path(&json, path) else {
            panic!("JSON path '{path}' not found in {json}");
        };
        assert_eq!(actual, expected, "JSON field '{path}'");
        self
    }

    /// Asserts the error envelope's status and code.
    ///
    /// # Panics
    ///
    /// Panics if the status differs or the body is not an error envelope
    /// with that code.
    pub fn assert_error(&self, status: StatusCode, code: &str) -> &Self {
        self.assert_status(status);
        match self.error_envelope() {
            Some((actual, _)) => assert_eq!(actual, code, "error code"),
            None => panic!(
                "expected an error envelope, got {}",
                String::from_utf8_lossy(&self.body)
            ),
        }
        self
    }

    fn json_or_panic(&self) -> Value {
        match serde_json::from_slice(&self.body) {
            Ok(value) => value,
            Err(err) => panic!(
                "body is not JSON ({err}): {}",
                String::from_utf8_lossy(&self.body)
            ),
        }
    }
}

impl fmt::Debug for TestResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestResponse")
            .field("status", &self.status)
            .field("headers", &self.headers)
            .field("body_len", &self.body.len())
            .finish()
    }
}

fn json_path<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.')
        .filter(|segment| !segment.is_empty())
        .try_fold(value, |current, segment| match segment.parse::<usize>() {
            Ok(index) => current.get(index),
            Err(_) => current.get(segment),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn response(status: u16, body: &str) -> TestResponse {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        TestResponse::new(StatusCode::from_u16(status).unwrap(), headers, Bytes::from(body.to_string()))
    }

    #[test]
    fn test_status_classes() {
        assert!(response(204, "").is_success());
        assert!(response(404, "").is_client_error());
        assert!(response(503, "").is_server_error());
    }

    #[test]
    fn test_text_and_json() {
        let response = response(200, r#"{"name":"kairos"}"#);
        assert_eq!(response.text().unwrap(), r#"{"name":"kairos"}"#);
        let value: Value = response.json().unwrap();
        assert_eq!(value["name"], "kairos");
    }

    #[test]
    fn test_invalid_utf8() {
        let response = TestResponse::new(StatusCode::OK, HeaderMap::new(), Bytes::from_static(&[0xff]));
        assert!(matches!(response.text(), Err(TestError::Utf8(_))));
    }

    #[test]
    fn test_error_envelope() {
        let response = response(404, r#"{"error":{"code":"NOT_FOUND","message":"no route"}}"#);
        assert_eq!(
            response.error_envelope(),
            Some(("NOT_FOUND".to_string(), "no route".to_string()))
        );
        response.assert_error(StatusCode::NOT_FOUND, "NOT_FOUND");
    }

    #[test]
    fn test_assertions_chain() {
        response(200, r#"{"items":[{"name":"a"},{"name":"b"}]}"#)
            .assert_success()
            .assert_content_type("application/json")
            .assert_no_header("allow")
            .assert_body_contains("items")
            .assert_json_field("items.1.name", &json!("b"));
    }

    #[test]
    #[should_panic(expected = "expected status 201 Created")]
    fn test_assert_status_panics() {
        response(200, "{}").assert_status(StatusCode::CREATED);
    }

    #[test]
    fn test_json_path() {
        let value = json!({"a": {"b": [10, 20]}});
        assert_eq!(json_path(&value, "a.b.1"), Some(&json!(20)));
        assert_eq!(json_path(&value, "a.c"), None);
        assert_eq!(json_path(&value, ""), Some(&value));
    }
}
