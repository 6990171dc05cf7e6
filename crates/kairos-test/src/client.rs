//! In-memory client for a built [`Service`].

use std::net::SocketAddr;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use kairos_core::ConnectionInfo;
use kairos_server::{App, RegistryError, Service};
use serde::Serialize;

use crate::error::TestError;
use crate::request::{TestRequest, TestRequestBuilder};
use crate::response::TestResponse;

/// Drives a [`Service`] without binding a socket.
///
/// Requests go through routing, the middleware pipeline, extractors and the
/// error mapper exactly as they would on a live connection. WebSocket
/// upgrades are the exception: they need a connection and answer `500`.
///
/// ```rust,ignore
/// use kairos_test::TestClient;
///
/// let client = TestClient::from_app(&mut app)?;
/// let response = client.get("/users/7").send().await;
/// response.assert_status_code(200).assert_json_field("id", &7.into());
/// ```
#[derive(Debug, Clone)]
#[must_use]
pub struct TestClient {
    service: Service,
    default_headers: HeaderMap,
    connection: ConnectionInfo,
    error: Option<String>,
}

impl TestClient {
    /// Wraps a built service.
    pub fn new(service: Service) -> Self {
        Self {
            service,
            default_headers: HeaderMap::new(),
            connection: ConnectionInfo::default(),
            error: None,
        }
    }

    /// Builds `app` and wraps the result.
    ///
    /// # Errors
    ///
    /// Returns the registry error if the app does not build.
    pub fn from_app(app: &mut App) -> Result<Self, RegistryError> {
        app.build().map(Self::new)
    }

    /// The wrapped service.
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// Adds a header sent with every request. Per-request headers with the
    /// same name are sent as well.
    pub fn with_default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        let name = HeaderName::try_from(name.as_ref());
        let value = HeaderValue::try_from(value.as_ref());
        match (name, value) {
            (Ok(name), Ok(value)) => {
                self.default_headers.append(name, value);
            }
            (Err(e), _) => self.error = Some(e.to_string()),
            (_, Err(e)) => self.error = Some(e.to_string()),
        }
        self
    }

    /// Makes requests appear to come from `remote` over a connection
    /// accepted on `local`.
    pub fn with_peer(mut self, local: SocketAddr, remote: SocketAddr) -> Self {
        self.connection = ConnectionInfo::new(local, remote).with_listen_addr(local);
        self
    }

    /// Starts a `GET` request.
    pub fn get(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::GET, uri)
    }

    /// Starts a `POST` request.
    pub fn post(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::POST, uri)
    }

    /// Starts a `PUT` request.
    pub fn put(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PUT, uri)
    }

    /// Starts a `PATCH` request.
    pub fn patch(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::PATCH, uri)
    }

    /// Starts a `DELETE` request.
    pub fn delete(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::DELETE, uri)
    }

    /// Starts an `OPTIONS` request.
    pub fn options(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::OPTIONS, uri)
    }

    /// Starts a `HEAD` request.
    pub fn head(&self, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        self.request(Method::HEAD, uri)
    }

    /// Starts a request with any method.
    pub fn request(&self, method: Method, uri: impl AsRef<str>) -> TestClientRequest<'_> {
        let mut builder = TestRequestBuilder::new(method, uri);
        if let Some(err) = &self.error {
            builder = builder.header_error(err.clone());
        }
        for (name, value) in &self.default_headers {
            builder = builder.header_append(name.clone(), value.clone());
        }
        TestClientRequest {
            client: self,
            builder,
        }
    }

    /// Serves an already built request.
    ///
    /// # Errors
    ///
    /// Returns [`TestError::BodyRead`] if the response body cannot be collected.
    pub async fn execute(&self, request: TestRequest) -> Result<TestResponse, TestError> {
        let response = self
            .service
            .serve_with(request.into_http_request(), self.connection)
            .await;
        TestResponse::from_http(response).await
    }
}

/// A request bound to a [`TestClient`].
#[must_use]
#[derive(Debug)]
pub struct TestClientRequest<'a> {
    client: &'a TestClient,
    builder: TestRequestBuilder,
}

impl TestClientRequest<'_> {
    /// Appends a header.
    pub fn header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.builder = self.builder.header(name, value);
        self
    }

    /// Sets `Content-Type`.
    pub fn content_type(mut self, content_type: impl AsRef<str>) -> Self {
        self.builder = self.builder.content_type(content_type);
        self
    }

    /// Sets `Authorization: Bearer <token>`.
    pub fn bearer_token(mut self, token: impl AsRef<str>) -> Self {
        self.builder = self.builder.bearer_token(token);
        self
    }

    /// Appends an encoded query string.
    pub fn query<T: Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.query(value);
        self
    }

    /// Sets the raw body.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.builder = self.builder.body(body);
        self
    }

    /// Sets a JSON body.
    pub fn json<T: Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.json(value);
        self
    }

    /// Sets a form body.
    pub fn form<T: Serialize>(mut self, value: &T) -> Self {
        self.builder = self.builder.form(value);
        self
    }

    /// Sends the request.
    ///
    /// # Panics
    ///
    /// Panics if the request is malformed; use [`try_send`](Self::try_send)
    /// to handle that case.
    pub async fn send(self) -> TestResponse {
        match self.try_send().await {
            Ok(response) => response,
            Err(err) => panic!("test request failed: {err}"),
        }
    }

    /// Sends the request.
    ///
    /// # Errors
    ///
    /// Returns `TestError` if the request is malformed or the response body
    /// cannot be read.
    pub async fn try_send(self) -> Result<TestResponse, TestError> {
        let request = self.builder.build()?;
        self.client.execute(request).await
    }
}
