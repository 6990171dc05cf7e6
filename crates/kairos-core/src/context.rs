//! Request context types.
//!
//! The [`RequestContext`] carries all per-request state through the middleware
//! pipeline and into extractors and handlers. It is exclusively owned by the
//! task serving the request and is dropped when the response is produced.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use http::request::Parts;
use http::{Extensions, HeaderMap, Method, Uri, Version};
use http_body::Body;
use kairos_router::Params;

use crate::body::RequestBody;
use crate::connection::ConnectionInfo;
use crate::error::{BodyError, BoxError, QueryError};
use crate::request_id::RequestId;
use crate::state::StateStore;

/// Per-request context that flows through the middleware pipeline.
///
/// # Example
///
/// ```
/// use kairos_core::{ConnectionInfo, RequestContext};
///
/// let request = http::Request::get("/users/42?verbose=true")
///     .body(http_body_util::Empty::<bytes::Bytes>::new())
///     .unwrap();
/// let ctx = RequestContext::from_request(request, ConnectionInfo::default());
///
/// assert_eq!(ctx.path(), "/users/42");
/// assert_eq!(ctx.query_string(), Some("verbose=true"));
/// ```
pub struct RequestContext {
    parts: Parts,
    body: RequestBody,
    params: Params,
    route: Option<Arc<str>>,
    state: StateStore,
    connection: ConnectionInfo,
    request_id: RequestId,
    locals: Extensions,
    started_at: Instant,
}

impl RequestContext {
    /// Creates a context from a request head and body.
    ///
    /// The request id is taken from `x-request-id` when it carries a UUID.
    #[must_use]
    pub fn new(parts: Parts, body: RequestBody, connection: ConnectionInfo) -> Self {
        let request_id = RequestId::from_headers(&parts.headers);
        Self {
            parts,
            body,
            params: Params::new(),
            route: None,
            state: StateStore::empty(),
            connection,
            request_id,
            locals: Extensions::new(),
            started_at: Instant::now(),
        }
    }

    /// Creates a context from any `http::Request`.
    pub fn from_request<B>(request: http::Request<B>, connection: ConnectionInfo) -> Self
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        let (parts, body) = request.into_parts();
        Self::new(parts, RequestBody::streaming(body), connection)
    }

    /// Returns the request method.
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.parts.method
    }

    /// Returns the request URI.
    #[must_use]
    pub fn uri(&self) -> &Uri {
        &self.parts.uri
    }

    /// Returns the URI path, without the query string.
    #[must_use]
    pub fn path(&self) -> &str {
        self.parts.uri.path()
    }

    /// Returns the raw query string, if any.
    #[must_use]
    pub fn query_string(&self) -> Option<&str> {
        self.parts.uri.query()
    }

    /// Returns the raw query string after checking that it decodes cleanly.
    ///
    /// Every `%` must start a two-digit hex escape and the decoded bytes
    /// must be UTF-8.
    ///
    /// # Errors
    ///
    /// Returns the first [`QueryError`] found.
    pub fn checked_query(&self) -> Result<Option<&str>, QueryError> {
        let Some(query) = self.query_string() else {
            return Ok(None);
        };
        let bytes = query.as_bytes();
        for (offset, _) in query.match_indices('%') {
            let escape = bytes.get(offset + 1..offset + 3);
            if !escape.is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit)) {
                return Err(QueryError::MalformedEscape { offset });
            }
        }
        if std::str::from_utf8(&urlencoding::decode_binary(bytes)).is_err() {
            return Err(QueryError::InvalidUtf8);
        }
        Ok(Some(query))
    }

    /// Returns the decoded query pairs in order of appearance.
    ///
    /// Repeated keys produce repeated pairs. An absent query is empty.
    ///
    /// # Errors
    ///
    /// Returns a [`QueryError`] when the query string is malformed.
    pub fn query_pairs(&self) -> Result<Vec<(String, String)>, QueryError> {
        match self.checked_query()? {
            Some(query) => serde_urlencoded::from_str(query)
                .map_err(|err| QueryError::Malformed(err.to_string())),
            None => Ok(Vec::new()),
        }
    }

    /// Returns the HTTP version.
    #[must_use]
    pub fn version(&self) -> Version {
        self.parts.version
    }

    /// Returns the request headers.
    #[must_use]
    pub fn headers(&self) -> &HeaderMap {
        &self.parts.headers
    }

    /// Returns the request headers mutably.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.parts.headers
    }

    /// Returns a header value as a string, if present and valid.
    #[must_use]
    pub fn header(&self, name: impl http::header::AsHeaderName) -> Option<&str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns the request head.
    #[must_use]
    pub fn parts(&self) -> &Parts {
        &self.parts
    }

    /// Returns the request head mutably.
    ///
    /// Protocol upgrades take hyper's upgrade handle from
    /// `parts_mut().extensions`.
    pub fn parts_mut(&mut self) -> &mut Parts {
        &mut self.parts
    }

    /// Returns the path parameters bound by the router.
    #[must_use]
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Returns a single path parameter by name.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name)
    }

    /// Records the router match for this request.
    pub fn set_route(&mut self, pattern: Arc<str>, params: Params) {
        self.route = Some(pattern);
        self.params = params;
    }

    /// Returns the pattern of the matched route, e.g. `/users/{id}`.
    #[must_use]
    pub fn route_pattern(&self) -> Option<&str> {
        self.route.as_deref()
    }

    /// Returns the state store of the matched route's scope.
    #[must_use]
    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// Replaces the state store.
    pub fn set_state(&mut self, state: StateStore) {
        self.state = state;
    }

    /// Returns connection metadata.
    #[must_use]
    pub fn connection(&self) -> &ConnectionInfo {
        &self.connection
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Overrides the request ID.
    pub fn set_request_id(&mut self, request_id: RequestId) {
        self.request_id = request_id;
    }

    /// Values placed by middleware for downstream stages.
    #[must_use]
    pub fn locals(&self) -> &Extensions {
        &self.locals
    }

    /// Mutable access to the locals slot.
    pub fn locals_mut(&mut self) -> &mut Extensions {
        &mut self.locals
    }

    /// Returns the request body.
    pub fn body_mut(&mut self) -> &mut RequestBody {
        &mut self.body
    }

    /// Takes the body out of the context.
    pub fn take_body(&mut self) -> RequestBody {
        self.body.take()
    }

    /// Collects the body with a byte limit; see [`RequestBody::read_to_bytes`].
    pub async fn read_body(&mut self, limit: usize) -> Result<Bytes, BodyError> {
        self.body.read_to_bytes(limit).await
    }

    /// Returns the time elapsed since the context was created.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started_at.elapsed()
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("request_id", &self.request_id)
            .field("method", &self.parts.method)
            .field("uri", &self.parts.uri)
            .field("route", &self.route)
            .field("params", &self.params)
            .field("body", &self.body)
            .finish_non_exhaustive()
    }
}
