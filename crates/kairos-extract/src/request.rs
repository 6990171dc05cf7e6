//! Extractors for the request head, the connection, and middleware locals.

use std::ops::Deref;

use async_trait::async_trait;
use http::{HeaderMap, Method, Uri};
use kairos_core::{ConnectionInfo, RequestContext};

use crate::{ExtractionError, ExtractionSource, FromRequest};

#[async_trait]
impl FromRequest for Method {
    async fn from_request(ctx: &mut RequestContext) -> Result<Self, ExtractionError> {
        Ok(ctx.method().clone())
    }
}

#[async_trait]
impl FromRequest for Uri {
    async fn from_request(ctx: &mut RequestContext) -> Result<Self, ExtractionError> {
        Ok(ctx.uri().clone())
    }
}

#[async_trait]
impl FromRequest for HeaderMap {
    async fn from_request(ctx: &mut RequestContext) -> Result<Self, ExtractionError> {
        Ok(ctx.headers().clone())
    }
}

/// Addresses of the connection the request arrived on.
///
/// ```rust
/// use kairos_extract::ConnectInfo;
///
/// async fn whoami(ConnectInfo(conn): ConnectInfo) -> String {
///     format!("{:?}", conn.remote_addr())
/// }
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectInfo(pub ConnectionInfo);

impl Deref for ConnectInfo {
    type Target = ConnectionInfo;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl FromRequest for ConnectInfo {
    async fn from_request(ctx: &mut RequestContext) -> Result<Self, ExtractionError> {
        Ok(Self(*ctx.connection()))
    }
}

/// A value that middleware stored in the request locals.
///
/// A missing value means the middleware that provides it is not installed on
/// this route, so extraction fails with `500`.
///
/// ```rust
/// use kairos_extract::Local;
///
/// #[derive(Clone)]
/// struct CurrentUser(String);
///
/// async fn profile(Local(user): Local<CurrentUser>) -> String {
///     user.0
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Local<T>(pub T);

impl<T> Local<T> {
    /// Consumes the wrapper and returns the value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Local<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> FromRequest for Local<T> {
    async fn from_request(ctx: &mut RequestContext) -> Result<Self, ExtractionError> {
        ctx.locals().get::<T>().cloned().map(Local).ok_or_else(|| {
            ExtractionError::internal(
                ExtractionSource::Local,
                format!("no local value of type {}", std::any::type_name::<T>()),
            )
            .with_field(std::any::type_name::<T>())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Rejection;
    use std::net::SocketAddr;

    #[derive(Debug, Clone, PartialEq)]
    struct Tenant(&'static str);

    fn ctx() -> RequestContext {
        let local: SocketAddr = "127.0.0.1:8080".parse().unwrap();
        let remote: SocketAddr = "10.0.0.9:50211".parse().unwrap();
        let request = http::Request::put("/items/3?x=1")
            .header("x-trace", "abc")
            .body(http_body_util::Empty::<bytes::Bytes>::new())
            .unwrap();
        RequestContext::from_request(request, ConnectionInfo::new(local, remote))
    }

    #[tokio::test]
    async fn test_request_head_extractors() {
        let mut ctx = ctx();
        assert_eq!(Method::from_request(&mut ctx).await.unwrap(), Method::PUT);
        assert_eq!(Uri::from_request(&mut ctx).await.unwrap().query(), Some("x=1"));
        let headers = HeaderMap::from_request(&mut ctx).await.unwrap();
        assert_eq!(headers.get("x-trace").unwrap(), "abc");
    }

    #[tokio::test]
    async fn test_connect_info() {
        let ConnectInfo(conn) = ConnectInfo::from_request(&mut ctx()).await.unwrap();
        assert_eq!(conn.remote_addr().map(|addr| addr.port()), Some(50211));
    }

    #[tokio::test]
    async fn test_local_value() {
        let mut ctx = ctx();
        ctx.locals_mut().insert(Tenant("acme"));
        let Local(tenant) = Local::<Tenant>::from_request(&mut ctx).await.unwrap();
        assert_eq!(tenant, Tenant("acme"));
    }

    #[tokio::test]
    async fn test_missing_local_is_internal_error() {
        let err = Local::<Tenant>::from_request(&mut ctx()).await.unwrap_err();
        assert_eq!(err.kind(), Rejection::InternalServerError);
        assert_eq!(err.extraction_source(), ExtractionSource::Local);
    }
}
