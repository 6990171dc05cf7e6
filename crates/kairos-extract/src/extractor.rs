//! Core extractor trait.

use async_trait::async_trait;
use kairos_core::RequestContext;

use crate::ExtractionError;

/// Trait for types that can be extracted from an in-flight request.
///
/// Extraction may suspend, for example while a body streams in. Handlers run
/// their extractors left to right; the first failure ends the request.
///
/// # Implementing `FromRequest`
///
/// ```rust
/// use async_trait::async_trait;
/// use kairos_core::RequestContext;
/// use kairos_extract::{ExtractionError, ExtractionSource, FromRequest};
///
/// struct ApiVersion(u32);
///
/// #[async_trait]
/// impl FromRequest for ApiVersion {
///     async fn from_request(ctx: &mut RequestContext) -> Result<Self, ExtractionError> {
///         let version = ctx
///             .header("x-api-version")
///             .ok_or_else(|| ExtractionError::missing(ExtractionSource::Header, "x-api-version"))?;
///
///         version.parse().map(ApiVersion).map_err(|_| {
///             ExtractionError::invalid_type(ExtractionSource::Header, "x-api-version", "expected integer")
///         })
///     }
/// }
/// ```
#[async_trait]
pub trait FromRequest: Sized + Send {
    /// Extracts this type from the request context.
    async fn from_request(ctx: &mut RequestContext) -> Result<Self, ExtractionError>;
}

// `None` when the inner extractor fails.
#[async_trait]
impl<T: FromRequest> FromRequest for Option<T> {
    async fn from_request(ctx: &mut RequestContext) -> Result<Self, ExtractionError> {
        Ok(T::from_request(ctx).await.ok())
    }
}

// Hands the failure to the handler instead of rejecting the request.
#[async_trait]
impl<T: FromRequest> FromRequest for Result<T, ExtractionError> {
    async fn from_request(ctx: &mut RequestContext) -> Result<Self, ExtractionError> {
        Ok(T::from_request(ctx).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExtractionSource;
    use kairos_core::ConnectionInfo;

    struct PathText(String);

    #[async_trait]
    impl FromRequest for PathText {
        async fn from_request(ctx: &mut RequestContext) -> Result<Self, ExtractionError> {
            Ok(PathText(ctx.path().to_string()))
        }
    }

    struct AlwaysFails;

    #[async_trait]
    impl FromRequest for AlwaysFails {
        async fn from_request(_ctx: &mut RequestContext) -> Result<Self, ExtractionError> {
            Err(ExtractionError::missing(ExtractionSource::Path, "required_field"))
        }
    }

    fn ctx() -> RequestContext {
        let request = http::Request::get("/test/path")
            .body(http_body_util::Empty::<bytes::Bytes>::new())
            .unwrap();
        RequestContext::from_request(request, ConnectionInfo::default())
    }

    #[tokio::test]
    async fn test_basic_extraction() {
        let PathText(path) = PathText::from_request(&mut ctx()).await.unwrap();
        assert_eq!(path, "/test/path");
    }

    #[tokio::test]
    async fn test_option_extraction() {
        let mut ctx = ctx();
        assert!(Option::<PathText>::from_request(&mut ctx).await.unwrap().is_some());
        assert!(Option::<AlwaysFails>::from_request(&mut ctx).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_result_extraction() {
        let inner = Result::<AlwaysFails, ExtractionError>::from_request(&mut ctx())
            .await
            .unwrap();
        assert_eq!(inner.err().unwrap().field(), Some("required_field"));
    }
}
