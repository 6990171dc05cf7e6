//! Path parameter extractors.
//!
//! Values bound by the router are already percent-decoded.

use std::ops::Deref;
use std::str::FromStr;

use async_trait::async_trait;
use kairos_core::RequestContext;
use serde::de::DeserializeOwned;

use crate::de::ParamsDeserializer;
use crate::{ExtractionError, ExtractionSource, FromRequest};

/// Extractor deserializing all path parameters into `T`.
///
/// Structs and maps are filled by parameter name; tuples read the bound
/// values in pattern order, so `/users/{name}/posts/{id}` fits
/// `Path<(String, u64)>`. Numeric and boolean values are parsed from their
/// textual form.
///
/// ```rust
/// use kairos_extract::Path;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct PostPath {
///     user_id: u64,
///     post_id: String,
/// }
///
/// // Registered as `/users/{user_id}/posts/{post_id}`:
/// async fn show(Path(path): Path<PostPath>) -> String {
///     format!("{}/{}", path.user_id, path.post_id)
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Path<T>(pub T);

impl<T> Path<T> {
    /// Consumes the Path and returns the inner value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Path<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<T: DeserializeOwned + Send> FromRequest for Path<T> {
    async fn from_request(ctx: &mut RequestContext) -> Result<Self, ExtractionError> {
        T::deserialize(ParamsDeserializer::new(ctx.params()))
            .map(Path)
            .map_err(|e| ExtractionError::deserialization_failed(ExtractionSource::Path, e))
    }
}

/// Extractor parsing the first bound path parameter with [`FromStr`].
///
/// Suited to routes with a single parameter such as `/orders/{id}`.
///
/// ```rust
/// use kairos_extract::PathParam;
///
/// async fn show(PathParam(id): PathParam<u64>) -> String {
///     format!("order {id}")
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathParam<T>(pub T);

impl<T> PathParam<T> {
    /// Consumes the extractor and returns the parsed value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for PathParam<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<T> FromRequest for PathParam<T>
where
    T: FromStr + Send,
    T::Err: std::fmt::Display,
{
    async fn from_request(ctx: &mut RequestContext) -> Result<Self, ExtractionError> {
        let (name, value) = ctx
            .params()
            .first()
            .ok_or_else(|| ExtractionError::missing(ExtractionSource::Path, "<path parameter>"))?;

        value
            .parse()
            .map(PathParam)
            .map_err(|e| ExtractionError::invalid_type(ExtractionSource::Path, name, e))
    }
}

/// Parses a single path parameter by name.
///
/// # Errors
///
/// Returns an error if the parameter is missing or cannot be parsed.
pub fn path_param<T>(ctx: &RequestContext, name: &str) -> Result<T, ExtractionError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = ctx
        .param(name)
        .ok_or_else(|| ExtractionError::missing(ExtractionSource::Path, name))?;

    value
        .parse()
        .map_err(|e| ExtractionError::invalid_type(ExtractionSource::Path, name, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_core::{ConnectionInfo, Params};
    use serde::Deserialize;
    use std::sync::Arc;

    #[derive(Debug, Deserialize, PartialEq)]
    struct PostPath {
        user_id: u64,
        post_id: String,
    }

    #[derive(Debug, Deserialize, PartialEq)]
    struct OptionalPath {
        id: u64,
        #[serde(default)]
        version: Option<String>,
    }

    fn make_ctx(pairs: &[(&str, &str)]) -> RequestContext {
        let request = http::Request::get("/test")
            .body(http_body_util::Empty::<bytes::Bytes>::new())
            .unwrap();
        let mut ctx = RequestContext::from_request(request, ConnectionInfo::default());
        let params: Params = pairs.iter().copied().collect();
        ctx.set_route(Arc::from("/test"), params);
        ctx
    }

    #[tokio::test]
    async fn test_multiple_path_params() {
        let mut ctx = make_ctx(&[("user_id", "42"), ("post_id", "abc-123")]);
        let Path(path) = Path::<PostPath>::from_request(&mut ctx).await.unwrap();

        assert_eq!(
            path,
            PostPath {
                user_id: 42,
                post_id: "abc-123".into()
            }
        );
    }

    #[tokio::test]
    async fn test_values_with_reserved_characters() {
        let mut ctx = make_ctx(&[("user_id", "1"), ("post_id", "a&b=c d")]);
        let Path(path) = Path::<PostPath>::from_request(&mut ctx).await.unwrap();
        assert_eq!(path.post_id, "a&b=c d");
    }

    #[tokio::test]
    async fn test_tuple_path_by_position() {
        let mut ctx = make_ctx(&[("user", "x"), ("id", "7")]);
        let Path((user, id)) = Path::<(String, u32)>::from_request(&mut ctx).await.unwrap();
        assert_eq!(user, "x");
        assert_eq!(id, 7);

        let mut ctx = make_ctx(&[("user", "x"), ("id", "seven")]);
        let err = Path::<(String, u32)>::from_request(&mut ctx).await.unwrap_err();
        assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
        assert!(err.message().contains("`id`"));
    }

    #[tokio::test]
    async fn test_single_value_path() {
        let mut ctx = make_ctx(&[("id", "99")]);
        let Path(id) = Path::<u64>::from_request(&mut ctx).await.unwrap();
        assert_eq!(id, 99);
    }

    #[tokio::test]
    async fn test_optional_path_param() {
        let mut ctx = make_ctx(&[("id", "42")]);
        let Path(path) = Path::<OptionalPath>::from_request(&mut ctx).await.unwrap();

        assert_eq!(path.id, 42);
        assert_eq!(path.version, None);
    }

    #[tokio::test]
    async fn test_missing_params() {
        let mut ctx = make_ctx(&[]);
        let err = Path::<OptionalPath>::from_request(&mut ctx).await.unwrap_err();
        assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_invalid_type_conversion() {
        let mut ctx = make_ctx(&[("user_id", "not-a-number"), ("post_id", "x")]);
        let err = Path::<PostPath>::from_request(&mut ctx).await.unwrap_err();
        assert_eq!(err.extraction_source(), ExtractionSource::Path);
        assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_path_param_extractor() {
        let mut ctx = make_ctx(&[("id", "17")]);
        let PathParam(id) = PathParam::<u32>::from_request(&mut ctx).await.unwrap();
        assert_eq!(id, 17);

        let mut ctx = make_ctx(&[("id", "seventeen")]);
        let err = PathParam::<u32>::from_request(&mut ctx).await.unwrap_err();
        assert_eq!(err.field(), Some("id"));
    }

    #[test]
    fn test_path_param_function() {
        let ctx = make_ctx(&[("id", "42"), ("name", "test")]);

        let id: u64 = path_param(&ctx, "id").unwrap();
        assert_eq!(id, 42);
        let name: String = path_param(&ctx, "name").unwrap();
        assert_eq!(name, "test");
        assert!(path_param::<u64>(&ctx, "missing").is_err());
    }
}
