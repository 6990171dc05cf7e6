//! Query string extractors.

use std::collections::HashMap;
use std::ops::Deref;

use async_trait::async_trait;
use kairos_core::{QueryError, RequestContext};
use serde::de::DeserializeOwned;

use crate::{ExtractionError, ExtractionSource, FromRequest, Rejection};

/// Extractor deserializing the query string into `T`.
///
/// Use `Option<T>` fields for optional parameters and bare types for
/// required ones; a missing required field is a `400`, as is a query
/// string with a malformed percent-escape or invalid UTF-8.
///
/// ```rust
/// use kairos_extract::Query;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct ListParams {
///     limit: Option<u32>,
///     offset: Option<u32>,
/// }
///
/// async fn list(Query(params): Query<ListParams>) -> String {
///     format!("{:?}/{:?}", params.limit, params.offset)
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query<T>(pub T);

impl<T> Query<T> {
    /// Consumes the Query and returns the inner value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Query<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<T: DeserializeOwned + Send> FromRequest for Query<T> {
    async fn from_request(ctx: &mut RequestContext) -> Result<Self, ExtractionError> {
        let query = ctx.checked_query().map_err(malformed)?.unwrap_or("");
        serde_urlencoded::from_str(query)
            .map(Query)
            .map_err(|e| ExtractionError::deserialization_failed(ExtractionSource::Query, e))
    }
}

/// Decoded query parameters as a string multimap.
///
/// Keys keep every value in order of appearance. A malformed escape or
/// non-UTF-8 value is a `400`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryMap(HashMap<String, Vec<String>>);

impl QueryMap {
    /// The first value for `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key)?.first().map(String::as_str)
    }

    /// Every value for `key`.
    #[must_use]
    pub fn get_all(&self, key: &str) -> &[String] {
        self.0.get(key).map_or(&[], Vec::as_slice)
    }

    /// Returns `true` if `key` appeared at least once.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// Number of distinct keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if the query string was empty or absent.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the map.
    #[must_use]
    pub fn into_inner(self) -> HashMap<String, Vec<String>> {
        self.0
    }
}

#[async_trait]
impl FromRequest for QueryMap {
    async fn from_request(ctx: &mut RequestContext) -> Result<Self, ExtractionError> {
        let mut map: HashMap<String, Vec<String>> = HashMap::new();
        for (key, value) in ctx.query_pairs().map_err(malformed)? {
            map.entry(key).or_default().push(value);
        }
        Ok(Self(map))
    }
}

fn malformed(err: QueryError) -> ExtractionError {
    ExtractionError::new(
        Rejection::BadRequest,
        ExtractionSource::Query,
        "MALFORMED_QUERY",
        err.to_string(),
    )
}

/// The raw, undecoded query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawQuery(pub Option<String>);

#[async_trait]
impl FromRequest for RawQuery {
    async fn from_request(ctx: &mut RequestContext) -> Result<Self, ExtractionError> {
        Ok(Self(ctx.query_string().map(ToOwned::to_owned)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kairos_core::ConnectionInfo;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Search {
        q: String,
        page: Option<u32>,
    }

    fn ctx(uri: &str) -> RequestContext {
        let request = http::Request::get(uri)
            .body(http_body_util::Empty::<bytes::Bytes>::new())
            .unwrap();
        RequestContext::from_request(request, ConnectionInfo::default())
    }

    #[tokio::test]
    async fn test_typed_query() {
        let Query(search) = Query::<Search>::from_request(&mut ctx("/s?q=rust+lang&page=2"))
            .await
            .unwrap();
        assert_eq!(search.q, "rust lang");
        assert_eq!(search.page, Some(2));
    }

    #[tokio::test]
    async fn test_missing_required_field_is_bad_request() {
        let err = Query::<Search>::from_request(&mut ctx("/s?page=2"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
        assert_eq!(err.extraction_source(), ExtractionSource::Query);
    }

    #[tokio::test]
    async fn test_query_map_multi_values() {
        let map = QueryMap::from_request(&mut ctx("/s?tag=a&tag=b%20c&x="))
            .await
            .unwrap();
        assert_eq!(map.get_all("tag"), ["a".to_string(), "b c".to_string()]);
        assert_eq!(map.get("x"), Some(""));
        assert!(map.get_all("nope").is_empty());
        assert_eq!(map.len(), 2);
    }

    #[tokio::test]
    async fn test_malformed_escape_is_bad_request() {
        let err = QueryMap::from_request(&mut ctx("/s?a=%ZZ")).await.unwrap_err();
        assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
        assert_eq!(err.error_code(), "MALFORMED_QUERY");

        let err = Query::<HashMap<String, String>>::from_request(&mut ctx("/s?a=%ZZ"))
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), http::StatusCode::BAD_REQUEST);
        assert_eq!(err.extraction_source(), ExtractionSource::Query);
    }

    #[tokio::test]
    async fn test_invalid_utf8_is_bad_request() {
        let err = QueryMap::from_request(&mut ctx("/s?a=%FF")).await.unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_QUERY");

        let err = Query::<Search>::from_request(&mut ctx("/s?q=%FF"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "MALFORMED_QUERY");
    }

    #[tokio::test]
    async fn test_raw_query_keeps_malformed_input() {
        let RawQuery(raw) = RawQuery::from_request(&mut ctx("/s?a=%ZZ")).await.unwrap();
        assert_eq!(raw.as_deref(), Some("a=%ZZ"));
    }

    #[tokio::test]
    async fn test_raw_query() {
        let RawQuery(raw) = RawQuery::from_request(&mut ctx("/s?q=a%20b")).await.unwrap();
        assert_eq!(raw.as_deref(), Some("q=a%20b"));

        let RawQuery(raw) = RawQuery::from_request(&mut ctx("/s")).await.unwrap();
        assert!(raw.is_none());
    }
}
