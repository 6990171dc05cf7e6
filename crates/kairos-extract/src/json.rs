//! JSON body extractor.

use std::ops::Deref;

use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use kairos_core::RequestContext;
use serde::de::DeserializeOwned;

use crate::{ExtractionError, ExtractionSource, FromRequest, DEFAULT_BODY_LIMIT};

/// Extractor for JSON request bodies, limited to [`DEFAULT_BODY_LIMIT`].
///
/// A `Content-Type` other than `application/json` (or a `+json` suffix) is
/// rejected with `415`; an absent header is accepted. Malformed JSON is a
/// `400` and an oversized body a `413`.
///
/// `Json<T>` is also a response: it serializes `T` with
/// `Content-Type: application/json`.
///
/// ```rust
/// use kairos_extract::Json;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Deserialize, Serialize)]
/// struct CreateUser {
///     name: String,
/// }
///
/// async fn create(Json(user): Json<CreateUser>) -> Json<CreateUser> {
///     Json(user)
/// }
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T> Json<T> {
    /// Consumes the Json and returns the inner value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Json<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<T: DeserializeOwned + Send> FromRequest for Json<T> {
    async fn from_request(ctx: &mut RequestContext) -> Result<Self, ExtractionError> {
        decode(ctx, DEFAULT_BODY_LIMIT).await.map(Json)
    }
}

/// JSON extractor with a custom size limit in bytes.
///
/// ```rust
/// use kairos_extract::JsonWithLimit;
///
/// // 10 MiB
/// type LargeJson<T> = JsonWithLimit<T, 10_485_760>;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonWithLimit<T, const LIMIT: usize>(pub T);

impl<T, const LIMIT: usize> JsonWithLimit<T, LIMIT> {
    /// Consumes the `JsonWithLimit` and returns the inner value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T, const LIMIT: usize> Deref for JsonWithLimit<T, LIMIT> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<T: DeserializeOwned + Send, const LIMIT: usize> FromRequest for JsonWithLimit<T, LIMIT> {
    async fn from_request(ctx: &mut RequestContext) -> Result<Self, ExtractionError> {
        decode(ctx, LIMIT).await.map(JsonWithLimit)
    }
}

fn is_json(content_type: &str) -> bool {
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || (essence.starts_with("application/") && essence.ends_with("+json"))
}

async fn decode<T: DeserializeOwned>(
    ctx: &mut RequestContext,
    limit: usize,
) -> Result<T, ExtractionError> {
    if let Some(content_type) = ctx.headers().get(CONTENT_TYPE) {
        let content_type = content_type.to_str().unwrap_or_default();
        if !is_json(content_type) {
            return Err(ExtractionError::unsupported_media_type(
                "application/json",
                Some(content_type),
            ));
        }
    }

    let body = ctx.read_body(limit).await?;
    if body.is_empty() {
        return Err(ExtractionError::deserialization_failed(
            ExtractionSource::Body,
            "empty request body",
        ));
    }

    serde_json::from_slice(&body)
        .map_err(|e| ExtractionError::deserialization_failed(ExtractionSource::Body, e))
}
