//! Raw body extractors.

use std::ops::Deref;

use async_trait::async_trait;
use bytes::Bytes;
use kairos_core::RequestContext;

use crate::{ExtractionError, ExtractionSource, FromRequest, DEFAULT_BODY_LIMIT};

/// The request body as bytes, limited to [`DEFAULT_BODY_LIMIT`].
///
/// Useful for binary payloads and signature verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBody(pub Bytes);

impl RawBody {
    /// Returns the body as a byte slice.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the RawBody and returns the inner Bytes.
    #[must_use]
    pub fn into_inner(self) -> Bytes {
        self.0
    }

    /// Returns the length of the body in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the body is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Deref for RawBody {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl FromRequest for RawBody {
    async fn from_request(ctx: &mut RequestContext) -> Result<Self, ExtractionError> {
        Ok(Self(ctx.read_body(DEFAULT_BODY_LIMIT).await?))
    }
}

/// The request body as UTF-8 text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyString(pub String);

impl BodyString {
    /// Consumes the extractor and returns the string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl Deref for BodyString {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl FromRequest for BodyString {
    async fn from_request(ctx: &mut RequestContext) -> Result<Self, ExtractionError> {
        let bytes = ctx.read_body(DEFAULT_BODY_LIMIT).await?;
        String::from_utf8(bytes.to_vec())
            .map(Self)
            .map_err(|e| ExtractionError::deserialization_failed(ExtractionSource::Body, e))
    }
}
