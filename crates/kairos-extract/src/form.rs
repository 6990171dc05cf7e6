//! Form data extractor.

use std::ops::Deref;

use async_trait::async_trait;
use http::header::CONTENT_TYPE;
use kairos_core::RequestContext;
use serde::de::DeserializeOwned;

use crate::{ExtractionError, ExtractionSource, FromRequest, DEFAULT_BODY_LIMIT};

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Extractor for `application/x-www-form-urlencoded` bodies.
///
/// ```rust
/// use kairos_extract::Form;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Login {
///     username: String,
///     password: String,
/// }
///
/// async fn login(Form(form): Form<Login>) -> String {
///     form.username
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form<T>(pub T);

impl<T> Form<T> {
    /// Consumes the Form and returns the inner value.
    #[must_use]
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> Deref for Form<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[async_trait]
impl<T: DeserializeOwned + Send> FromRequest for Form<T> {
    async fn from_request(ctx: &mut RequestContext) -> Result<Self, ExtractionError> {
        if let Some(content_type) = ctx.header(CONTENT_TYPE) {
            if !content_type
                .to_ascii_lowercase()
                .starts_with(FORM_CONTENT_TYPE)
            {
                return Err(ExtractionError::unsupported_media_type(
                    FORM_CONTENT_TYPE,
                    Some(content_type),
                ));
            }
        }

        let body = ctx.read_body(DEFAULT_BODY_LIMIT).await?;
        if body.is_empty() {
            return Err(ExtractionError::deserialization_failed(
                ExtractionSource::Body,
                "empty request body",
            ));
        }

        let text = std::str::from_utf8(&body)
            .map_err(|e| ExtractionError::deserialization_failed(ExtractionSource::Body, e))?;

        serde_urlencoded::from_str(text)
            .map(Form)
            .map_err(|e| ExtractionError::deserialization_failed(ExtractionSource::Body, e))
    }
}
