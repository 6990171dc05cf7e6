//! Extraction error types.
//!
//! Every failed extraction carries a [`Rejection`] kind that decides the
//! response status, the source it was reading from, and a message.

use std::fmt;

use http::StatusCode;
use kairos_core::{BodyError, StateError};
use thiserror::Error;

/// Where an extractor was reading from when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractionSource {
    /// Path parameters (e.g., `/users/{id}`)
    Path,
    /// Query string parameters
    Query,
    /// Request body (JSON, form, etc.)
    Body,
    /// HTTP headers
    Header,
    /// Content-Type header specifically
    ContentType,
    /// Scope state
    State,
    /// Values placed in the request locals by middleware
    Local,
    /// Connection-level data such as protocol upgrades
    Connection,
}

impl fmt::Display for ExtractionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Path => "path",
            Self::Query => "query",
            Self::Body => "body",
            Self::Header => "header",
            Self::ContentType => "content-type",
            Self::State => "state",
            Self::Local => "local",
            Self::Connection => "connection",
        })
    }
}

/// The class of an extraction failure, fixing its HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Rejection {
    /// Malformed or missing client input: `400`.
    BadRequest,
    /// Missing or invalid credentials: `401`.
    Unauthorized,
    /// Referenced resource does not exist: `404`.
    NotFound,
    /// Body exceeded the configured limit: `413`.
    PayloadTooLarge,
    /// Wrong `Content-Type`: `415`.
    UnsupportedMediaType,
    /// Server-side misconfiguration, e.g. unregistered state: `500`.
    InternalServerError,
}

impl Rejection {
    /// The HTTP status for this kind.
    #[must_use]
    pub const fn status_code(self) -> StatusCode {
        match self {
            Self::BadRequest => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::InternalServerError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error that occurs during extraction.
///
/// # Example
///
/// ```rust
/// use kairos_extract::{ExtractionError, ExtractionSource, Rejection};
/// use http::StatusCode;
///
/// let err = ExtractionError::missing(ExtractionSource::Path, "user_id");
/// assert_eq!(err.kind(), Rejection::BadRequest);
/// assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
/// assert_eq!(err.extraction_source(), ExtractionSource::Path);
/// assert!(err.to_string().contains("user_id"));
/// ```
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct ExtractionError {
    kind: Rejection,
    extraction_source: ExtractionSource,
    code: &'static str,
    field: Option<String>,
    message: String,
}

impl ExtractionError {
    /// Creates an error of any kind.
    #[must_use]
    pub fn new(
        kind: Rejection,
        source: ExtractionSource,
        code: &'static str,
        message: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            extraction_source: source,
            code,
            field: None,
            message: message.into(),
        }
    }

    /// Attaches the name of the offending field.
    #[must_use]
    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    /// A required field or parameter is missing.
    #[must_use]
    pub fn missing(source: ExtractionSource, field: impl Into<String>) -> Self {
        let field = field.into();
        Self::new(
            Rejection::BadRequest,
            source,
            "MISSING_PARAMETER",
            format!("missing required {source} parameter: {field}"),
        )
        .with_field(field)
    }

    /// A value could not be parsed into the requested type.
    #[must_use]
    pub fn invalid_type(
        source: ExtractionSource,
        field: impl Into<String>,
        details: impl fmt::Display,
    ) -> Self {
        let field = field.into();
        Self::new(
            Rejection::BadRequest,
            source,
            "INVALID_PARAMETER",
            format!("invalid {source} parameter '{field}': {details}"),
        )
        .with_field(field)
    }

    /// A payload could not be decoded.
    #[must_use]
    pub fn deserialization_failed(source: ExtractionSource, details: impl fmt::Display) -> Self {
        Self::new(
            Rejection::BadRequest,
            source,
            "DESERIALIZATION_FAILED",
            format!("failed to deserialize {source}: {details}"),
        )
    }

    /// The body exceeded `limit` bytes.
    #[must_use]
    pub fn payload_too_large(limit: usize) -> Self {
        Self::new(
            Rejection::PayloadTooLarge,
            ExtractionSource::Body,
            "PAYLOAD_TOO_LARGE",
            format!("payload too large: limit is {limit} bytes"),
        )
    }

    /// The `Content-Type` is not the one the extractor accepts.
    #[must_use]
    pub fn unsupported_media_type(expected: &str, actual: Option<&str>) -> Self {
        let actual = actual.unwrap_or("none");
        Self::new(
            Rejection::UnsupportedMediaType,
            ExtractionSource::ContentType,
            "UNSUPPORTED_MEDIA_TYPE",
            format!("unsupported content type: expected '{expected}', got '{actual}'"),
        )
    }

    /// Credentials are missing or invalid.
    #[must_use]
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(
            Rejection::Unauthorized,
            ExtractionSource::Header,
            "UNAUTHORIZED",
            message,
        )
    }

    /// A referenced resource does not exist.
    #[must_use]
    pub fn not_found(source: ExtractionSource, message: impl Into<String>) -> Self {
        Self::new(Rejection::NotFound, source, "NOT_FOUND", message)
    }

    /// A server-side precondition is not met.
    #[must_use]
    pub fn internal(source: ExtractionSource, message: impl Into<String>) -> Self {
        Self::new(
            Rejection::InternalServerError,
            source,
            "EXTRACTION_FAILED",
            message,
        )
    }

    /// The failure class.
    #[must_use]
    pub const fn kind(&self) -> Rejection {
        self.kind
    }

    /// Returns the extraction source.
    #[must_use]
    pub const fn extraction_source(&self) -> ExtractionSource {
        self.extraction_source
    }

    /// Returns the field name if applicable.
    #[must_use]
    pub fn field(&self) -> Option<&str> {
        self.field.as_deref()
    }

    /// Human-readable message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        self.kind.status_code()
    }

    /// Returns the machine-readable code used in error envelopes.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        self.code
    }
}

impl From<BodyError> for ExtractionError {
    fn from(err: BodyError) -> Self {
        match err {
            BodyError::TooLarge { limit } => Self::payload_too_large(limit),
            BodyError::Read(details) => Self::new(
                Rejection::BadRequest,
                ExtractionSource::Body,
                "BODY_READ_FAILED",
                format!("failed to read request body: {details}"),
            ),
            BodyError::Consumed => Self::internal(
                ExtractionSource::Body,
                "request body was already consumed by an earlier extractor",
            ),
        }
    }
}

impl From<StateError> for ExtractionError {
    fn from(err: StateError) -> Self {
        let StateError::Missing { type_name } = &err;
        let field = *type_name;
        Self::new(
            Rejection::InternalServerError,
            ExtractionSource::State,
            "STATE_NOT_REGISTERED",
            err.to_string(),
        )
        .with_field(field)
    }
}
