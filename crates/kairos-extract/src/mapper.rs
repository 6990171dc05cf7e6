//! Rendering of extraction failures.

use kairos_core::{Response, ResponseExt};

use crate::ExtractionError;

/// Turns a failed extraction into the response sent to the client.
///
/// Registered per application; closures of type
/// `Fn(ExtractionError) -> Response` implement it directly.
pub trait ErrorMapper: Send + Sync + 'static {
    /// Renders `err`.
    fn map(&self, err: ExtractionError) -> Response;
}

/// Renders the JSON envelope `{"error":{"code":..,"message":..}}` with the
/// status of the rejection.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultErrorMapper;

impl ErrorMapper for DefaultErrorMapper {
    fn map(&self, err: ExtractionError) -> Response {
        tracing::debug!(
            source = %err.extraction_source(),
            code = err.error_code(),
            error = %err,
            "request rejected by extractor"
        );
        Response::json_error(err.status_code(), err.error_code(), err.message())
    }
}

impl<F> ErrorMapper for F
where
    F: Fn(ExtractionError) -> Response + Send + Sync + 'static,
{
    fn map(&self, err: ExtractionError) -> Response {
        self(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ExtractionSource;
    use http::StatusCode;

    #[test]
    fn test_default_mapper_uses_rejection_status() {
        let response =
            DefaultErrorMapper.map(ExtractionError::payload_too_large(16));
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[test]
    fn test_closure_mapper() {
        let mapper = |err: ExtractionError| Response::text(StatusCode::IM_A_TEAPOT, err.to_string());
        let response = mapper.map(ExtractionError::missing(ExtractionSource::Path, "id"));
        assert_eq!(response.status(), StatusCode::IM_A_TEAPOT);
    }
}
