//! Test client errors.

use thiserror::Error;

/// Errors raised while building a test request or reading its response.
#[derive(Debug, Error)]
pub enum TestError {
    /// The request URI did not parse.
    #[error("invalid request URI `{uri}`: {reason}")]
    InvalidUri {
        /// The rejected URI.
        uri: String,
        /// Parser message.
        reason: String,
    },

    /// A header name or value was rejected.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// A request body could not be encoded.
    #[error("failed to encode request body: {0}")]
    Encode(String),

    /// The response body is not valid UTF-8.
    #[error("response body is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    /// JSON encoding or decoding failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The response body could not be collected.
    #[error("failed to read response body: {0}")]
    BodyRead(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = TestError::InvalidUri {
            uri: "http://[".to_string(),
            reason: "invalid authority".to_string(),
        };
        assert_eq!(err.to_string(), "invalid request URI `http://[`: invalid authority");
        assert_eq!(
            TestError::InvalidHeader("x y".to_string()).to_string(),
            "invalid header: x y"
        );
    }
}
