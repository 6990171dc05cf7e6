//! Telemetry errors.

use thiserror::Error;

/// Errors raised while setting up logging.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The global subscriber could not be installed, usually because one is
    /// already set.
    #[error("failed to initialize logging: {0}")]
    LoggingInit(String),

    /// A filter directive did not parse.
    #[error("invalid log filter `{directive}`: {reason}")]
    InvalidFilter {
        /// The rejected directive.
        directive: String,
        /// Parser message.
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = TelemetryError::LoggingInit("already set".to_string());
        assert_eq!(err.to_string(), "failed to initialize logging: already set");

        let err = TelemetryError::InvalidFilter {
            directive: "x=loud".to_string(),
            reason: "invalid level".to_string(),
        };
        assert!(err.to_string().contains("`x=loud`"));
    }
}
