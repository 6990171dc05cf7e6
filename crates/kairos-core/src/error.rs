//! Error types shared across the framework.

use thiserror::Error;

/// Boxed error used for body and handler failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure while reading a request body.
#[derive(Debug, Error)]
pub enum BodyError {
    /// The body exceeded the configured limit.
    #[error("request body exceeds the limit of {limit} bytes")]
    TooLarge {
        /// Limit that was exceeded, in bytes.
        limit: usize,
    },

    /// The body stream failed.
    #[error("failed to read request body: {0}")]
    Read(String),

    /// The body was already taken by an earlier consumer.
    #[error("request body has already been consumed")]
    Consumed,
}

/// A query string that is not valid `application/x-www-form-urlencoded`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// A `%` not followed by two hex digits.
    #[error("malformed percent-escape at byte {offset} of the query string")]
    MalformedEscape {
        /// Byte offset of the `%`.
        offset: usize,
    },

    /// The decoded bytes are not UTF-8.
    #[error("query string does not decode to valid UTF-8")]
    InvalidUtf8,

    /// The pairs could not be decoded.
    #[error("malformed query string: {0}")]
    Malformed(String),
}

/// Failure while resolving shared state.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    /// No value of the requested type is bound for the route's scope.
    #[error("no state of type `{type_name}` is registered for this route")]
    Missing {
        /// Name of the missing type.
        type_name: &'static str,
    },
}

impl StateError {
    /// Creates a `Missing` error for `T`.
    #[must_use]
    pub fn missing<T>() -> Self {
        Self::Missing {
            type_name: std::any::type_name::<T>(),
        }
    }
}

/// A failure reported by user handler code.
///
/// Converted into a `500 Internal Server Error` at the pipeline boundary.
/// The message is logged but never sent to the client.
#[derive(Debug, Error)]
#[error("{message}")]
pub struct HandlerFault {
    message: String,
    #[source]
    source: Option<BoxError>,
}

impl HandlerFault {
    /// Creates a fault with a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a fault wrapping an underlying error.
    pub fn with_source(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// The fault message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl From<std::io::Error> for HandlerFault {
    fn from(err: std::io::Error) -> Self {
        Self::with_source("I/O error", err)
    }
}

impl From<serde_json::Error> for HandlerFault {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source("JSON error", err)
    }
}

impl From<StateError> for HandlerFault {
    fn from(err: StateError) -> Self {
        Self::new(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_body_error_display() {
        assert_eq!(
            BodyError::TooLarge { limit: 16 }.to_string(),
            "request body exceeds the limit of 16 bytes"
        );
    }

    #[test]
    fn test_state_error_names_type() {
        let err = StateError::missing::<String>();
        assert_eq!(
            err,
            StateError::Missing {
                type_name: "alloc::string::String"
            }
        );
    }

    #[test]
    fn test_handler_fault_source() {
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk gone");
        let fault = HandlerFault::from(io);
        assert_eq!(fault.message(), "I/O error");
        assert_eq!(fault.source().unwrap().to_string(), "disk gone");
    }
}
