//! Build-time, server and connection errors.

use std::time::Duration;

use http::Method;
use kairos_router::{CompileError, InsertError};
use thiserror::Error;

/// The route registry could not be built or modified.
///
/// Every variant is a startup-time programming error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A route or scope pattern is malformed.
    #[error(transparent)]
    Compile(#[from] CompileError),

    /// The registry was already built.
    #[error("route registry is frozen: it has already been built")]
    Frozen,

    /// Two routes with the same method have the same structure.
    #[error("duplicate route {method} {pattern}: conflicts with `{existing}`")]
    DuplicateRoute {
        /// Method of the rejected route.
        method: Method,
        /// Pattern of the rejected route.
        pattern: String,
        /// Pattern registered first.
        existing: String,
    },
}

impl From<InsertError> for RegistryError {
    fn from(err: InsertError) -> Self {
        match err {
            InsertError::DuplicateRoute {
                method,
                pattern,
                existing,
            } => Self::DuplicateRoute {
                method,
                pattern,
                existing,
            },
        }
    }
}

/// The server failed to start or stopped abnormally.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address is invalid or could not be bound.
    #[error("bind error: {0}")]
    BindError(String),

    /// An I/O error outside any single connection.
    #[error("I/O error: {0}")]
    IoError(String),

    /// The server was built without a service.
    #[error("no service configured; call `ServerBuilder::service`")]
    MissingService,
}

/// A single connection failed. Only that connection is closed.
#[derive(Debug, Error)]
pub enum ConnectionFault {
    /// Reading from or writing to the socket failed.
    #[error("connection I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The TLS handshake failed.
    #[error("TLS handshake failed: {0}")]
    Tls(String),

    /// The TLS handshake did not finish in time.
    #[error("TLS handshake timed out after {0:?}")]
    HandshakeTimeout(Duration),

    /// HTTP protocol error on the connection.
    #[error("HTTP connection error: {0}")]
    Http(#[from] hyper::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_error_conversion() {
        let err = RegistryError::from(InsertError::DuplicateRoute {
            method: Method::GET,
            pattern: "/a/{y}".into(),
            existing: "/a/{x}".into(),
        });
        assert!(matches!(err, RegistryError::DuplicateRoute { ref existing, .. } if existing == "/a/{x}"));
    }

    #[test]
    fn test_compile_error_is_transparent() {
        let compile = CompileError::InvalidPattern {
            pattern: "/a/*/b".into(),
            reason: "wildcard must be the final segment".into(),
        };
        let err = RegistryError::from(compile.clone());
        assert_eq!(err.to_string(), compile.to_string());
    }

    #[test]
    fn test_fault_display() {
        let fault = ConnectionFault::HandshakeTimeout(Duration::from_secs(10));
        assert!(fault.to_string().contains("10s"));
    }
}
