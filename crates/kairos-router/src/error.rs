//! Router error types.

use http::Method;
use thiserror::Error;

/// A route pattern could not be compiled.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The pattern violates the pattern grammar.
    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern {
        /// The pattern as it was given.
        pattern: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl CompileError {
    pub(crate) fn invalid(pattern: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPattern {
            pattern: pattern.into(),
            reason: reason.into(),
        }
    }

    /// Returns the offending pattern.
    #[must_use]
    pub fn pattern(&self) -> &str {
        match self {
            Self::InvalidPattern { pattern, .. } => pattern,
        }
    }
}

/// A route could not be added to a [`RouterBuilder`](crate::RouterBuilder).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InsertError {
    /// Another route with the same method already has the same structure.
    #[error("duplicate route {method} {pattern}: conflicts with `{existing}`")]
    DuplicateRoute {
        /// Method of the rejected route.
        method: Method,
        /// Pattern of the rejected route.
        pattern: String,
        /// Pattern of the route that was registered first.
        existing: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_error_display() {
        let err = CompileError::invalid("/a/*/b", "wildcard must be the final segment");
        assert_eq!(
            err.to_string(),
            "invalid route pattern `/a/*/b`: wildcard must be the final segment"
        );
        assert_eq!(err.pattern(), "/a/*/b");
    }

    #[test]
    fn test_insert_error_display() {
        let err = InsertError::DuplicateRoute {
            method: Method::GET,
            pattern: "/a/{y}".to_string(),
            existing: "/a/{x}".to_string(),
        };
        assert!(err.to_string().contains("GET /a/{y}"));
        assert!(err.to_string().contains("/a/{x}"));
    }
}
