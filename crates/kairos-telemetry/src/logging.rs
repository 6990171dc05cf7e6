//! Structured logging setup.
//!
//! Installs a global `tracing` subscriber: an [`EnvFilter`] in front of a
//! `fmt` layer that writes either JSON lines or multi-line pretty output.
//!
//! ```rust,ignore
//! use kairos_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(http.method = "GET", http.path = "/users/7", "request received");
//! ```

use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Default service name attached to the startup log line.
pub const DEFAULT_SERVICE_NAME: &str = "kairos";

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    /// When `false`, [`init_logging`] installs nothing.
    pub enabled: bool,

    /// Filter directive, e.g. `"info"` or `"kairos_server=debug,warn"`.
    pub level: String,

    /// JSON lines when `true`, pretty output otherwise.
    pub json_format: bool,

    /// Emit span open and close events.
    pub span_events: bool,

    /// Include source file and line.
    pub file_line_info: bool,

    /// Include thread ids.
    pub thread_ids: bool,

    /// Include the event target (module path).
    pub include_target: bool,

    /// Name of the service, logged once at startup.
    pub service_name: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl LogConfig {
    /// Human-readable output at `debug`, with spans and source locations.
    #[must_use]
    pub fn development() -> Self {
        Self {
            enabled: true,
            level: "debug".to_string(),
            json_format: false,
            span_events: true,
            file_line_info: true,
            thread_ids: false,
            include_target: true,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }

    /// JSON lines at `info`.
    #[must_use]
    pub fn production() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            json_format: true,
            span_events: false,
            file_line_info: false,
            thread_ids: false,
            include_target: true,
            service_name: DEFAULT_SERVICE_NAME.to_string(),
        }
    }

    /// Checks that `level` is a valid filter directive.
    pub fn validate(&self) -> TelemetryResult<()> {
        create_env_filter(&self.level).map(|_| ())
    }

    fn span_events(&self) -> FmtSpan {
        if self.span_events {
            FmtSpan::NEW | FmtSpan::CLOSE
        } else {
            FmtSpan::NONE
        }
    }
}

/// Installs the global subscriber described by `config`.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] for a bad `level` and
/// [`TelemetryError::LoggingInit`] if a global subscriber is already set.
pub fn init_logging(config: &LogConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }
    let filter = create_env_filter(&config.level)?;

    // Exactly one of the two layers is present.
    let json = config.json_format.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_span_events(config.span_events())
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_thread_ids(config.thread_ids)
            .with_target(config.include_target)
    });
    let pretty = (!config.json_format).then(|| {
        tracing_subscriber::fmt::layer()
            .pretty()
            .with_span_events(config.span_events())
            .with_file(config.file_line_info)
            .with_line_number(config.file_line_info)
            .with_thread_ids(config.thread_ids)
            .with_target(config.include_target)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json)
        .with(pretty)
        .try_init()
        .map_err(|e| TelemetryError::LoggingInit(e.to_string()))?;

    tracing::info!(
        service.name = %config.service_name,
        level = %config.level,
        json = config.json_format,
        "logging initialised"
    );
    Ok(())
}

/// Parses a filter directive such as `"info"` or `"kairos_router=trace"`.
///
/// # Errors
///
/// Returns [`TelemetryError::InvalidFilter`] if the directive does not parse.
pub fn create_env_filter(directive: &str) -> TelemetryResult<EnvFilter> {
    EnvFilter::try_new(directive).map_err(|e| TelemetryError::InvalidFilter {
        directive: directive.to_string(),
        reason: e.to_string(),
    })
}

/// Canonical field names used in Kairos log events.
pub mod fields {
    /// Request id.
    pub const REQUEST_ID: &str = "request_id";

    /// HTTP method.
    pub const HTTP_METHOD: &str = "http.method";

    /// Request path, without the query string.
    pub const HTTP_PATH: &str = "http.path";

    /// Response status code.
    pub const HTTP_STATUS: &str = "http.status_code";

    /// Elapsed time in milliseconds.
    pub const DURATION_MS: &str = "duration_ms";

    /// Peer address.
    pub const REMOTE_ADDR: &str = "remote_addr";

    /// `User-Agent` header.
    pub const USER_AGENT: &str = "user_agent";

    /// Matched route pattern.
    pub const ROUTE: &str = "route";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_production() {
        let config = LogConfig::default();
        assert_eq!(config, LogConfig::production());
        assert!(config.json_format);
        assert_eq!(config.level, "info");
        assert_eq!(config.service_name, "kairos");
    }

    #[test]
    fn test_development_config() {
        let config = LogConfig::development();
        assert!(!config.json_format);
        assert!(config.span_events);
        assert!(config.file_line_info);
        assert_eq!(config.level, "debug");
    }

    #[test]
    fn test_create_env_filter() {
        assert!(create_env_filter("info").is_ok());
        assert!(create_env_filter("kairos_server=debug,warn").is_ok());

        let err = create_env_filter("kairos_server=loud").unwrap_err();
        assert!(matches!(err, TelemetryError::InvalidFilter { ref directive, .. } if directive == "kairos_server=loud"));
    }

    #[test]
    fn test_validate() {
        let mut config = LogConfig::production();
        assert!(config.validate().is_ok());
        config.level = "kairos=loud".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_disabled_logging_installs_nothing() {
        let config = LogConfig {
            enabled: false,
            level: "not a directive ===".to_string(),
            ..LogConfig::default()
        };
        assert!(init_logging(&config).is_ok());
    }

    #[test]
    fn test_field_names() {
        assert_eq!(fields::HTTP_STATUS, "http.status_code");
        assert_eq!(fields::ROUTE, "route");
    }
}
