//! The root configuration type.

use std::net::SocketAddr;

use kairos_server::ServerConfig;
use kairos_telemetry::LogConfig;
use serde::{Deserialize, Serialize};

use crate::{ConfigError, LogFormat, LoggingSection, ServerSection};

/// Complete Kairos configuration.
///
/// Load it with [`ConfigLoader`](crate::ConfigLoader), or start from a preset.
///
/// ```
/// use kairos_config::KairosConfig;
///
/// let config = KairosConfig::default();
/// assert_eq!(config.server.http_addr, "0.0.0.0:8080");
/// assert_eq!(config.logging.level, "info");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(deny_unknown_fields)]
pub struct KairosConfig {
    /// Listener and connection settings.
    #[serde(default)]
    pub server: ServerSection,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingSection,
}

impl KairosConfig {
    /// Checks values that deserialize fine but cannot be used.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.http_addr.parse::<SocketAddr>().is_err() {
            return Err(ConfigError::invalid_value(
                "server.http_addr",
                format!("invalid socket address: {}", self.server.http_addr),
            ));
        }
        if self.server.workers == Some(0) {
            return Err(ConfigError::invalid_value("server.workers", "must be at least 1"));
        }
        if self.server.max_connections == Some(0) {
            return Err(ConfigError::invalid_value(
                "server.max_connections",
                "must be at least 1",
            ));
        }
        if self.server.idle_timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "server.idle_timeout_secs",
                "must be positive",
            ));
        }
        if let Err(err) = kairos_telemetry::create_env_filter(&self.logging.level) {
            return Err(ConfigError::invalid_value("logging.level", err.to_string()));
        }
        Ok(())
    }

    /// Pretty `debug` logs with spans and source locations.
    ///
    /// ```
    /// use kairos_config::{KairosConfig, LogFormat};
    ///
    /// let config = KairosConfig::development();
    /// assert_eq!(config.logging.format, LogFormat::Pretty);
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.server.http_addr = "127.0.0.1:8080".to_string();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.span_events = true;
        config.logging.file_line_info = true;
        config
    }

    /// JSON `info` logs and a bounded connection count.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.server.max_connections = Some(10_000);
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config
    }

    /// Runtime server configuration.
    #[must_use]
    pub fn server_config(&self) -> ServerConfig {
        self.server.to_server_config()
    }

    /// Logging configuration for `kairos_telemetry::init_logging`.
    #[must_use]
    pub fn log_config(&self) -> LogConfig {
        self.logging.to_log_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(KairosConfig::default().validate().is_ok());
        assert!(KairosConfig::development().validate().is_ok());
        assert!(KairosConfig::production().validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_server_addr() {
        let mut config = KairosConfig::default();
        config.server.http_addr = "localhost".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.http_addr"));
    }

    #[test]
    fn test_validate_zero_workers() {
        let mut config = KairosConfig::default();
        config.server.workers = Some(0);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { ref field, .. }) if field == "server.workers"
        ));
    }

    #[test]
    fn test_zero_request_timeout_disables_it() {
        let mut config = KairosConfig::default();
        config.server.request_timeout_ms = Some(0);
        assert!(config.validate().is_ok());
        assert_eq!(config.server_config().request_timeout(), None);
    }

    #[test]
    fn test_validate_bad_log_level() {
        let mut config = KairosConfig::default();
        config.logging.level = "kairos=loud".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));
    }

    #[test]
    fn test_development_preset() {
        let config = KairosConfig::development();
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.span_events);
        assert!(!config.log_config().json_format);
    }

    #[test]
    fn test_production_preset() {
        let config = KairosConfig::production();
        assert_eq!(config.server_config().max_connections(), Some(10_000));
        assert!(config.log_config().json_format);
    }

    #[test]
    fn test_toml_round_trip_keeps_defaults() {
        let config: KairosConfig = toml::from_str("[server]\nbacklog = 64\n").unwrap();
        assert_eq!(config.server.backlog, 64);
        assert_eq!(config.server.http_addr, "0.0.0.0:8080");
        assert_eq!(config.logging, LoggingSection::default());
    }

    #[test]
    fn test_unknown_section_rejected() {
        let result: Result<KairosConfig, _> = toml::from_str("[telemetry]\nenabled = true\n");
        assert!(result.is_err());
    }
}
