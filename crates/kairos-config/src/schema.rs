//! Configuration sections.

use std::time::Duration;

use kairos_server::{
    ServerConfig, DEFAULT_BACKLOG, DEFAULT_HTTP_ADDR, DEFAULT_IDLE_TIMEOUT_SECS,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SHUTDOWN_TIMEOUT_SECS,
    DEFAULT_TLS_HANDSHAKE_TIMEOUT_SECS,
};
use kairos_telemetry::{LogConfig, DEFAULT_SERVICE_NAME};
use serde::{Deserialize, Serialize};

/// `[server]` section.
///
/// ```
/// use kairos_config::ServerSection;
///
/// let section = ServerSection {
///     http_addr: "127.0.0.1:3000".to_string(),
///     max_connections: Some(512),
///     ..Default::default()
/// };
/// let config = section.to_server_config();
/// assert_eq!(config.max_connections(), Some(512));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServerSection {
    /// Bind address, e.g. `"0.0.0.0:8080"`.
    #[serde(default = "default_http_addr")]
    pub http_addr: String,

    /// Runtime worker threads. Unset means one per available core.
    #[serde(default)]
    pub workers: Option<usize>,

    /// Graceful shutdown deadline in seconds.
    #[serde(default = "default_shutdown_timeout")]
    pub shutdown_timeout_secs: u64,

    /// Whole-request deadline in milliseconds. `0` disables it.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_ms: Option<u64>,

    /// Header-read and keep-alive idle timeout in seconds.
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    /// Whether connections are kept alive between requests.
    #[serde(default = "default_true")]
    pub keep_alive: bool,

    /// Connection limit. Unset means unlimited.
    #[serde(default)]
    pub max_connections: Option<usize>,

    /// Listen backlog.
    #[serde(default = "default_backlog")]
    pub backlog: u32,

    /// TLS handshake deadline in seconds.
    #[serde(default = "default_tls_handshake_timeout")]
    pub tls_handshake_timeout_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
            workers: None,
            shutdown_timeout_secs: default_shutdown_timeout(),
            request_timeout_ms: default_request_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            keep_alive: true,
            max_connections: None,
            backlog: default_backlog(),
            tls_handshake_timeout_secs: default_tls_handshake_timeout(),
        }
    }
}

impl ServerSection {
    /// Converts the section into the server's runtime configuration.
    #[must_use]
    pub fn to_server_config(&self) -> ServerConfig {
        let mut builder = ServerConfig::builder()
            .http_addr(self.http_addr.clone())
            .shutdown_timeout(Duration::from_secs(self.shutdown_timeout_secs))
            .request_timeout(
                self.request_timeout_ms
                    .filter(|ms| *ms > 0)
                    .map(Duration::from_millis),
            )
            .idle_timeout(Duration::from_secs(self.idle_timeout_secs))
            .keep_alive(self.keep_alive)
            .max_connections(self.max_connections)
            .backlog(self.backlog)
            .tls_handshake_timeout(Duration::from_secs(self.tls_handshake_timeout_secs));
        if let Some(workers) = self.workers {
            builder = builder.workers(workers);
        }
        builder.build()
    }
}

fn default_http_addr() -> String {
    DEFAULT_HTTP_ADDR.to_string()
}

fn default_shutdown_timeout() -> u64 {
    DEFAULT_SHUTDOWN_TIMEOUT_SECS
}

#[allow(clippy::unnecessary_wraps)]
fn default_request_timeout() -> Option<u64> {
    Some(DEFAULT_REQUEST_TIMEOUT_SECS * 1000)
}

fn default_idle_timeout() -> u64 {
    DEFAULT_IDLE_TIMEOUT_SECS
}

fn default_backlog() -> u32 {
    DEFAULT_BACKLOG
}

fn default_tls_handshake_timeout() -> u64 {
    DEFAULT_TLS_HANDSHAKE_TIMEOUT_SECS
}

fn default_true() -> bool {
    true
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Multi-line human-readable output.
    Pretty,
}

/// `[logging]` section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingSection {
    /// Install a subscriber at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive, e.g. `"info"` or `"kairos_server=debug,warn"`.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Emit span open and close events.
    #[serde(default)]
    pub span_events: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_line_info: bool,

    /// Include thread ids.
    #[serde(default)]
    pub thread_ids: bool,

    /// Include event targets.
    #[serde(default = "default_true")]
    pub include_target: bool,

    /// Service name attached to the startup line.
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::Json,
            span_events: false,
            file_line_info: false,
            thread_ids: false,
            include_target: true,
            service_name: default_service_name(),
        }
    }
}

impl LoggingSection {
    /// Converts the section into a [`LogConfig`] for `init_logging`.
    #[must_use]
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            json_format: self.format == LogFormat::Json,
            span_events: self.span_events,
            file_line_info: self.file_line_info,
            thread_ids: self.thread_ids,
            include_target: self.include_target,
            service_name: self.service_name.clone(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_service_name() -> String {
    DEFAULT_SERVICE_NAME.to_string()
}
