//! Layered configuration loading.

use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use serde_json::Value;

use crate::{ConfigError, KairosConfig, LogFormat};

/// Builds a [`KairosConfig`] from layers, later layers winning:
///
/// 1. defaults or a preset
/// 2. configuration files (TOML or JSON), merged field by field
/// 3. a `.env` file, which only feeds the process environment
/// 4. `PREFIX__SECTION__KEY` environment variables
///
/// ```no_run
/// use kairos_config::ConfigLoader;
///
/// # fn main() -> Result<(), kairos_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_optional_file("kairos.toml")?
///     .with_dotenv()?
///     .with_env_prefix("KAIROS")
///     .load()?;
///
/// println!("listening on {}", config.server.http_addr);
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct ConfigLoader {
    config: KairosConfig,
    env_prefix: Option<String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Creates a loader starting from [`KairosConfig::default`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: KairosConfig::default(),
            env_prefix: None,
        }
    }

    /// Resets to default values.
    #[must_use]
    pub fn with_defaults(mut self) -> Self {
        self.config = KairosConfig::default();
        self
    }

    /// Resets to the development preset.
    ///
    /// ```
    /// use kairos_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new().with_development().load().unwrap();
    /// assert_eq!(config.logging.level, "debug");
    /// ```
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = KairosConfig::development();
        self
    }

    /// Resets to the production preset.
    #[must_use]
    pub fn with_production(mut self) -> Self {
        self.config = KairosConfig::production();
        self
    }

    /// Merges a `.toml` or `.json` file over the current values.
    ///
    /// Fields the file does not mention keep their current value.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file is missing or unreadable, has an
    /// unsupported extension, does not parse, or contains unknown fields.
    pub fn with_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .ok_or_else(|| ConfigError::UnsupportedFormat(path.display().to_string()))?;
        let loader = self.with_string(&content, format)?;
        tracing::debug!(path = %path.display(), "configuration file loaded");
        Ok(loader)
    }

    /// Like [`with_file`](Self::with_file), but a missing file is skipped.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Merges configuration text in the given format (`"toml"` or `"json"`).
    ///
    /// ```
    /// use kairos_config::ConfigLoader;
    ///
    /// let config = ConfigLoader::new()
    ///     .with_string("[server]\nhttp_addr = \"127.0.0.1:3000\"", "toml")
    ///     .unwrap()
    ///     .load()
    ///     .unwrap();
    ///
    /// assert_eq!(config.server.http_addr, "127.0.0.1:3000");
    /// assert_eq!(config.server.backlog, 1024);
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` for an unknown format, a parse error or an
    /// unknown field.
    pub fn with_string(mut self, content: &str, format: &str) -> Result<Self, ConfigError> {
        // Strict parse first so unknown fields are reported in the file's own syntax.
        let layer: Value = match format.to_ascii_lowercase().as_str() {
            "toml" => {
                toml::from_str::<KairosConfig>(content)?;
                toml::from_str(content)?
            }
            "json" => {
                serde_json::from_str::<KairosConfig>(content)?;
                serde_json::from_str(content)?
            }
            other => return Err(ConfigError::UnsupportedFormat(other.to_string())),
        };

        let mut merged = serde_json::to_value(&self.config)?;
        merge_values(&mut merged, layer);
        self.config = serde_json::from_value(merged)?;
        Ok(self)
    }

    /// Enables environment overrides of the form `PREFIX__SECTION__KEY`,
    /// e.g. `KAIROS__SERVER__HTTP_ADDR=0.0.0.0:9000`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Loads `.env` from the current directory or its parents, if present.
    ///
    /// Variables already set in the environment are not replaced.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DotenvError`] if a `.env` file exists but is
    /// malformed or unreadable.
    pub fn with_dotenv(self) -> Result<Self, ConfigError> {
        match dotenvy::dotenv() {
            Ok(path) => tracing::debug!(path = %path.display(), ".env loaded"),
            Err(err) if err.not_found() => {}
            Err(err) => return Err(ConfigError::DotenvError(err.to_string())),
        }
        Ok(self)
    }

    /// Loads a specific env file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DotenvError`] if the file is missing or malformed.
    pub fn with_dotenv_file<P: AsRef<Path>>(self, path: P) -> Result<Self, ConfigError> {
        dotenvy::from_path(path.as_ref()).map_err(|e| ConfigError::DotenvError(e.to_string()))?;
        Ok(self)
    }

    /// Applies environment overrides and validates the result.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if an override does not parse or validation fails.
    pub fn load(mut self) -> Result<KairosConfig, ConfigError> {
        if let Some(prefix) = self.env_prefix.take() {
            self.apply_env_vars(&prefix, env::vars())?;
        }
        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the current values without environment overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> KairosConfig {
        self.config
    }

    fn apply_env_vars<I>(&mut self, prefix: &str, vars: I) -> Result<(), ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let marker = format!("{prefix}__");
        for (key, value) in vars {
            if let Some(path) = key.strip_prefix(&marker) {
                self.apply_env_var(&key, path, &value)?;
            }
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, path: &str, value: &str) -> Result<(), ConfigError> {
        let server = &mut self.config.server;
        let logging = &mut self.config.logging;
        let parts: Vec<&str> = path.split("__").collect();

        match parts.as_slice() {
            ["SERVER", "HTTP_ADDR"] => server.http_addr = value.to_string(),
            ["SERVER", "WORKERS"] => server.workers = Some(parse_number(key, value)?),
            ["SERVER", "SHUTDOWN_TIMEOUT_SECS"] => {
                server.shutdown_timeout_secs = parse_number(key, value)?;
            }
            ["SERVER", "REQUEST_TIMEOUT_MS"] => {
                server.request_timeout_ms = parse_optional(key, value)?;
            }
            ["SERVER", "IDLE_TIMEOUT_SECS"] => {
                server.idle_timeout_secs = parse_number(key, value)?;
            }
            ["SERVER", "KEEP_ALIVE"] => server.keep_alive = parse_flag(key, value)?,
            ["SERVER", "MAX_CONNECTIONS"] => {
                server.max_connections = parse_optional(key, value)?;
            }
            ["SERVER", "BACKLOG"] => server.backlog = parse_number(key, value)?,
            ["SERVER", "TLS_HANDSHAKE_TIMEOUT_SECS"] => {
                server.tls_handshake_timeout_secs = parse_number(key, value)?;
            }

            ["LOGGING", "ENABLED"] => logging.enabled = parse_flag(key, value)?,
            ["LOGGING", "LEVEL"] => logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                logging.format = match value.to_ascii_lowercase().as_str() {
                    "json" => LogFormat::Json,
                    "pretty" => LogFormat::Pretty,
                    _ => {
                        return Err(ConfigError::env_parse_error(
                            key,
                            "expected 'json' or 'pretty'",
                        ))
                    }
                };
            }
            ["LOGGING", "SPAN_EVENTS"] => logging.span_events = parse_flag(key, value)?,
            ["LOGGING", "FILE_LINE_INFO"] => logging.file_line_info = parse_flag(key, value)?,
            ["LOGGING", "THREAD_IDS"] => logging.thread_ids = parse_flag(key, value)?,
            ["LOGGING", "INCLUDE_TARGET"] => logging.include_target = parse_flag(key, value)?,
            ["LOGGING", "SERVICE_NAME"] => logging.service_name = value.to_string(),

            _ => tracing::warn!(var = key, "ignoring unknown configuration variable"),
        }
        Ok(())
    }
}

/// Recursively overlays `layer` onto `base`; objects merge, everything else replaces.
fn merge_values(base: &mut Value, layer: Value) {
    match (base, layer) {
        (Value::Object(base), Value::Object(layer)) => {
            for (key, value) in layer {
                match base.get_mut(&key) {
                    Some(slot) => merge_values(slot, value),
                    None => {
                        base.insert(key, value);
                    }
                }
            }
        }
        (base, layer) => *base = layer,
    }
}

fn parse_number<T: FromStr>(key: &str, value: &str) -> Result<T, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::env_parse_error(key, "expected a non-negative integer"))
}

/// `none` (any case) clears the value.
fn parse_optional<T: FromStr>(key: &str, value: &str) -> Result<Option<T>, ConfigError> {
    if value.trim().eq_ignore_ascii_case("none") {
        Ok(None)
    } else {
        parse_number(key, value).map(Some)
    }
}

fn parse_flag(key: &str, value: &str) -> Result<bool, ConfigError> {
    parse_bool(value).ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn test_loader_new() {
        let config = ConfigLoader::new().load().unwrap();
        assert_eq!(config, KairosConfig::default());
    }

    #[test]
    fn test_loader_with_production() {
        let config = ConfigLoader::new().with_production().load().unwrap();
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.server.max_connections, Some(10_000));
    }

    #[test]
    fn test_string_layer_keeps_preset_values() {
        let config = ConfigLoader::new()
            .with_development()
            .with_string("[server]\nbacklog = 16\n", "toml")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.server.backlog, 16);
        assert_eq!(config.server.http_addr, "127.0.0.1:8080");
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_later_layers_win() {
        let config = ConfigLoader::new()
            .with_string(r#"{"logging": {"level": "warn", "service_name": "first"}}"#, "json")
            .unwrap()
            .with_string(r#"{"logging": {"level": "error"}}"#, "json")
            .unwrap()
            .load()
            .unwrap();

        assert_eq!(config.logging.level, "error");
        assert_eq!(config.logging.service_name, "first");
    }

    #[test]
    fn test_json_null_clears_optional_field() {
        let config = ConfigLoader::new()
            .with_production()
            .with_string(r#"{"server": {"max_connections": null}}"#, "json")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.server.max_connections, None);
    }

    #[test]
    fn test_unknown_field_is_toml_error() {
        let err = ConfigLoader::new()
            .with_string("[server]\nhttp2_enabled = true\n", "toml")
            .unwrap_err();
        assert!(matches!(err, ConfigError::TomlError(_)));
    }

    #[test]
    fn test_unsupported_format() {
        let err = ConfigLoader::new().with_string("a: b", "yaml").unwrap_err();
        assert!(matches!(err, ConfigError::UnsupportedFormat(ref f) if f == "yaml"));
    }

    #[test]
    fn test_with_file_not_found() {
        let err = ConfigLoader::new().with_file("/nonexistent/kairos.toml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));
    }

    #[test]
    fn test_with_optional_file_not_found() {
        let config = ConfigLoader::new()
            .with_optional_file("/nonexistent/kairos.toml")
            .unwrap()
            .load()
            .unwrap();
        assert_eq!(config.server.http_addr, "0.0.0.0:8080");
    }

    #[test]
    fn test_load_validates() {
        let err = ConfigLoader::new()
            .with_string("[server]\nhttp_addr = \"nowhere\"\n", "toml")
            .unwrap()
            .load()
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_vars(
                "TEST",
                vars(&[
                    ("TEST__SERVER__HTTP_ADDR", "192.168.1.1:9000"),
                    ("TEST__SERVER__WORKERS", "2"),
                    ("TEST__SERVER__MAX_CONNECTIONS", "64"),
                    ("TEST__SERVER__REQUEST_TIMEOUT_MS", "none"),
                    ("TEST__LOGGING__FORMAT", "Pretty"),
                    ("TEST__LOGGING__THREAD_IDS", "yes"),
                    ("OTHER__SERVER__BACKLOG", "1"),
                ]),
            )
            .unwrap();

        let config = loader.load_unvalidated();
        assert_eq!(config.server.http_addr, "192.168.1.1:9000");
        assert_eq!(config.server.workers, Some(2));
        assert_eq!(config.server.max_connections, Some(64));
        assert_eq!(config.server.request_timeout_ms, None);
        assert_eq!(config.server.backlog, 1024);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.logging.thread_ids);
    }

    #[test]
    fn test_env_prefix_needs_double_underscore() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_vars("TEST", vars(&[("TESTING__SERVER__BACKLOG", "1")]))
            .unwrap();
        assert_eq!(loader.load_unvalidated().server.backlog, 1024);
    }

    #[test]
    fn test_env_invalid_integer() {
        let mut loader = ConfigLoader::new();
        let err = loader
            .apply_env_vars("TEST", vars(&[("TEST__SERVER__BACKLOG", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::EnvParseError { ref var, .. } if var == "TEST__SERVER__BACKLOG"));
    }

    #[test]
    fn test_env_unknown_key_is_ignored() {
        let mut loader = ConfigLoader::new();
        loader
            .apply_env_vars("TEST", vars(&[("TEST__SERVER__HTTP2", "true")]))
            .unwrap();
        assert_eq!(loader.load_unvalidated(), KairosConfig::default());
    }

    #[test]
    fn test_parse_bool() {
        for yes in ["true", "True", "1", "yes", "on"] {
            assert_eq!(parse_bool(yes), Some(true), "{yes}");
        }
        for no in ["false", "FALSE", "0", "no", "off"] {
            assert_eq!(parse_bool(no), Some(false), "{no}");
        }
        assert_eq!(parse_bool("maybe"), None);
        assert_eq!(parse_bool(""), None);
    }
}
