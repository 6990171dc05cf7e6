//! Typed configuration for Kairos servers.
//!
//! [`KairosConfig`] has two sections, `[server]` and `[logging]`. Values are
//! layered by [`ConfigLoader`]: defaults or a preset, then TOML/JSON files,
//! then `PREFIX__SECTION__KEY` environment variables. Unknown fields are
//! rejected.
//!
//! ```toml
//! [server]
//! http_addr = "0.0.0.0:8080"
//! workers = 4
//! shutdown_timeout_secs = 30
//! request_timeout_ms = 30000
//! idle_timeout_secs = 75
//! keep_alive = true
//! max_connections = 10000
//! backlog = 1024
//! tls_handshake_timeout_secs = 10
//!
//! [logging]
//! level = "info"
//! format = "json"
//! service_name = "orders"
//! ```
//!
//! ```no_run
//! use kairos_config::ConfigLoader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = ConfigLoader::new()
//!     .with_file("kairos.toml")?
//!     .with_env_prefix("KAIROS")
//!     .load()?;
//!
//! kairos_telemetry::init_logging(&config.log_config())?;
//! let server_config = config.server_config();
//! # let _ = server_config;
//! # Ok(())
//! # }
//! ```

#![doc(html_root_url = "https://docs.rs/kairos-config/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod error;
mod loader;
mod schema;

pub use config::KairosConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{LogFormat, LoggingSection, ServerSection};
