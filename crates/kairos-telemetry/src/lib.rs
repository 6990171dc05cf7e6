//! Logging for Kairos services.
//!
//! Kairos crates emit structured events through `tracing`; this crate
//! installs the subscriber that renders them. There is no framework-owned
//! logger: an application calls [`init_logging`] once at startup, or
//! installs its own subscriber instead.
//!
//! Field names shared by the built-in access log and server events are in
//! [`fields`].
//!
//! ```rust,ignore
//! use kairos_telemetry::{init_logging, LogConfig};
//!
//! fn main() -> Result<(), kairos_telemetry::TelemetryError> {
//!     init_logging(&LogConfig::production())?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/kairos-telemetry/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod logging;

pub use error::TelemetryError;
pub use logging::{create_env_filter, fields, init_logging, LogConfig, DEFAULT_SERVICE_NAME};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
