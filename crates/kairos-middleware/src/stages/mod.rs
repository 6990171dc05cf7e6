//! Built-in middleware stages.
//!
//! None of these are installed automatically; register them globally or on
//! a scope like any other middleware.
//!
//! - [`access_log`] - one structured log line per request
//! - [`catch_panic`] - converts handler panics to `500`
//! - [`request_id`] - propagates `X-Request-ID`
//! - [`timeout`] - per-scope deadline producing `408`

pub mod access_log;
pub mod catch_panic;
pub mod request_id;
pub mod timeout;

pub use access_log::AccessLog;
pub use catch_panic::CatchPanic;
pub use request_id::RequestIdStage;
pub use timeout::Timeout;
