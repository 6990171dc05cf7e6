//! # Kairos Middleware
//!
//! Onion-style middleware for the Kairos framework.
//!
//! Middleware is attached globally, per scope, or per route. When the
//! application is built, each route gets one [`Pipeline`] with its
//! middleware already flattened into execution order:
//!
//! ```text
//! request ─► global ─► scope (outer → inner) ─► route ─► handler
//!                                                          │
//! response ◄─ global ◄─ scope (inner → outer) ◄─ route ◄───┘
//! ```
//!
//! A middleware owns the decision to call [`Next::run`] zero or one times.
//! Because `run` consumes the handle, calling it twice does not compile.
//!
//! ## Built-in stages
//!
//! | Stage | Purpose |
//! |-------|---------|
//! | [`stages::AccessLog`] | Structured `info` line per request |
//! | [`stages::CatchPanic`] | Panic in downstream code becomes `500` |
//! | [`stages::RequestIdStage`] | Echo `X-Request-ID` on the response |
//! | [`stages::Timeout`] | Deadline producing `408` |

#![doc(html_root_url = "https://docs.rs/kairos-middleware/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod middleware;
pub mod pipeline;
pub mod stages;

pub use middleware::{endpoint, BoxFuture, BoxedMiddleware, Endpoint, FnMiddleware, Middleware, Next};
pub use pipeline::Pipeline;
