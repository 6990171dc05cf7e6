//! # Kairos
//!
//! An embeddable async HTTP/1.1 and WebSocket server framework.
//!
//! - **Compiled routing**: patterns with `{param}` and `*wildcard` segments are
//!   compiled once into an immutable trie; lookups never allocate for the
//!   common case.
//! - **Scoped registration**: nested prefixes carry their own state and
//!   middleware, flattened into one pipeline per route at build time.
//! - **Typed extraction**: handlers are plain async functions whose arguments
//!   are extracted from the request left to right.
//! - **Graceful lifecycle**: connection limits, per-request deadlines and a
//!   bounded shutdown drain.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use kairos::prelude::*;
//!
//! async fn get_user(PathParam(id): PathParam<u64>) -> Json<serde_json::Value> {
//!     Json(serde_json::json!({ "id": id }))
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut app = App::new();
//!     app.use_middleware(AccessLog::new())?;
//!     app.nest("/api", |api| {
//!         api.get("/users/{id}", get_user)?;
//!         Ok(())
//!     })?;
//!
//!     let server = Server::builder()
//!         .config(ServerConfig::builder().http_addr("0.0.0.0:8080").build())
//!         .service(app.build()?)
//!         .build()?;
//!     server.run_blocking()?;
//!     Ok(())
//! }
//! ```
//!
//! ## Request flow
//!
//! ```text
//! accept → hyper HTTP/1.1 → Router::match_route ─┬─ 404 / 405
//!                                                └─ Pipeline: global → scope → route → handler
//! ```

#![doc(html_root_url = "https://docs.rs/kairos/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub use kairos_config as config;
pub use kairos_core as core;
pub use kairos_extract as extract;
pub use kairos_middleware as middleware;
pub use kairos_router as router;
pub use kairos_server as server;
pub use kairos_telemetry as telemetry;
pub use kairos_ws as ws;

/// Common imports for applications.
///
/// ```rust,ignore
/// use kairos::prelude::*;
/// ```
pub mod prelude {
    pub use kairos_core::{
        ConnectionInfo, HandlerFault, RequestContext, RequestId, Response, ResponseExt,
    };

    pub use kairos_extract::{
        BodyString, ConnectInfo, ErrorMapper, ExtractionError, Form, FromRequest, Html,
        IntoResponse, Json, JsonWithLimit, Local, NoContent, Path, PathParam, Query, QueryMap,
        RawBody, RawQuery, Redirect, Rejection, State,
    };

    pub use kairos_middleware::stages::{AccessLog, CatchPanic, RequestIdStage, Timeout};
    pub use kairos_middleware::{BoxFuture, FnMiddleware, Middleware, Next};

    pub use kairos_server::{
        App, RegistryError, Scope, Server, ServerConfig, ServerError, Service, ShutdownSignal,
    };

    pub use kairos_config::{ConfigLoader, KairosConfig};
    pub use kairos_telemetry::{init_logging, LogConfig};

    pub use kairos_ws::{CloseCode, Message, WebSocket, WebSocketUpgrade, WsError};
}
