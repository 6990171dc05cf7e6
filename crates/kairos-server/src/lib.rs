//! # Kairos Server
//!
//! Route registration and the HTTP server for the Kairos framework.
//!
//! - [`App`] and [`Scope`]: the route registry, built once into a [`Service`]
//! - [`Server`]: accept loop, per-connection HTTP/1.1 serving through hyper,
//!   request timeouts and graceful shutdown
//! - [`Acceptor`]: plaintext or (with the `tls` feature) rustls connections
//!
//! ## Example
//!
//! ```rust,ignore
//! use kairos_server::{App, Server};
//! use kairos_extract::PathParam;
//!
//! async fn greet(PathParam(name): PathParam<String>) -> String {
//!     format!("hello, {name}")
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut app = App::new();
//!     app.get("/hello/{name}", greet)?;
//!
//!     Server::builder().service(app.build()?).build()?.run().await?;
//!     Ok(())
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/kairos-server/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod acceptor;
mod app;
mod config;
mod error;
mod server;
mod shutdown;

#[cfg(feature = "tls")]
pub use acceptor::TlsAcceptor;
pub use acceptor::{Acceptor, PlainAcceptor};
pub use app::{App, Route, Scope, Service};
pub use config::{
    ServerConfig, ServerConfigBuilder, DEFAULT_BACKLOG, DEFAULT_HTTP_ADDR, DEFAULT_IDLE_TIMEOUT_SECS,
    DEFAULT_REQUEST_TIMEOUT_SECS, DEFAULT_SHUTDOWN_TIMEOUT_SECS, DEFAULT_TLS_HANDSHAKE_TIMEOUT_SECS,
};
pub use error::{ConnectionFault, RegistryError, ServerError};
pub use server::{Server, ServerBuilder};
pub use shutdown::{ConnectionToken, ConnectionTracker, ShutdownReceiver, ShutdownSignal};
