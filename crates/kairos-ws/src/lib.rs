//! # Kairos WebSocket
//!
//! WebSocket support for Kairos handlers.
//!
//! [`WebSocketUpgrade`] is an extractor: it validates the opening handshake
//! and, through [`WebSocketUpgrade::on_upgrade`], answers
//! `101 Switching Protocols` and hands a [`WebSocket`] to a callback once the
//! connection has switched. Frames are encoded by `tokio-tungstenite`.
//!
//! ```rust,ignore
//! use kairos_server::App;
//! use kairos_ws::{Message, WebSocket, WebSocketUpgrade};
//!
//! async fn echo(ws: WebSocketUpgrade) -> kairos_core::Response {
//!     ws.on_upgrade(|mut socket: WebSocket| async move {
//!         while let Some(Ok(message)) = socket.recv().await {
//!             if let Message::Text(text) = message {
//!                 if socket.send_text(format!("echo: {text}")).await.is_err() {
//!                     break;
//!                 }
//!             }
//!         }
//!     })
//! }
//!
//! let mut app = App::new();
//! app.get("/ws", echo)?;
//! ```
//!
//! Upgrades need a live connection: a request served in-process with
//! `Service::serve` is rejected with `500`.

#![doc(html_root_url = "https://docs.rs/kairos-ws/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod config;
mod connection;
mod error;
mod upgrade;

pub use config::{
    WebSocketConfig, DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_MAX_FRAME_SIZE, DEFAULT_MAX_MESSAGE_SIZE,
};
pub use connection::WebSocket;
pub use error::{WsError, WsResult};
pub use tungstenite::protocol::frame::coding::CloseCode;
pub use tungstenite::protocol::CloseFrame;
pub use tungstenite::Message;
pub use upgrade::WebSocketUpgrade;
