//! # Kairos Core
//!
//! Core types shared by every Kairos crate:
//!
//! - [`RequestContext`] - per-request head, body, route match, state and locals
//! - [`RequestBody`] - streaming body with cached, size-limited collection
//! - [`StateMap`] / [`StateStore`] - type-keyed shared state, layered per scope
//! - [`ConnectionInfo`] - addresses of the connection a request arrived on
//! - [`RequestId`] - UUID v7 request identifier
//! - [`Response`] and [`ResponseExt`] - response type and JSON error envelope
//! - [`HandlerFault`] - handler failure converted to `500`

#![doc(html_root_url = "https://docs.rs/kairos-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod body;
mod connection;
mod context;
mod error;
mod request_id;
mod response;
pub mod state;

pub use body::{RequestBody, StreamingBody};
pub use connection::ConnectionInfo;
pub use context::RequestContext;
pub use error::{BodyError, BoxError, HandlerFault, QueryError, StateError};
pub use kairos_router::Params;
pub use request_id::{RequestId, REQUEST_ID_HEADER};
pub use response::{ErrorDetail, ErrorEnvelope, Response, ResponseExt};
pub use state::{StateMap, StateStore};
