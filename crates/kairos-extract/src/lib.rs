//! # Kairos Extract
//!
//! Typed request extractors, handler adaptation and response conversion for
//! the Kairos HTTP framework.
//!
//! ## Extractors
//!
//! | Extractor | Source | Failure |
//! |-----------|--------|---------|
//! | [`Path<T>`] / [`PathParam<T>`] | Bound path parameters | `400` |
//! | [`Query<T>`] / [`QueryMap`] / [`RawQuery`] | Query string | `400` |
//! | [`Json<T>`] / [`JsonWithLimit<T, N>`] | JSON body | `400`, `413`, `415` |
//! | [`Form<T>`] | URL-encoded body | `400`, `413`, `415` |
//! | [`RawBody`] / [`BodyString`] | Raw body | `400`, `413` |
//! | [`State<T>`] | Scope state | `500` |
//! | [`Local<T>`] | Middleware locals | `500` |
//! | [`ConnectInfo`] | Connection addresses | never |
//! | `Method`, `Uri`, `HeaderMap` | Request head | never |
//!
//! ## Handlers
//!
//! ```rust
//! use kairos_extract::{Json, PathParam, Query, State};
//! use serde::{Deserialize, Serialize};
//!
//! struct Db;
//!
//! #[derive(Deserialize)]
//! struct Paging {
//!     limit: Option<u32>,
//! }
//!
//! #[derive(Serialize)]
//! struct User {
//!     id: u64,
//! }
//!
//! async fn list_users(
//!     _db: State<Db>,
//!     PathParam(org): PathParam<String>,
//!     Query(paging): Query<Paging>,
//! ) -> Json<Vec<User>> {
//!     let _ = (org, paging.limit);
//!     Json(vec![User { id: 1 }])
//! }
//! ```
//!
//! Any such function implements [`Handler`]; its extractors run left to
//! right and the first failure is rendered by the registered
//! [`ErrorMapper`] (the JSON envelope of [`DefaultErrorMapper`] unless
//! replaced).

#![doc(html_root_url = "https://docs.rs/kairos-extract/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod body;
mod de;
mod error;
mod extractor;
mod form;
mod handler;
mod json;
mod mapper;
mod path;
mod query;
mod request;
pub mod response;
mod state;

/// Default body limit for [`Json`], [`Form`], [`RawBody`] and [`BodyString`]: 1 MiB.
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

pub use body::{BodyString, RawBody};
pub use error::{ExtractionError, ExtractionSource, Rejection};
pub use extractor::FromRequest;
pub use form::Form;
pub use handler::{into_endpoint, Handler};
pub use json::{Json, JsonWithLimit};
pub use mapper::{DefaultErrorMapper, ErrorMapper};
pub use path::{path_param, Path, PathParam};
pub use query::{Query, QueryMap, RawQuery};
pub use request::{ConnectInfo, Local};
pub use response::{Html, IntoResponse, NoContent, Redirect};
pub use state::State;
