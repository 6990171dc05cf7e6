//! Route pattern compiler and immutable router for Kairos.
//!
//! Patterns are compiled once into [`CompiledPattern`]s and inserted into a
//! [`RouterBuilder`]. Freezing the builder yields a [`Router`] that answers
//! `(method, path)` lookups without locks or per-request pattern work.
//!
//! # Pattern syntax
//!
//! | Segment   | Meaning                                         |
//! |-----------|-------------------------------------------------|
//! | `users`   | literal, case-sensitive                         |
//! | `{id}`    | binds exactly one non-empty segment             |
//! | `*`       | binds the rest of the path under `*`            |
//! | `*path`   | binds the rest of the path under `path`         |
//!
//! # Priority
//!
//! At each position literals are tried before parameters, and parameters
//! before wildcards. The first point of divergence decides; a branch that
//! dead-ends later is backtracked.
//!
//! # Example
//!
//! ```rust
//! use kairos_router::{CompiledPattern, MatchResult, Router};
//! use http::Method;
//!
//! let mut builder = Router::builder();
//! builder.insert(Method::POST, &CompiledPattern::compile("/orders").unwrap(), "create").unwrap();
//! builder.insert(Method::GET, &CompiledPattern::compile("/assets/*").unwrap(), "assets").unwrap();
//! let router = builder.build();
//!
//! match router.match_route(&Method::GET, "/orders") {
//!     MatchResult::MethodNotAllowed { allowed } => assert_eq!(allowed, vec![Method::POST]),
//!     _ => unreachable!(),
//! }
//!
//! let (route, params) = router.match_route(&Method::GET, "/assets/css/a.css").matched().unwrap();
//! assert_eq!(*route, "assets");
//! assert_eq!(params.get("*"), Some("css/a.css"));
//! ```
//!
//! # Architecture
//!
//! ```text
//!                    (root)
//!                      │
//!              ┌───────┴───────┐
//!              │               │
//!            "users"        "assets"
//!              │               │
//!        ┌─────┴─────┐        (*)
//!        │           │       [GET]
//!       "me"       {param}
//!      [GET]        [GET]
//! ```

#![doc(html_root_url = "https://docs.rs/kairos-router/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod method_router;
mod node;
mod params;
mod pattern;
mod router;

pub use error::{CompileError, InsertError};
pub use method_router::MethodTable;
pub use params::Params;
pub use pattern::{CompiledPattern, Segment, UNNAMED_WILDCARD};
pub use router::{MatchResult, Router, RouterBuilder};
