//! # Kairos Test
//!
//! In-memory testing for Kairos services. A [`TestClient`] wraps a built
//! `Service` and serves requests through `Service::serve_with`: routing,
//! middleware, extractors and error mapping all run, but no socket is bound.
//!
//! ```rust,ignore
//! use kairos_server::App;
//! use kairos_test::TestClient;
//! use serde_json::json;
//!
//! #[tokio::test]
//! async fn test_create_user() {
//!     let mut app = App::new();
//!     app.post("/users", create_user)?;
//!     let client = TestClient::from_app(&mut app)?;
//!
//!     client
//!         .post("/users")
//!         .json(&json!({ "name": "Alice" }))
//!         .send()
//!         .await
//!         .assert_status_code(201)
//!         .assert_json_field("name", &json!("Alice"));
//! }
//! ```

#![doc(html_root_url = "https://docs.rs/kairos-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod client;
mod error;
mod request;
mod response;

pub use client::{TestClient, TestClientRequest};
pub use error::TestError;
pub use request::{TestRequest, TestRequestBuilder};
pub use response::TestResponse;
