//! Shared state extractor.
//!
//! [`State<T>`] reads a value bound with `use_state` on the scope that owns
//! the matched route or any of its ancestors.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use async_trait::async_trait;
use kairos_core::RequestContext;

use crate::{ExtractionError, FromRequest};

/// Extractor for scope state of type `T`.
///
/// An unregistered type is a server misconfiguration and rejects with `500`.
///
/// `State<T>` dereferences to `T`, so fields and methods of the value are
/// reached directly. [`State::inner`] gives the shared `Arc` when the value
/// has to outlive the handler.
///
/// ```rust
/// use kairos_extract::State;
///
/// struct Database {
///     url: String,
/// }
///
/// async fn handler(db: State<Database>) -> String {
///     db.url.clone()
/// }
/// ```
pub struct State<T>(Arc<T>);

impl<T> State<T> {
    /// The shared handle to the value.
    #[must_use]
    pub fn inner(&self) -> &Arc<T> {
        &self.0
    }

    /// Consumes the wrapper and returns the shared value.
    #[must_use]
    pub fn into_inner(self) -> Arc<T> {
        self.0
    }
}

impl<T> Clone for State<T> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> Deref for State<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<T: fmt::Debug> fmt::Debug for State<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("State").field(&self.0).finish()
    }
}

#[async_trait]
impl<T: Send + Sync + 'static> FromRequest for State<T> {
    async fn from_request(ctx: &mut RequestContext) -> Result<Self, ExtractionError> {
        Ok(Self(ctx.state().require::<T>()?))
    }
}
