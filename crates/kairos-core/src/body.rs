//! Request bodies.
//!
//! A [`RequestBody`] starts out streaming and is collected at most once.
//! After the first successful [`RequestBody::read_to_bytes`] the bytes are
//! cached, so several extractors may look at the same payload.

use std::fmt;

use bytes::{Bytes, BytesMut};
use http_body::Body;
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::BodyExt;

use crate::error::{BodyError, BoxError};

/// Type-erased streaming body.
pub type StreamingBody = UnsyncBoxBody<Bytes, BoxError>;

/// The body of an in-flight request.
#[derive(Default)]
pub enum RequestBody {
    /// No body, or one that has been read completely.
    #[default]
    Empty,
    /// Fully buffered bytes.
    Buffered(Bytes),
    /// A body still arriving from the connection.
    Streaming(StreamingBody),
    /// A body that failed or was taken for an upgrade; it cannot be read again.
    Consumed,
}

impl RequestBody {
    /// Wraps any `http_body::Body` with `Bytes` frames.
    pub fn streaming<B>(body: B) -> Self
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<BoxError>,
    {
        if body.is_end_stream() {
            return Self::Empty;
        }
        Self::Streaming(body.map_err(Into::into).boxed_unsync())
    }

    /// Wraps bytes that are already in memory.
    #[must_use]
    pub fn buffered(bytes: impl Into<Bytes>) -> Self {
        Self::Buffered(bytes.into())
    }

    /// Returns `true` if the body has been buffered.
    #[must_use]
    pub const fn is_buffered(&self) -> bool {
        matches!(self, Self::Buffered(_) | Self::Empty)
    }

    /// Collects the body, suspending while it streams in.
    ///
    /// At most `limit` bytes are accepted, counted across all data frames.
    /// Trailers are skipped. The result is cached, so a second call returns
    /// the same bytes without touching the connection.
    ///
    /// # Errors
    ///
    /// [`BodyError::TooLarge`] past `limit`, [`BodyError::Read`] when the
    /// connection fails, [`BodyError::Consumed`] after either of those.
    pub async fn read_to_bytes(&mut self, limit: usize) -> Result<Bytes, BodyError> {
        match std::mem::replace(self, Self::Consumed) {
            Self::Empty => {
                *self = Self::Empty;
                Ok(Bytes::new())
            }
            Self::Buffered(bytes) => {
                let len = bytes.len();
                *self = Self::Buffered(bytes.clone());
                if len > limit {
                    return Err(BodyError::TooLarge { limit });
                }
                Ok(bytes)
            }
            Self::Streaming(mut body) => {
                let mut buf = BytesMut::new();
                while let Some(frame) = body.frame().await {
                    let frame = frame.map_err(|err| BodyError::Read(err.to_string()))?;
                    let Ok(data) = frame.into_data() else {
                        continue;
                    };
                    if buf.len() + data.len() > limit {
                        return Err(BodyError::TooLarge { limit });
                    }
                    buf.extend_from_slice(&data);
                }
                let bytes = buf.freeze();
                *self = Self::Buffered(bytes.clone());
                Ok(bytes)
            }
            Self::Consumed => Err(BodyError::Consumed),
        }
    }

    /// Takes the body, leaving `Consumed` in its place.
    pub fn take(&mut self) -> Self {
        std::mem::replace(self, Self::Consumed)
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("Empty"),
            Self::Buffered(bytes) => f.debug_tuple("Buffered").field(&bytes.len()).finish(),
            Self::Streaming(_) => f.write_str("Streaming"),
            Self::Consumed => f.write_str("Consumed"),
        }
    }
}
