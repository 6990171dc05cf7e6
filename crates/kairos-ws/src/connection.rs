//! The upgraded WebSocket connection.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures_util::{SinkExt, Stream, StreamExt};
use hyper::upgrade::Upgraded;
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_tungstenite::WebSocketStream;
use tungstenite::protocol::frame::coding::CloseCode;
use tungstenite::protocol::{CloseFrame, Role};
use tungstenite::Message;

use crate::config::WebSocketConfig;
use crate::error::{WsError, WsResult};

/// A server-side WebSocket.
///
/// Pings from the peer are answered automatically. Receiving also works
/// through the [`Stream`] implementation.
///
/// ```rust,ignore
/// use kairos_ws::{Message, WebSocket};
///
/// async fn echo(mut ws: WebSocket) {
///     while let Some(Ok(message)) = ws.recv().await {
///         if message.is_text() || message.is_binary() {
///             if ws.send(message).await.is_err() {
///                 break;
///             }
///         }
///     }
/// }
/// ```
pub struct WebSocket<S = TokioIo<Upgraded>> {
    inner: WebSocketStream<S>,
    protocol: Option<String>,
    closed: bool,
}

impl<S> WebSocket<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Wraps a stream on which the opening handshake already happened.
    pub async fn from_raw_socket(stream: S, config: WebSocketConfig, protocol: Option<String>) -> Self {
        let inner =
            WebSocketStream::from_raw_socket(stream, Role::Server, Some(config.protocol_config())).await;
        Self {
            inner,
            protocol,
            closed: false,
        }
    }

    /// The negotiated subprotocol, if any.
    #[must_use]
    pub fn protocol(&self) -> Option<&str> {
        self.protocol.as_deref()
    }

    /// Whether a close frame was sent or received, or the stream ended.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Receives the next message; `None` once the connection is closed.
    pub async fn recv(&mut self) -> Option<WsResult<Message>> {
        if self.closed {
            return None;
        }
        let next = self.inner.next().await;
        self.observe(next)
    }

    /// Receives the next data message and decodes it as JSON.
    ///
    /// Control frames are skipped. A binary message is decoded from its
    /// bytes.
    pub async fn recv_json<T: DeserializeOwned>(&mut self) -> Option<WsResult<T>> {
        loop {
            let decoded = match self.recv().await? {
                Ok(Message::Text(text)) => serde_json::from_str(text.as_str()).map_err(WsError::from),
                Ok(Message::Binary(data)) => serde_json::from_slice(&data).map_err(WsError::from),
                Ok(Message::Close(_)) => return None,
                Ok(_) => continue,
                Err(err) => Err(err),
            };
            return Some(decoded);
        }
    }

    /// Sends a message.
    pub async fn send(&mut self, message: Message) -> WsResult<()> {
        if self.closed {
            return Err(WsError::Closed);
        }
        if message.is_close() {
            self.closed = true;
        }
        self.inner.send(message).await.map_err(WsError::from)
    }

    /// Sends a text message.
    pub async fn send_text(&mut self, text: impl Into<String>) -> WsResult<()> {
        self.send(Message::text(text.into())).await
    }

    /// Sends a binary message.
    pub async fn send_binary(&mut self, data: impl Into<Bytes>) -> WsResult<()> {
        self.send(Message::binary(data)).await
    }

    /// Serializes `value` as JSON and sends it as text.
    pub async fn send_json<T: Serialize + ?Sized>(&mut self, value: &T) -> WsResult<()> {
        let text = serde_json::to_string(value)?;
        self.send(Message::text(text)).await
    }

    /// Sends a ping.
    pub async fn ping(&mut self, payload: impl Into<Bytes>) -> WsResult<()> {
        self.send(Message::Ping(payload.into())).await
    }

    /// Starts the closing handshake. Closing twice is a no-op.
    pub async fn close(&mut self, code: CloseCode, reason: impl Into<String>) -> WsResult<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        let reason: String = reason.into();
        let frame = CloseFrame {
            code,
            reason: reason.into(),
        };
        tracing::debug!(code = u16::from(code), "closing websocket");
        match self.inner.close(Some(frame)).await {
            Ok(()) | Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    /// Returns the underlying tungstenite stream.
    #[must_use]
    pub fn into_inner(self) -> WebSocketStream<S> {
        self.inner
    }

    fn observe(&mut self, next: Option<Result<Message, tungstenite::Error>>) -> Option<WsResult<Message>> {
        match next {
            Some(Ok(message)) => {
                if message.is_close() {
                    self.closed = true;
                }
                Some(Ok(message))
            }
            Some(Err(tungstenite::Error::ConnectionClosed | tungstenite::Error::AlreadyClosed)) | None => {
                self.closed = true;
                None
            }
            Some(Err(err)) => {
                self.closed = true;
                Some(Err(err.into()))
            }
        }
    }
}

impl<S> Stream for WebSocket<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    type Item = WsResult<Message>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        if self.closed {
            return Poll::Ready(None);
        }
        match self.inner.poll_next_unpin(cx) {
            Poll::Ready(next) => Poll::Ready(self.observe(next)),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<S> std::fmt::Debug for WebSocket<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocket")
            .field("protocol", &self.protocol)
            .field("closed", &self.closed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::DuplexStream;

    async fn pair() -> (WebSocket<DuplexStream>, WebSocketStream<DuplexStream>) {
        let (server, client) = tokio::io::duplex(64 * 1024);
        let server = WebSocket::from_raw_socket(server, WebSocketConfig::default(), Some("chat".into())).await;
        let client = WebSocketStream::from_raw_socket(client, Role::Client, None).await;
        (server, client)
    }

    #[tokio::test]
    async fn test_send_and_recv() {
        let (mut server, mut client) = pair().await;
        assert_eq!(server.protocol(), Some("chat"));

        client.send(Message::text("hi")).await.unwrap();
        let message = server.recv().await.unwrap().unwrap();
        assert_eq!(message.to_text().unwrap(), "hi");

        server.send_text("back").await.unwrap();
        let reply = client.next().await.unwrap().unwrap();
        assert_eq!(reply.to_text().unwrap(), "back");
    }

    #[tokio::test]
    async fn test_json_round_trip_skips_pings() {
        let (mut server, mut client) = pair().await;

        client.send(Message::Ping(Bytes::from_static(b"p"))).await.unwrap();
        client.send(Message::text(r#"{"n":7}"#)).await.unwrap();

        #[derive(serde::Deserialize)]
        struct Payload {
            n: u32,
        }
        let payload: Payload = server.recv_json().await.unwrap().unwrap();
        assert_eq!(payload.n, 7);

        server.send_json(&serde_json::json!({"ok": true})).await.unwrap();
        // The automatic pong arrives before the reply.
        let pong = client.next().await.unwrap().unwrap();
        assert!(pong.is_pong());
        let reply = client.next().await.unwrap().unwrap();
        assert_eq!(reply.to_text().unwrap(), r#"{"ok":true}"#);
    }

    #[tokio::test]
    async fn test_close_marks_socket_closed() {
        let (mut server, mut client) = pair().await;

        server.close(CloseCode::Normal, "bye").await.ok();
        assert!(server.is_closed());
        assert!(matches!(server.send_text("late").await, Err(WsError::Closed)));

        let frame = client.next().await.unwrap().unwrap();
        assert!(frame.is_close());
    }

    #[tokio::test]
    async fn test_peer_close_ends_stream() {
        let (mut server, mut client) = pair().await;

        client.close(None).await.unwrap();
        let message = server.recv().await.unwrap().unwrap();
        assert!(message.is_close());
        assert!(server.recv().await.is_none());
    }
}
