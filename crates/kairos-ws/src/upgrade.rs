//! The HTTP → WebSocket upgrade (RFC 6455 opening handshake).

use std::future::Future;

use async_trait::async_trait;
use base64::Engine;
use http::header::{
    self, HeaderMap, HeaderName, HeaderValue, SEC_WEBSOCKET_ACCEPT, SEC_WEBSOCKET_KEY,
    SEC_WEBSOCKET_PROTOCOL, SEC_WEBSOCKET_VERSION,
};
use http::{Method, StatusCode};
use hyper::upgrade::OnUpgrade;
use hyper_util::rt::TokioIo;
use kairos_core::{RequestContext, Response, ResponseExt};
use kairos_extract::{ExtractionError, ExtractionSource, FromRequest, Rejection};
use sha1::{Digest, Sha1};

use crate::config::WebSocketConfig;
use crate::connection::WebSocket;
use crate::error::WsError;

const WEBSOCKET_GUID: &[u8] = b"258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Extractor for a WebSocket upgrade request.
///
/// Rejects with `400` unless the request is a `GET` carrying
/// `Connection: upgrade`, `Upgrade: websocket`, `Sec-WebSocket-Version: 13`
/// and a `Sec-WebSocket-Key`. Rejects with `500` when the connection cannot
/// be upgraded, which is the case for requests served in-process.
///
/// ```rust,ignore
/// use kairos_ws::{WebSocket, WebSocketUpgrade};
///
/// async fn chat(ws: WebSocketUpgrade) -> kairos_core::Response {
///     ws.protocol(["chat.v1"]).on_upgrade(|mut socket: WebSocket| async move {
///         while let Some(Ok(message)) = socket.recv().await {
///             if socket.send(message).await.is_err() {
///                 break;
///             }
///         }
///     })
/// }
/// ```
pub struct WebSocketUpgrade {
    accept: HeaderValue,
    requested: Vec<String>,
    selected: Option<String>,
    config: WebSocketConfig,
    on_upgrade: OnUpgrade,
}

impl WebSocketUpgrade {
    /// Subprotocols the client offered, in its order of preference.
    #[must_use]
    pub fn protocols(&self) -> &[String] {
        &self.requested
    }

    /// Selects the first client-offered subprotocol that is in `supported`.
    ///
    /// When none match, no `Sec-WebSocket-Protocol` header is sent.
    #[must_use]
    pub fn protocol<I, P>(mut self, supported: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<str>,
    {
        let supported: Vec<P> = supported.into_iter().collect();
        self.selected = self
            .requested
            .iter()
            .find(|offered| supported.iter().any(|s| s.as_ref() == offered.as_str()))
            .cloned();
        self
    }

    /// The subprotocol that will be confirmed to the client.
    #[must_use]
    pub fn selected_protocol(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Overrides the connection settings.
    #[must_use]
    pub fn config(mut self, config: WebSocketConfig) -> Self {
        self.config = config;
        self
    }

    /// Answers `101 Switching Protocols` and runs `callback` on the socket
    /// once the connection has switched.
    ///
    /// The callback runs on its own task. If the switch fails or does not
    /// complete within the handshake timeout, it is never called.
    pub fn on_upgrade<F, Fut>(self, callback: F) -> Response
    where
        F: FnOnce(WebSocket) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut response = Response::empty(StatusCode::SWITCHING_PROTOCOLS);
        let headers = response.headers_mut();
        headers.insert(header::CONNECTION, HeaderValue::from_static("upgrade"));
        headers.insert(header::UPGRADE, HeaderValue::from_static("websocket"));
        headers.insert(SEC_WEBSOCKET_ACCEPT, self.accept);
        if let Some(protocol) = &self.selected {
            match HeaderValue::from_str(protocol) {
                Ok(value) => {
                    headers.insert(SEC_WEBSOCKET_PROTOCOL, value);
                }
                Err(_) => {
                    return Response::json_error(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        "INVALID_PROTOCOL",
                        "selected subprotocol is not a valid header value",
                    );
                }
            }
        }

        let config = self.config;
        let protocol = self.selected;
        let on_upgrade = self.on_upgrade;
        tokio::spawn(async move {
            let upgraded = match tokio::time::timeout(config.handshake_timeout, on_upgrade).await {
                Ok(Ok(upgraded)) => upgraded,
                Ok(Err(err)) => {
                    let err = WsError::UpgradeFailed(err.to_string());
                    tracing::debug!(error = %err, "websocket upgrade failed");
                    return;
                }
                Err(_) => {
                    let err = WsError::UpgradeTimeout(config.handshake_timeout);
                    tracing::debug!(error = %err, "websocket upgrade failed");
                    return;
                }
            };
            tracing::debug!(protocol = protocol.as_deref(), "websocket connection established");
            let socket = WebSocket::from_raw_socket(TokioIo::new(upgraded), config, protocol).await;
            callback(socket).await;
        });

        response
    }
}

impl std::fmt::Debug for WebSocketUpgrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebSocketUpgrade")
            .field("requested", &self.requested)
            .field("selected", &self.selected)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl FromRequest for WebSocketUpgrade {
    async fn from_request(ctx: &mut RequestContext) -> Result<Self, ExtractionError> {
        if ctx.method() != Method::GET {
            return Err(invalid_upgrade("WebSocket upgrade requires GET"));
        }
        let accept = validate_handshake(ctx.headers()).map_err(|err| invalid_upgrade(err.to_string()))?;
        let requested = requested_protocols(ctx.headers());

        let on_upgrade = ctx
            .parts_mut()
            .extensions
            .remove::<OnUpgrade>()
            .ok_or_else(|| {
                ExtractionError::internal(
                    ExtractionSource::Connection,
                    "connection does not support protocol upgrades",
                )
            })?;

        Ok(Self {
            accept,
            requested,
            selected: None,
            config: WebSocketConfig::default(),
            on_upgrade,
        })
    }
}

fn invalid_upgrade(message: impl Into<String>) -> ExtractionError {
    ExtractionError::new(
        Rejection::BadRequest,
        ExtractionSource::Header,
        "INVALID_UPGRADE",
        message,
    )
}

/// Checks the upgrade headers and returns the `Sec-WebSocket-Accept` value.
fn validate_handshake(headers: &HeaderMap) -> Result<HeaderValue, WsError> {
    if !header_contains_token(headers, &header::CONNECTION, "upgrade") {
        return Err(WsError::InvalidUpgrade("missing `Connection: upgrade` header".into()));
    }
    if !header_contains_token(headers, &header::UPGRADE, "websocket") {
        return Err(WsError::InvalidUpgrade("missing `Upgrade: websocket` header".into()));
    }
    if headers.get(&SEC_WEBSOCKET_VERSION).map(HeaderValue::as_bytes) != Some(&b"13"[..]) {
        return Err(WsError::InvalidUpgrade("`Sec-WebSocket-Version` must be 13".into()));
    }
    let key = headers
        .get(&SEC_WEBSOCKET_KEY)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| WsError::InvalidUpgrade("missing `Sec-WebSocket-Key` header".into()))?;

    HeaderValue::from_str(&accept_key(key.as_bytes()))
        .map_err(|e| WsError::InvalidUpgrade(e.to_string()))
}

fn header_contains_token(headers: &HeaderMap, name: &HeaderName, token: &str) -> bool {
    headers
        .get_all(name)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .any(|part| part.trim().eq_ignore_ascii_case(token))
}

fn requested_protocols(headers: &HeaderMap) -> Vec<String> {
    headers
        .get_all(&SEC_WEBSOCKET_PROTOCOL)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|protocol| !protocol.is_empty())
        .map(String::from)
        .collect()
}

/// `base64(SHA-1(key ++ GUID))`.
fn accept_key(key: &[u8]) -> String {
    let mut hasher = Sha1::new();
    hasher.update(key);
    hasher.update(WEBSOCKET_GUID);
    base64::engine::general_purpose::STANDARD.encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http_body_util::Empty;
    use kairos_core::ConnectionInfo;

    fn upgrade_request_with_version(version: &str) -> http::request::Builder {
        http::Request::get("/ws")
            .header(header::CONNECTION, "keep-alive, Upgrade")
            .header(header::UPGRADE, "websocket")
            .header("sec-websocket-key", "dGhlIHNhbXBsZSBub25jZQ==")
            .header("sec-websocket-version", version)
    }

    fn upgrade_request() -> http::request::Builder {
        upgrade_request_with_version("13")
    }

    fn context(builder: http::request::Builder) -> RequestContext {
        let request = builder.body(Empty::<Bytes>::new()).unwrap();
        RequestContext::from_request(request, ConnectionInfo::default())
    }

    #[test]
    fn test_accept_key_matches_rfc_example() {
        assert_eq!(accept_key(b"dGhlIHNhbXBsZSBub25jZQ=="), "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn test_validate_accepts_token_lists() {
        let ctx = context(upgrade_request());
        let accept = validate_handshake(ctx.headers()).unwrap();
        assert_eq!(accept, "s3pPLMBiTxaQ9kYGzzhZRbK+xOo=");
    }

    #[test]
    fn test_validate_rejects_wrong_version() {
        let ctx = context(upgrade_request_with_version("8"));
        let err = validate_handshake(ctx.headers()).unwrap_err();
        assert!(err.to_string().contains("13"));
    }

    #[test]
    fn test_requested_protocols_across_headers() {
        let ctx = context(
            upgrade_request()
                .header("sec-websocket-protocol", "chat, json")
                .header("sec-websocket-protocol", "xml"),
        );
        assert_eq!(requested_protocols(ctx.headers()), ["chat", "json", "xml"]);
    }

    #[tokio::test]
    async fn test_missing_headers_is_bad_request() {
        let mut ctx = context(http::Request::get("/ws").header(header::UPGRADE, "websocket"));
        let err = WebSocketUpgrade::from_request(&mut ctx).await.unwrap_err();
        assert_eq!(err.kind(), Rejection::BadRequest);
        assert_eq!(err.kind().status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_post_is_bad_request() {
        let mut ctx = context(upgrade_request().method(Method::POST));
        let err = WebSocketUpgrade::from_request(&mut ctx).await.unwrap_err();
        assert_eq!(err.kind(), Rejection::BadRequest);
    }

    #[tokio::test]
    async fn test_in_process_request_cannot_upgrade() {
        let mut ctx = context(upgrade_request());
        let err = WebSocketUpgrade::from_request(&mut ctx).await.unwrap_err();
        assert_eq!(err.kind(), Rejection::InternalServerError);
    }
}
