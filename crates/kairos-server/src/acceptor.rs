//! Turning accepted TCP sockets into connection streams.
//!
//! [`PlainAcceptor`] hands the socket through. With the `tls` feature,
//! [`TlsAcceptor`] runs a rustls handshake bounded by a deadline.

use std::future::Future;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;

use crate::error::ConnectionFault;

/// Prepares an accepted socket for HTTP.
pub trait Acceptor: Send + Sync + 'static {
    /// The stream HTTP is served over.
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    /// Wraps `stream`, returning it together with whether it is TLS.
    fn accept(
        &self,
        stream: TcpStream,
    ) -> impl Future<Output = Result<(Self::Stream, bool), ConnectionFault>> + Send;
}

/// Serves plaintext HTTP directly on the socket.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainAcceptor;

impl Acceptor for PlainAcceptor {
    type Stream = TcpStream;

    async fn accept(&self, stream: TcpStream) -> Result<(TcpStream, bool), ConnectionFault> {
        Ok((stream, false))
    }
}

#[cfg(feature = "tls")]
pub use self::tls::TlsAcceptor;

#[cfg(feature = "tls")]
mod tls {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::net::TcpStream;
    use tokio_rustls::rustls::ServerConfig;
    use tokio_rustls::server::TlsStream;

    use super::Acceptor;
    use crate::error::ConnectionFault;

    /// Terminates TLS with rustls before serving HTTP.
    ///
    /// Certificates are loaded and validated by the caller when building the
    /// `rustls::ServerConfig`.
    #[derive(Clone)]
    pub struct TlsAcceptor {
        inner: tokio_rustls::TlsAcceptor,
        handshake_timeout: Duration,
    }

    impl TlsAcceptor {
        /// Creates an acceptor from a rustls configuration.
        #[must_use]
        pub fn new(config: Arc<ServerConfig>, handshake_timeout: Duration) -> Self {
            Self {
                inner: tokio_rustls::TlsAcceptor::from(config),
                handshake_timeout,
            }
        }
    }

    impl std::fmt::Debug for TlsAcceptor {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            f.debug_struct("TlsAcceptor")
                .field("handshake_timeout", &self.handshake_timeout)
                .finish_non_exhaustive()
        }
    }

    impl Acceptor for TlsAcceptor {
        type Stream = TlsStream<TcpStream>;

        async fn accept(
            &self,
            stream: TcpStream,
        ) -> Result<(TlsStream<TcpStream>, bool), ConnectionFault> {
            match tokio::time::timeout(self.handshake_timeout, self.inner.accept(stream)).await {
                Ok(Ok(tls)) => Ok((tls, true)),
                Ok(Err(err)) => Err(ConnectionFault::Tls(err.to_string())),
                Err(_) => Err(ConnectionFault::HandshakeTimeout(self.handshake_timeout)),
            }
        }
    }
}
