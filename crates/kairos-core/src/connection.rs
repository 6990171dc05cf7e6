//! Per-connection metadata.

use std::net::SocketAddr;

/// Addresses and transport details of the connection a request arrived on.
///
/// Requests served in-process (without a socket) carry the default value,
/// where every address is `None`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConnectionInfo {
    local_addr: Option<SocketAddr>,
    remote_addr: Option<SocketAddr>,
    listen_addr: Option<SocketAddr>,
    is_tls: bool,
}

impl ConnectionInfo {
    /// Creates connection info for an accepted socket.
    #[must_use]
    pub const fn new(local_addr: SocketAddr, remote_addr: SocketAddr) -> Self {
        Self {
            local_addr: Some(local_addr),
            remote_addr: Some(remote_addr),
            listen_addr: None,
            is_tls: false,
        }
    }

    /// Records the address the accepting listener is bound to.
    #[must_use]
    pub const fn with_listen_addr(mut self, addr: SocketAddr) -> Self {
        self.listen_addr = Some(addr);
        self
    }

    /// Marks the connection as TLS-wrapped.
    #[must_use]
    pub const fn with_tls(mut self, is_tls: bool) -> Self {
        self.is_tls = is_tls;
        self
    }

    /// Local socket address.
    #[must_use]
    pub const fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Peer socket address.
    #[must_use]
    pub const fn remote_addr(&self) -> Option<SocketAddr> {
        self.remote_addr
    }

    /// Address of the listener that accepted the connection.
    #[must_use]
    pub const fn listen_addr(&self) -> Option<SocketAddr> {
        self.listen_addr
    }

    /// Returns `true` when the connection completed a TLS handshake.
    #[must_use]
    pub const fn is_tls(&self) -> bool {
        self.is_tls
    }
}
