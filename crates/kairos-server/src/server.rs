//! The HTTP server: listener, accept loop and connection serving.
//!
//! # Architecture
//!
//! - a TCP listener bound with the configured backlog
//! - an accept loop that stops on shutdown and optionally caps concurrent
//!   connections
//! - one task per connection serving HTTP/1.1 through hyper, with upgrades
//!   enabled for WebSocket
//! - a drain phase bounded by the shutdown timeout
//!
//! # Example
//!
//! ```rust,ignore
//! use kairos_server::{App, Server, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut app = App::new();
//!     app.get("/health", || async { "ok" })?;
//!
//!     Server::builder()
//!         .config(ServerConfig::builder().http_addr("0.0.0.0:8080").build())
//!         .service(app.build()?)
//!         .build()?
//!         .run()
//!         .await?;
//!     Ok(())
//! }
//! ```

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use http::header::CONNECTION;
use http::{HeaderValue, StatusCode};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use kairos_core::{ConnectionInfo, Response, ResponseExt};

use crate::acceptor::{Acceptor, PlainAcceptor};
use crate::app::Service;
use crate::config::ServerConfig;
use crate::error::{ConnectionFault, ServerError};
use crate::shutdown::{ConnectionTracker, ShutdownSignal};

/// Pause after a failed `accept`, so descriptor exhaustion does not spin.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// Serves a [`Service`] over TCP until shut down.
pub struct Server<A = PlainAcceptor> {
    config: ServerConfig,
    service: Service,
    acceptor: A,
    shutdown: ShutdownSignal,
}

impl Server {
    /// Creates a new server builder.
    ///
    /// ```rust
    /// use kairos_server::{App, Server};
    ///
    /// let service = App::new().build().unwrap();
    /// let server = Server::builder().service(service).build();
    /// assert!(server.is_ok());
    /// ```
    #[must_use]
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }
}

impl<A: Acceptor> Server<A> {
    /// Returns the server configuration.
    #[must_use]
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Returns the service requests are dispatched to.
    #[must_use]
    pub fn service(&self) -> &Service {
        &self.service
    }

    /// The server's own shutdown signal.
    ///
    /// Triggering it (or a clone) stops every `run*` method and closes
    /// connections served by [`handle_connection`](Self::handle_connection).
    /// Signals passed to [`run_with_shutdown`](Self::run_with_shutdown) or
    /// [`run_with_listener`](Self::run_with_listener) are forwarded to it.
    #[must_use]
    pub fn shutdown_signal(&self) -> &ShutdownSignal {
        &self.shutdown
    }

    /// Runs until `SIGTERM`, `SIGINT` or the server's own signal.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured address cannot be bound.
    pub async fn run(self) -> Result<(), ServerError> {
        self.shutdown.trigger_on_os_signals();
        let shutdown = self.shutdown.clone();
        self.run_with_shutdown(shutdown).await
    }

    /// Runs until `shutdown` or the server's own signal is triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured address cannot be bound.
    pub async fn run_with_shutdown(self, shutdown: ShutdownSignal) -> Result<(), ServerError> {
        let listener = bind(&self.config)?;
        self.run_with_listener(listener, shutdown).await
    }

    /// Runs on an already bound listener until `shutdown` or the server's
    /// own signal is triggered.
    ///
    /// After the trigger the listener is closed at once, in-flight requests
    /// finish and idle keep-alive connections close. Connections still open
    /// when the shutdown timeout elapses are aborted.
    ///
    /// # Errors
    ///
    /// Currently always succeeds; accept failures are logged and retried.
    pub async fn run_with_listener(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), ServerError> {
        let external = shutdown;
        let forward = external.forward_to(&self.shutdown);
        let shutdown = self.shutdown.clone();
        let listen_addr = listener.local_addr().ok();
        tracing::info!(
            addr = ?listen_addr,
            routes = self.service.router().len(),
            "server listening"
        );

        let limiter = self.config.max_connections().map(|max| Arc::new(Semaphore::new(max)));
        let tracker = ConnectionTracker::new();
        let mut tasks = JoinSet::new();
        let server = Arc::new(self);

        loop {
            let permit = match &limiter {
                Some(semaphore) => tokio::select! {
                    permit = Arc::clone(semaphore).acquire_owned() => match permit {
                        Ok(permit) => Some(permit),
                        Err(_) => break,
                    },
                    () = shutdown.recv() => break,
                },
                None => None,
            };

            tokio::select! {
                result = listener.accept() => match result {
                    Ok((stream, remote)) => {
                        let token = tracker.acquire();
                        let server = Arc::clone(&server);
                        tasks.spawn(async move {
                            server.serve_socket(stream, remote, listen_addr).await;
                            drop(permit);
                            drop(token);
                        });
                    }
                    Err(err) => {
                        tracing::warn!(error = %err, "failed to accept connection");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
                () = shutdown.recv() => break,
            }

            while tasks.try_join_next().is_some() {}
        }

        drop(listener);
        let grace = server.config.shutdown_timeout();
        tracing::info!(
            active = tracker.active_connections(),
            grace_ms = u64::try_from(grace.as_millis()).unwrap_or(u64::MAX),
            "listener closed, draining connections"
        );

        tokio::select! {
            () = tracker.wait_for_shutdown() => {
                tracing::info!("all connections closed");
            }
            () = tokio::time::sleep(grace) => {
                tracing::warn!(
                    remaining = tracker.active_connections(),
                    "shutdown timeout elapsed, aborting connections"
                );
                tasks.abort_all();
            }
        }
        while tasks.join_next().await.is_some() {}
        forward.abort();
        drop(external);

        tracing::info!("server stopped");
        Ok(())
    }

    /// Builds a multi-threaded runtime sized by the `workers` setting and
    /// runs until `SIGTERM` or `SIGINT`.
    ///
    /// # Errors
    ///
    /// Returns an error if the runtime cannot be created or the address
    /// cannot be bound.
    pub fn run_blocking(self) -> Result<(), ServerError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.workers())
            .thread_name("kairos-worker")
            .enable_all()
            .build()
            .map_err(|e| ServerError::IoError(format!("failed to build runtime: {e}")))?;
        runtime.block_on(self.run())
    }

    async fn serve_socket(&self, stream: TcpStream, remote: SocketAddr, listen_addr: Option<SocketAddr>) {
        let local = match stream.local_addr() {
            Ok(addr) => addr,
            Err(err) => {
                tracing::debug!(%remote, error = %err, "connection closed before it was served");
                return;
            }
        };
        if let Err(err) = stream.set_nodelay(true) {
            tracing::debug!(%remote, error = %err, "failed to set TCP_NODELAY");
        }

        let (io, is_tls) = match self.acceptor.accept(stream).await {
            Ok(accepted) => accepted,
            Err(fault) => {
                tracing::debug!(%remote, error = %fault, "connection rejected");
                return;
            }
        };

        let mut connection = ConnectionInfo::new(local, remote).with_tls(is_tls);
        if let Some(addr) = listen_addr {
            connection = connection.with_listen_addr(addr);
        }

        if let Err(fault) = self.handle_connection(io, connection).await {
            tracing::debug!(%remote, error = %fault, "connection error");
        }
    }

    /// Serves HTTP/1.1 on one established stream until it closes.
    ///
    /// When the server's shutdown signal fires, the request in flight
    /// completes and the connection then closes.
    pub async fn handle_connection<S>(&self, stream: S, connection: ConnectionInfo) -> Result<(), ConnectionFault>
    where
        S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
    {
        let service = self.service.clone();
        let request_timeout = self.config.request_timeout();
        let hyper_service = service_fn(move |request: http::Request<Incoming>| {
            let service = service.clone();
            async move { Ok::<_, Infallible>(respond(&service, request, connection, request_timeout).await) }
        });

        let mut builder = http1::Builder::new();
        builder
            .timer(TokioTimer::new())
            .header_read_timeout(self.config.idle_timeout())
            .keep_alive(self.config.keep_alive());

        let conn = builder
            .serve_connection(TokioIo::new(stream), hyper_service)
            .with_upgrades();
        tokio::pin!(conn);

        let shutdown = self.shutdown.recv();
        tokio::pin!(shutdown);

        tokio::select! {
            result = conn.as_mut() => return result.map_err(ConnectionFault::from),
            () = &mut shutdown => {
                tracing::debug!(remote = ?connection.remote_addr(), "closing connection for shutdown");
                conn.as_mut().graceful_shutdown();
            }
        }

        conn.await.map_err(ConnectionFault::from)
    }
}

impl<A> std::fmt::Debug for Server<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("config", &self.config)
            .field("service", &self.service)
            .finish_non_exhaustive()
    }
}

async fn respond(
    service: &Service,
    request: http::Request<Incoming>,
    connection: ConnectionInfo,
    request_timeout: Option<Duration>,
) -> Response {
    let serve = service.serve_with(request, connection);
    let Some(limit) = request_timeout else {
        return serve.await;
    };

    match tokio::time::timeout(limit, serve).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(
                timeout_ms = u64::try_from(limit.as_millis()).unwrap_or(u64::MAX),
                "request timed out"
            );
            let mut response =
                Response::json_error(StatusCode::REQUEST_TIMEOUT, "REQUEST_TIMEOUT", "request timed out");
            response
                .headers_mut()
                .insert(CONNECTION, HeaderValue::from_static("close"));
            response
        }
    }
}

fn bind(config: &ServerConfig) -> Result<TcpListener, ServerError> {
    let addr = config.socket_addr().map_err(|e| {
        ServerError::BindError(format!("invalid address '{}': {}", config.http_addr(), e))
    })?;

    let bind_error = |e: std::io::Error| ServerError::BindError(format!("failed to bind to {addr}: {e}"));
    let socket = if addr.is_ipv4() {
        TcpSocket::new_v4()
    } else {
        TcpSocket::new_v6()
    }
    .map_err(bind_error)?;
    socket.set_reuseaddr(true).map_err(bind_error)?;
    socket.bind(addr).map_err(bind_error)?;
    socket.listen(config.backlog()).map_err(bind_error)
}

/// Builder for [`Server`].
#[derive(Debug)]
pub struct ServerBuilder<A = PlainAcceptor> {
    config: ServerConfig,
    service: Option<Service>,
    acceptor: A,
}

impl ServerBuilder {
    /// Creates a builder with default configuration and plaintext HTTP.
    #[must_use]
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            service: None,
            acceptor: PlainAcceptor,
        }
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl<A: Acceptor> ServerBuilder<A> {
    /// Sets the server configuration.
    #[must_use]
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the service to serve.
    #[must_use]
    pub fn service(mut self, service: Service) -> Self {
        self.service = Some(service);
        self
    }

    /// Replaces the acceptor, e.g. with a `TlsAcceptor`.
    #[must_use]
    pub fn acceptor<B: Acceptor>(self, acceptor: B) -> ServerBuilder<B> {
        ServerBuilder {
            config: self.config,
            service: self.service,
            acceptor,
        }
    }

    /// Builds the server.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::MissingService`] if no service was set.
    pub fn build(self) -> Result<Server<A>, ServerError> {
        let service = self.service.ok_or(ServerError::MissingService)?;
        Ok(Server {
            config: self.config,
            service,
            acceptor: self.acceptor,
            shutdown: ShutdownSignal::new(),
        })
    }
}
