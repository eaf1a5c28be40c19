//! Record server listener
//!
//! Handles binding, the TCP accept loop, and spawns one task per connection.

use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::net::tcp::OwnedWriteHalf;
use tokio::net::{TcpListener, TcpSocket, TcpStream};
use tokio::sync::Semaphore;

use crate::error::{Error, Result};
use crate::registry::SubscriptionRegistry;
use crate::server::config::ServerConfig;
use crate::server::connection::Connection;
use crate::server::router::Router;
use crate::session::SessionContext;
use crate::stats::{ServerStats, StatsSnapshot};
use crate::store::RecordStore;

/// Pause after a failed accept (e.g. EMFILE) before retrying
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(100);

/// Record server
pub struct RecordServer<S: RecordStore> {
    config: ServerConfig,
    router: Arc<Router<S, OwnedWriteHalf>>,
    stats: Arc<ServerStats>,
    next_session_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl<S: RecordStore> RecordServer<S> {
    /// Create a new server with the given configuration and store
    pub fn new(config: ServerConfig, store: Arc<S>) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        let stats = Arc::new(ServerStats::new());
        let registry = Arc::new(SubscriptionRegistry::with_push_timeout(config.push_timeout));
        let router = Arc::new(Router::new(store, registry, Arc::clone(&stats)));

        Self {
            config,
            router,
            stats,
            next_session_id: AtomicU64::new(1),
            connection_semaphore,
        }
    }

    /// Get a reference to the subscription registry
    pub fn registry(&self) -> &Arc<SubscriptionRegistry<OwnedWriteHalf>> {
        self.router.registry()
    }

    /// Get a reference to the store
    pub fn store(&self) -> &Arc<S> {
        self.router.store()
    }

    /// Current server statistics
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Bind the configured address with SO_REUSEADDR
    ///
    /// A port held by another listener fails with [`Error::AddrInUse`].
    pub fn bind(&self) -> Result<TcpListener> {
        let addr = self.config.bind_addr;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket.bind(addr).map_err(|e| bind_error(addr, e))?;

        let listener = socket
            .listen(self.config.backlog)
            .map_err(|e| bind_error(addr, e))?;

        Ok(listener)
    }

    /// Run the server
    ///
    /// This method blocks until the accept loop fails.
    pub async fn run(&self) -> Result<()> {
        let listener = self.bind()?;
        self.serve(listener).await
    }

    /// Run the server with graceful shutdown
    ///
    /// Sessions still in flight when `shutdown` resolves are abandoned.
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = self.bind()?;

        tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.serve(listener) => result,
        }
    }

    /// Accept connections on an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        let local_addr = listener.local_addr()?;
        tracing::info!(addr = %local_addr, "Record server listening");

        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match Arc::clone(sem).try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    self.stats.connection_rejected();
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            session_id = session_id,
            peer = %peer_addr,
            "New connection"
        );

        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(error = %e, "Failed to configure socket");
            return;
        }

        let router = Arc::clone(&self.router);
        let stats = Arc::clone(&self.stats);
        let max_frame_size = self.config.max_frame_size;

        stats.connection_opened();

        tokio::spawn(async move {
            let _permit = permit;
            let ctx = SessionContext::new(session_id, peer_addr);
            let (reader, writer) = socket.into_split();
            let mut connection = Connection::new(ctx, reader, writer, router, max_frame_size);

            if let Err(e) = connection.run().await {
                tracing::debug!(
                    session_id = session_id,
                    error = %e,
                    "Connection error"
                );
            }

            stats.connection_closed();
            tracing::debug!(session_id = session_id, "Connection closed");
        });
    }

    fn configure_socket(&self, socket: &TcpStream) -> io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }
}

fn bind_error(addr: SocketAddr, e: io::Error) -> Error {
    if e.kind() == io::ErrorKind::AddrInUse {
        Error::AddrInUse(addr)
    } else {
        Error::Io(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn local_config() -> ServerConfig {
        ServerConfig::with_addr("127.0.0.1:0".parse().unwrap())
    }

    #[tokio::test]
    async fn test_bind_ephemeral_port() {
        let server = RecordServer::new(local_config(), Arc::new(MemoryStore::new()));
        let listener = server.bind().unwrap();

        assert_ne!(listener.local_addr().unwrap().port(), 0);
    }

    #[tokio::test]
    async fn test_second_bind_is_addr_in_use() {
        let first = RecordServer::new(local_config(), Arc::new(MemoryStore::new()));
        let listener = first.bind().unwrap();
        let addr = listener.local_addr().unwrap();

        let second = RecordServer::new(ServerConfig::with_addr(addr), Arc::new(MemoryStore::new()));
        let err = second.bind().unwrap_err();

        assert!(err.is_addr_in_use(), "unexpected error: {err}");
        assert_eq!(err.to_string(), format!("Address already in use: {addr}"));

        // First listener still accepts
        let connect = tokio::net::TcpStream::connect(addr);
        let (accepted, connected) = tokio::join!(listener.accept(), connect);
        assert!(accepted.is_ok());
        assert!(connected.is_ok());
    }

    #[tokio::test]
    async fn test_run_until_shutdown() {
        let server = RecordServer::new(local_config(), Arc::new(MemoryStore::new()));

        let result = server.run_until(async {}).await;
        assert!(result.is_ok());
    }

    #[test]
    fn test_bind_error_mapping() {
        let addr: SocketAddr = "127.0.0.1:8080".parse().unwrap();

        let err = bind_error(addr, io::Error::from(io::ErrorKind::AddrInUse));
        assert!(matches!(err, Error::AddrInUse(a) if a == addr));

        let err = bind_error(addr, io::Error::from(io::ErrorKind::PermissionDenied));
        assert!(matches!(err, Error::Io(_)));
    }
}
