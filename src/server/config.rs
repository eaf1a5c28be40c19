//! Record server settings

use std::net::SocketAddr;
use std::time::Duration;

use crate::protocol::constants::DEFAULT_MAX_FRAME_SIZE;

/// Default listening port
pub const DEFAULT_PORT: u16 = 8080;

/// Default bound on a single observer push
pub const DEFAULT_PUSH_TIMEOUT: Duration = Duration::from_secs(10);

const DEFAULT_BACKLOG: u32 = 1024;

/// Settings for [`RecordServer`](crate::server::RecordServer)
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listening address, `0.0.0.0:8080` unless overridden
    pub bind_addr: SocketAddr,

    /// Cap on open sessions; 0 disables the cap
    pub max_connections: usize,

    pub backlog: u32,

    /// Set TCP_NODELAY on accepted sockets
    pub tcp_nodelay: bool,

    /// Largest accepted request frame
    pub max_frame_size: usize,

    /// Upper bound on one push to an observer (None = wait indefinitely)
    pub push_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::with_addr(SocketAddr::from(([0, 0, 0, 0], DEFAULT_PORT)))
    }
}

impl ServerConfig {
    /// Defaults, listening on `addr`
    pub fn with_addr(bind_addr: SocketAddr) -> Self {
        Self {
            bind_addr,
            max_connections: 0,
            backlog: DEFAULT_BACKLOG,
            tcp_nodelay: true,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            push_timeout: Some(DEFAULT_PUSH_TIMEOUT),
        }
    }

    pub fn bind(self, bind_addr: SocketAddr) -> Self {
        Self { bind_addr, ..self }
    }

    /// Change only the port of the listening address
    pub fn port(mut self, port: u16) -> Self {
        self.bind_addr.set_port(port);
        self
    }

    pub fn max_connections(self, max_connections: usize) -> Self {
        Self {
            max_connections,
            ..self
        }
    }

    pub fn max_frame_size(self, max_frame_size: usize) -> Self {
        Self {
            max_frame_size,
            ..self
        }
    }

    pub fn push_timeout(self, push_timeout: Option<Duration>) -> Self {
        Self {
            push_timeout,
            ..self
        }
    }
}
