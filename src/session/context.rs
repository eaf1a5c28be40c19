//! Session context
//!
//! Identity of one connection, handed to the router with every request.

use std::net::SocketAddr;

use uuid::Uuid;

/// Per-connection identity
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Process-unique connection number, used as the registry key
    pub session_id: u64,

    /// Random id recorded in audit entries
    pub audit_id: Uuid,

    /// Remote peer address (None for in-process streams)
    pub peer_addr: Option<SocketAddr>,
}

impl SessionContext {
    /// Create a context for an accepted TCP connection
    pub fn new(session_id: u64, peer_addr: SocketAddr) -> Self {
        Self {
            session_id,
            audit_id: Uuid::new_v4(),
            peer_addr: Some(peer_addr),
        }
    }

    /// Create a context for a stream with no socket address
    pub fn detached(session_id: u64) -> Self {
        Self {
            session_id,
            audit_id: Uuid::new_v4(),
            peer_addr: None,
        }
    }

    /// Audit session id as a string
    pub fn audit_session(&self) -> String {
        self.audit_id.to_string()
    }
}
