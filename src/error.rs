//! Error types
//!
//! Per-request failures never escape a connection; these types cover the paths
//! that do surface to callers: binding, the accept loop, framing and clients.

use std::net::SocketAddr;

use thiserror::Error;

use crate::protocol::FrameError;
use crate::store::StoreError;

/// Result type for record-relay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// Listening address is held by another socket
    #[error("Address already in use: {0}")]
    AddrInUse(SocketAddr),

    /// I/O failure on a socket or file
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Wire protocol violation
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Store collaborator failure
    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Wire protocol errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Framing failed (oversized or undecodable frame)
    #[error(transparent)]
    Frame(#[from] FrameError),

    /// Message could not be serialized
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

impl Error {
    /// Whether this error is the address-in-use bind failure
    pub fn is_addr_in_use(&self) -> bool {
        matches!(self, Error::AddrInUse(_))
    }
}
