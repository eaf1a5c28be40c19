//! Client error types

use std::path::PathBuf;

use thiserror::Error;

/// Errors from the request and observer clients
#[derive(Debug, Error)]
pub enum ClientError {
    /// Input file does not exist
    #[error("Input file '{}' not found", path.display())]
    InputNotFound { path: PathBuf },

    /// Input file could not be read
    #[error("failed to read input file '{}': {source}", path.display())]
    ReadInput {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input file is not valid JSON
    #[error("Input file '{}' is not valid JSON: {source}", path.display())]
    InvalidInput {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Input file holds JSON that is not an object
    #[error("Input file '{}' must contain a JSON object", path.display())]
    NotAnObject { path: PathBuf },

    /// Could not reach the server
    #[error("failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Server closed the connection without answering
    #[error("server closed the connection without a response")]
    NoResponse,

    /// Socket or framing failure after connecting
    #[error(transparent)]
    Transport(#[from] crate::error::Error),
}

impl From<std::io::Error> for ClientError {
    fn from(e: std::io::Error) -> Self {
        ClientError::Transport(crate::error::Error::Io(e))
    }
}
