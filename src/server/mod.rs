//! Record server
//!
//! The accept loop ([`RecordServer`]), the per-connection session
//! ([`Connection`]) and the request [`Router`].

pub mod config;
pub mod connection;
pub mod listener;
pub mod router;

pub use config::ServerConfig;
pub use connection::Connection;
pub use listener::RecordServer;
pub use router::{send_frame, Dispatch, Router};
