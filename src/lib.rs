//! record-relay: a TCP record store with subscribe/notify fan-out
//!
//! Clients speak newline-delimited JSON over TCP. One-shot requests (`get`, `set`,
//! `list`) receive exactly one response and the connection is closed. A `subscribe`
//! request turns the connection into an observer that receives every record stored
//! by a successful `set`, anywhere in the system, until it disconnects.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use record_relay::store::MemoryStore;
//! use record_relay::{RecordServer, ServerConfig};
//!
//! # async fn example() -> record_relay::Result<()> {
//! let config = ServerConfig::default().port(8080);
//! let server = RecordServer::new(config, Arc::new(MemoryStore::new()));
//! server.run().await
//! # }
//! ```

pub mod client;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;
pub mod store;

pub use error::{Error, Result};
pub use protocol::{Action, Record, Request, Response};
pub use registry::SubscriptionRegistry;
pub use server::{RecordServer, ServerConfig};
pub use store::{MemoryStore, RecordStore};
