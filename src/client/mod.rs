//! Record server clients
//!
//! Provides client-side access for:
//! - One-shot `get` / `set` / `list` requests
//! - Observing every `set` as it happens

pub mod config;
pub mod error;
pub mod identity;
pub mod observer;
pub mod request;

pub use config::ClientConfig;
pub use error::ClientError;
pub use identity::machine_uuid;
pub use observer::{ObserverClient, ObserverEvent};
pub use request::{load_request, Reply, RequestClient};
