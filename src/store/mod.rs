//! Record store collaborator
//!
//! The server owns no data of its own. Everything it persists goes through a
//! [`RecordStore`] handle constructed at startup and passed into
//! [`RecordServer`](crate::server::RecordServer).

mod memory;

use std::future::Future;

use thiserror::Error;

use crate::protocol::Record;

pub use memory::{AuditRecord, MemoryStore};

/// Store collaborator failure
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    /// Record has no `id`
    #[error("record has no id")]
    MissingKey,

    /// Backend is unreachable or refused the operation
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Audit entry appended for each handled request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    /// Client identity from the request
    pub uuid: String,
    /// Server-generated session id of the connection
    pub session_id: String,
    /// Action name
    pub action: String,
    /// Short detail, e.g. `ID: x1`
    pub detail: String,
}

impl AuditEntry {
    pub fn new(
        uuid: impl Into<String>,
        session_id: impl Into<String>,
        action: impl Into<String>,
        detail: impl Into<String>,
    ) -> Self {
        Self {
            uuid: uuid.into(),
            session_id: session_id.into(),
            action: action.into(),
            detail: detail.into(),
        }
    }
}

/// Keyed record storage with an audit log
///
/// Implementations decide conflict resolution; concurrent `put_item` calls on
/// the same key are last-write-wins from the server's point of view.
pub trait RecordStore: Send + Sync + 'static {
    /// Fetch a record by key
    fn get_item(&self, id: &str) -> impl Future<Output = Result<Option<Record>, StoreError>> + Send;

    /// All records
    fn list_items(&self) -> impl Future<Output = Result<Vec<Record>, StoreError>> + Send;

    /// Create or replace a record, returning what was stored
    fn put_item(&self, record: Record) -> impl Future<Output = Result<Record, StoreError>> + Send;

    /// Append an audit entry
    fn append_log(&self, entry: AuditEntry) -> impl Future<Output = Result<(), StoreError>> + Send;
}
