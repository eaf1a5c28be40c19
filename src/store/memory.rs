//! In-memory record store

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AuditEntry, RecordStore, StoreError};
use crate::protocol::Record;

/// Audit log line as kept by [`MemoryStore`]
#[derive(Debug, Clone)]
pub struct AuditRecord {
    /// Unique id of the log line
    pub id: Uuid,
    /// When the entry was appended
    pub timestamp: DateTime<Utc>,
    pub entry: AuditEntry,
}

/// Process-local store
///
/// Records are kept ordered by key, so `list_items` is deterministic.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<BTreeMap<String, Record>>,
    audit: RwLock<Vec<AuditRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with records
    ///
    /// Records without an `id` are skipped.
    pub fn with_records(records: impl IntoIterator<Item = Record>) -> Self {
        let map = records
            .into_iter()
            .filter_map(|r| r.id().map(|id| (id.to_string(), r.clone())))
            .collect();

        Self {
            records: RwLock::new(map),
            audit: RwLock::new(Vec::new()),
        }
    }

    /// Snapshot of the audit log
    pub async fn audit_log(&self) -> Vec<AuditRecord> {
        self.audit.read().await.clone()
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }
}

impl RecordStore for MemoryStore {
    async fn get_item(&self, id: &str) -> Result<Option<Record>, StoreError> {
        Ok(self.records.read().await.get(id).cloned())
    }

    async fn list_items(&self) -> Result<Vec<Record>, StoreError> {
        Ok(self.records.read().await.values().cloned().collect())
    }

    async fn put_item(&self, record: Record) -> Result<Record, StoreError> {
        let id = record.id().ok_or(StoreError::MissingKey)?.to_string();

        self.records.write().await.insert(id.clone(), record.clone());
        tracing::debug!(id = %id, "Record stored");

        Ok(record)
    }

    async fn append_log(&self, entry: AuditEntry) -> Result<(), StoreError> {
        self.audit.write().await.push(AuditRecord {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            entry,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{json, Map};

    use super::*;

    #[tokio::test]
    async fn test_put_then_get() {
        let store = MemoryStore::new();
        let mut record = Record::new("x1");
        record.insert("data", json!("v"));

        let stored = store.put_item(record.clone()).await.unwrap();
        assert_eq!(stored, record);

        let fetched = store.get_item("x1").await.unwrap().unwrap();
        assert_eq!(fetched.get("data"), Some(&json!("v")));
        assert!(store.get_item("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_replaces() {
        let store = MemoryStore::new();
        let mut first = Record::new("x1");
        first.insert("data", json!(1));
        let mut second = Record::new("x1");
        second.insert("other", json!(2));

        store.put_item(first).await.unwrap();
        store.put_item(second.clone()).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.get_item("x1").await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_put_without_key() {
        let store = MemoryStore::new();
        let record = Record::from_value(json!({"data": "v"})).unwrap();

        assert!(matches!(
            store.put_item(record).await,
            Err(StoreError::MissingKey)
        ));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_key() {
        let store = MemoryStore::with_records(vec![
            Record::new("b"),
            Record::new("a"),
            Record::from_fields("c", Map::new()),
        ]);

        let ids: Vec<String> = store
            .list_items()
            .await
            .unwrap()
            .iter()
            .map(|r| r.id().unwrap().to_string())
            .collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_audit_log() {
        let store = MemoryStore::new();
        store
            .append_log(AuditEntry::new("u1", "s1", "get", "ID: x1"))
            .await
            .unwrap();
        store
            .append_log(AuditEntry::new("u1", "s1", "list", ""))
            .await
            .unwrap();

        let log = store.audit_log().await;
        assert_eq!(log.len(), 2);
        assert_eq!(log[0].entry.action, "get");
        assert_eq!(log[0].entry.detail, "ID: x1");
        assert_ne!(log[0].id, log[1].id);
    }
}
