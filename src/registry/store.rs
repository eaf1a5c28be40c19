//! Subscription registry implementation
//!
//! The shared set of observer connections. Membership changes and the
//! snapshot/prune steps of a broadcast all go through one mutex; socket writes
//! happen with the mutex released.

use std::collections::HashMap;
use std::io;
use std::time::Duration;

use bytes::Bytes;
use futures::future::join_all;
use tokio::io::AsyncWrite;
use tokio::sync::Mutex;

use super::entry::{SharedWriter, Subscriber};
use crate::error::{ProtocolError, Result};
use crate::protocol::{encode_frame, Record};

/// Outcome of one broadcast pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    /// Observers the record was written to
    pub delivered: usize,
    /// Observers detached because their write failed
    pub pruned: usize,
}

/// Registry of observer connections
pub struct SubscriptionRegistry<W> {
    /// Keyed by session id, so a connection appears at most once
    subscribers: Mutex<HashMap<u64, Subscriber<W>>>,

    /// Upper bound on a single push (None = wait indefinitely)
    push_timeout: Option<Duration>,
}

impl<W: AsyncWrite + Unpin + Send> SubscriptionRegistry<W> {
    /// Create an empty registry without a push timeout
    pub fn new() -> Self {
        Self::with_push_timeout(None)
    }

    /// Create an empty registry with a push timeout
    pub fn with_push_timeout(push_timeout: Option<Duration>) -> Self {
        Self {
            subscribers: Mutex::new(HashMap::new()),
            push_timeout,
        }
    }

    /// Register an observer
    ///
    /// Returns `false` if the session was already registered.
    pub async fn attach(&self, session_id: u64, writer: SharedWriter<W>) -> bool {
        let mut subscribers = self.subscribers.lock().await;

        if subscribers.contains_key(&session_id) {
            return false;
        }

        subscribers.insert(session_id, Subscriber::new(session_id, writer));
        tracing::info!(
            session_id = session_id,
            observers = subscribers.len(),
            "Observer attached"
        );
        true
    }

    /// Unregister an observer
    ///
    /// Removing an absent session is a no-op and returns `false`.
    pub async fn detach(&self, session_id: u64) -> bool {
        let mut subscribers = self.subscribers.lock().await;

        let removed = subscribers.remove(&session_id).is_some();
        if removed {
            tracing::info!(
                session_id = session_id,
                observers = subscribers.len(),
                "Observer detached"
            );
        }
        removed
    }

    /// Check if a session is registered
    pub async fn contains(&self, session_id: u64) -> bool {
        self.subscribers.lock().await.contains_key(&session_id)
    }

    /// Number of registered observers
    pub async fn len(&self) -> usize {
        self.subscribers.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.subscribers.lock().await.is_empty()
    }

    /// Push a record to every registered observer
    ///
    /// The record is serialized once. Observers whose write fails (or times out)
    /// are detached before this returns.
    pub async fn broadcast(&self, record: &Record) -> Result<BroadcastReport> {
        let frame = encode_frame(record).map_err(ProtocolError::from)?;
        Ok(self.broadcast_frame(frame).await)
    }

    /// Push an already encoded frame to every registered observer
    pub async fn broadcast_frame(&self, frame: Bytes) -> BroadcastReport {
        let snapshot: Vec<Subscriber<W>> = {
            let subscribers = self.subscribers.lock().await;
            subscribers.values().cloned().collect()
        };

        if snapshot.is_empty() {
            return BroadcastReport::default();
        }

        tracing::debug!(observers = snapshot.len(), "Notifying observers");

        let pushes = snapshot.iter().map(|subscriber| {
            let frame = &frame;
            async move { (subscriber.session_id, self.push(subscriber, frame).await) }
        });
        let results = join_all(pushes).await;

        let mut report = BroadcastReport::default();
        let mut failed = Vec::new();
        for (session_id, result) in results {
            match result {
                Ok(()) => report.delivered += 1,
                Err(e) => {
                    tracing::debug!(session_id = session_id, error = %e, "Push failed");
                    failed.push(session_id);
                }
            }
        }

        if !failed.is_empty() {
            let mut subscribers = self.subscribers.lock().await;
            for session_id in failed {
                // The connection may have detached itself in the meantime
                if subscribers.remove(&session_id).is_some() {
                    report.pruned += 1;
                    tracing::info!(
                        session_id = session_id,
                        observers = subscribers.len(),
                        "Observer detached after failed push"
                    );
                }
            }
        }

        report
    }

    async fn push(&self, subscriber: &Subscriber<W>, frame: &[u8]) -> io::Result<()> {
        match self.push_timeout {
            Some(timeout) => tokio::time::timeout(timeout, subscriber.push(frame))
                .await
                .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "push timed out"))?,
            None => subscriber.push(frame).await,
        }
    }
}

impl<W: AsyncWrite + Unpin + Send> Default for SubscriptionRegistry<W> {
    fn default() -> Self {
        Self::new()
    }
}
