//! Statistics for the record server

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Server-wide counters
///
/// Updated lock-free from every connection task.
#[derive(Debug)]
pub struct ServerStats {
    started_at: Instant,
    connections_accepted: AtomicU64,
    connections_rejected: AtomicU64,
    active_connections: AtomicU64,
    requests: AtomicU64,
    error_responses: AtomicU64,
    broadcasts: AtomicU64,
    pushes_delivered: AtomicU64,
    observers_pruned: AtomicU64,
}

impl ServerStats {
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            connections_accepted: AtomicU64::new(0),
            connections_rejected: AtomicU64::new(0),
            active_connections: AtomicU64::new(0),
            requests: AtomicU64::new(0),
            error_responses: AtomicU64::new(0),
            broadcasts: AtomicU64::new(0),
            pushes_delivered: AtomicU64::new(0),
            observers_pruned: AtomicU64::new(0),
        }
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn connection_rejected(&self) {
        self.connections_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn error_response(&self) {
        self.error_responses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one broadcast pass
    pub fn broadcast(&self, delivered: usize, pruned: usize) {
        self.broadcasts.fetch_add(1, Ordering::Relaxed);
        self.pushes_delivered
            .fetch_add(delivered as u64, Ordering::Relaxed);
        self.observers_pruned.fetch_add(pruned as u64, Ordering::Relaxed);
    }

    /// Point-in-time copy of all counters
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            uptime: self.started_at.elapsed(),
            connections_accepted: self.connections_accepted.load(Ordering::Relaxed),
            connections_rejected: self.connections_rejected.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            requests: self.requests.load(Ordering::Relaxed),
            error_responses: self.error_responses.load(Ordering::Relaxed),
            broadcasts: self.broadcasts.load(Ordering::Relaxed),
            pushes_delivered: self.pushes_delivered.load(Ordering::Relaxed),
            observers_pruned: self.observers_pruned.load(Ordering::Relaxed),
        }
    }
}

impl Default for ServerStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy of [`ServerStats`] counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Time since the server was created
    pub uptime: Duration,
    pub connections_accepted: u64,
    /// Dropped because of the connection limit
    pub connections_rejected: u64,
    pub active_connections: u64,
    /// Frames that passed validation
    pub requests: u64,
    pub error_responses: u64,
    /// Successful `set` operations fanned out
    pub broadcasts: u64,
    pub pushes_delivered: u64,
    pub observers_pruned: u64,
}
