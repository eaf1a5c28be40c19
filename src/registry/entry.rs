//! Subscriber entry
//!
//! One registered observer connection: its session id and the write half of
//! its socket, shared with the connection that owns it.

use std::sync::Arc;
use std::time::Instant;

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

/// Write half shared between a connection and the registry
pub type SharedWriter<W> = Arc<Mutex<W>>;

/// A registered observer
pub struct Subscriber<W> {
    /// Session id of the owning connection
    pub session_id: u64,

    /// When the observer subscribed
    pub attached_at: Instant,

    writer: SharedWriter<W>,
}

impl<W> Subscriber<W> {
    pub(super) fn new(session_id: u64, writer: SharedWriter<W>) -> Self {
        Self {
            session_id,
            attached_at: Instant::now(),
            writer,
        }
    }
}

impl<W: AsyncWrite + Unpin + Send> Subscriber<W> {
    /// Write one encoded frame
    pub(super) async fn push(&self, frame: &[u8]) -> std::io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(frame).await?;
        writer.flush().await
    }
}

impl<W> Clone for Subscriber<W> {
    fn clone(&self) -> Self {
        Self {
            session_id: self.session_id,
            attached_at: self.attached_at,
            writer: Arc::clone(&self.writer),
        }
    }
}

impl<W> std::fmt::Debug for Subscriber<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscriber")
            .field("session_id", &self.session_id)
            .field("attached_at", &self.attached_at)
            .finish_non_exhaustive()
    }
}
