//! Observer client
//!
//! Subscribes to the server and forwards every pushed record as an event.
//! When the connection drops it waits `retry_delay` and subscribes again.

use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use super::config::ClientConfig;
use super::error::ClientError;
use super::request::connect;
use crate::error::ProtocolError;
use crate::protocol::{encode_frame, Action, Framer, Record, Request};

/// Events from the observer client
#[derive(Debug, Clone, PartialEq)]
pub enum ObserverEvent {
    /// Connected and subscribed
    Connected,

    /// A record stored by some `set`
    Update(Record),

    /// Connection lost, with the reason
    Disconnected(String),
}

/// Observer client
///
/// # Example
/// ```no_run
/// use record_relay::client::{ClientConfig, ObserverClient, ObserverEvent};
///
/// # async fn example() -> Result<(), record_relay::client::ClientError> {
/// let (observer, mut events) = ObserverClient::new(ClientConfig::default(), "u1");
///
/// tokio::spawn(async move {
///     while let Some(event) = events.recv().await {
///         if let ObserverEvent::Update(record) = event {
///             println!("{:?}", record);
///         }
///     }
/// });
///
/// observer.run().await
/// # }
/// ```
pub struct ObserverClient {
    config: ClientConfig,
    uuid: String,
    event_tx: mpsc::Sender<ObserverEvent>,
}

impl ObserverClient {
    /// Create a new observer.
    ///
    /// Returns the observer and a receiver for events.
    pub fn new(
        config: ClientConfig,
        uuid: impl Into<String>,
    ) -> (Self, mpsc::Receiver<ObserverEvent>) {
        let (tx, rx) = mpsc::channel(256);

        let observer = Self {
            config,
            uuid: uuid.into(),
            event_tx: tx,
        };

        (observer, rx)
    }

    /// Subscribe and keep resubscribing
    ///
    /// Returns once the event receiver is dropped, or after the first
    /// disconnect when reconnecting is disabled.
    pub async fn run(&self) -> Result<(), ClientError> {
        loop {
            let reason = match self.run_once().await {
                Ok(()) => "server closed connection".to_string(),
                Err(e) => e.to_string(),
            };

            if self.event_tx.is_closed() {
                return Ok(());
            }
            let _ = self
                .event_tx
                .send(ObserverEvent::Disconnected(reason.clone()))
                .await;

            if !self.config.reconnect {
                return Ok(());
            }

            tracing::debug!(
                reason = %reason,
                retry_secs = self.config.retry_delay.as_secs(),
                "Connection lost, retrying"
            );
            tokio::time::sleep(self.config.retry_delay).await;
        }
    }

    /// One connection: subscribe and forward updates until it closes
    pub async fn run_once(&self) -> Result<(), ClientError> {
        let mut stream = connect(&self.config).await?;
        tracing::debug!(addr = %self.config.addr(), "Connected");

        let request = Request::new(self.uuid.clone(), Action::Subscribe);
        let frame = encode_frame(&request.to_value())
            .map_err(|e| crate::Error::Protocol(ProtocolError::from(e)))?;
        stream.write_all(&frame).await?;
        tracing::debug!("Subscription request sent");

        if self.event_tx.send(ObserverEvent::Connected).await.is_err() {
            return Ok(());
        }

        let mut framer = Framer::with_max_frame_size(self.config.max_frame_size);
        while let Some(value) = framer.read_frame(&mut stream).await? {
            let Some(record) = Record::from_value(value) else {
                tracing::warn!("Ignoring non-object push");
                continue;
            };

            if self.event_tx.send(ObserverEvent::Update(record)).await.is_err() {
                // Receiver dropped
                return Ok(());
            }
        }

        Ok(())
    }
}
