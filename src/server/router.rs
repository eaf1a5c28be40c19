//! Request router
//!
//! Maps an action to its handler and applies the proxy rule: a `set` that the
//! store accepts is answered to the caller and then broadcast to every
//! observer, exactly once each. Observers never delay the caller's reply.

use std::sync::Arc;

use serde::Serialize;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{ProtocolError, Result};
use crate::protocol::constants::{
    MSG_FAILED_TO_GET, MSG_FAILED_TO_LIST, MSG_FAILED_TO_SET, MSG_ITEM_NOT_FOUND,
    MSG_MISSING_ID_FOR_SET, MSG_UNKNOWN_ACTION,
};
use crate::protocol::{encode_frame, Action, Record, Request, Response};
use crate::registry::{SharedWriter, SubscriptionRegistry};
use crate::session::SessionContext;
use crate::stats::ServerStats;
use crate::store::{AuditEntry, RecordStore};

/// What the connection does after a request was routed
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// The response was sent; the connection closes
    Replied(Response),
    /// The connection is now an observer; nothing was sent
    Observing,
}

/// Routes requests to handlers
pub struct Router<S, W> {
    store: Arc<S>,
    registry: Arc<SubscriptionRegistry<W>>,
    stats: Arc<ServerStats>,
}

impl<S, W> Router<S, W>
where
    S: RecordStore,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(
        store: Arc<S>,
        registry: Arc<SubscriptionRegistry<W>>,
        stats: Arc<ServerStats>,
    ) -> Self {
        Self {
            store,
            registry,
            stats,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<SubscriptionRegistry<W>> {
        &self.registry
    }

    pub fn stats(&self) -> &Arc<ServerStats> {
        &self.stats
    }

    /// Handle one validated request and send its reply, if it has one
    pub async fn handle(
        &self,
        ctx: &SessionContext,
        request: Request,
        writer: &SharedWriter<W>,
    ) -> Result<Dispatch> {
        self.stats.request();

        tracing::debug!(
            session_id = ctx.session_id,
            uuid = %request.uuid,
            action = %request.action,
            "Routing request"
        );

        let action = request.action.clone();
        let response = match action {
            Action::Get => self.handle_get(ctx, &request).await,
            Action::List => self.handle_list(ctx, &request).await,
            Action::Set => {
                let (response, stored) = self.handle_set(ctx, request).await;
                let sent = self.send(writer, &response).await;

                // Persisted records go out even if the caller already hung up
                if let Some(record) = stored {
                    self.publish(&record).await;
                }

                sent?;
                return Ok(Dispatch::Replied(response));
            }
            Action::Subscribe => {
                self.handle_subscribe(ctx, &request, writer).await;
                return Ok(Dispatch::Observing);
            }
            Action::Unknown(name) => {
                self.audit(ctx, &request.uuid, &name, "unknown action").await;
                Response::error(MSG_UNKNOWN_ACTION)
            }
        };

        self.send(writer, &response).await?;
        Ok(Dispatch::Replied(response))
    }

    /// Encode and write a response
    pub async fn send(&self, writer: &SharedWriter<W>, response: &Response) -> Result<()> {
        if !response.is_ok() {
            self.stats.error_response();
        }
        send_frame(writer, response).await
    }

    async fn handle_get(&self, ctx: &SessionContext, request: &Request) -> Response {
        let detail = format!("ID: {}", request.id.as_deref().unwrap_or("None"));
        self.audit(ctx, &request.uuid, "get", &detail).await;

        // A missing ID is just a lookup miss
        let Some(ref id) = request.id else {
            return Response::error(MSG_ITEM_NOT_FOUND);
        };

        match self.store.get_item(id).await {
            Ok(Some(record)) => Response::record(record),
            Ok(None) => Response::error(MSG_ITEM_NOT_FOUND),
            Err(e) => {
                tracing::error!(session_id = ctx.session_id, id = %id, error = %e, "Get failed");
                Response::error(MSG_FAILED_TO_GET)
            }
        }
    }

    async fn handle_list(&self, ctx: &SessionContext, request: &Request) -> Response {
        self.audit(ctx, &request.uuid, "list", "").await;

        match self.store.list_items().await {
            Ok(records) => Response::records(records),
            Err(e) => {
                tracing::error!(session_id = ctx.session_id, error = %e, "List failed");
                Response::error(MSG_FAILED_TO_LIST)
            }
        }
    }

    /// Persist the record; returns the reply and what the store kept
    async fn handle_set(&self, ctx: &SessionContext, request: Request) -> (Response, Option<Record>) {
        let Request {
            uuid, id, fields, ..
        } = request;

        let Some(id) = id else {
            return (Response::error(MSG_MISSING_ID_FOR_SET), None);
        };

        self.audit(ctx, &uuid, "set", &format!("ID: {}", id)).await;

        let stored = match self.store.put_item(Record::from_fields(id.clone(), fields)).await {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(session_id = ctx.session_id, id = %id, error = %e, "Set failed");
                return (Response::error(MSG_FAILED_TO_SET), None);
            }
        };

        (Response::record(stored.clone()), Some(stored))
    }

    /// Push a stored record to every observer
    async fn publish(&self, record: &Record) {
        let id = record.id().unwrap_or_default();

        match self.registry.broadcast(record).await {
            Ok(report) => {
                self.stats.broadcast(report.delivered, report.pruned);
                tracing::info!(
                    id = %id,
                    delivered = report.delivered,
                    pruned = report.pruned,
                    "Record broadcast"
                );
            }
            Err(e) => {
                tracing::error!(id = %id, error = %e, "Failed to encode broadcast");
            }
        }
    }

    async fn handle_subscribe(
        &self,
        ctx: &SessionContext,
        request: &Request,
        writer: &SharedWriter<W>,
    ) {
        self.audit(ctx, &request.uuid, "subscribe", "").await;
        self.registry
            .attach(ctx.session_id, Arc::clone(writer))
            .await;
    }

    /// Best-effort audit entry; failures are logged and swallowed
    async fn audit(&self, ctx: &SessionContext, uuid: &str, action: &str, detail: &str) {
        let entry = AuditEntry::new(uuid, ctx.audit_session(), action, detail);

        if let Err(e) = self.store.append_log(entry).await {
            tracing::warn!(
                session_id = ctx.session_id,
                action = action,
                error = %e,
                "Failed to write audit entry"
            );
        }
    }
}

/// Encode a message as one frame and write it
pub async fn send_frame<W, T>(writer: &SharedWriter<W>, message: &T) -> Result<()>
where
    W: AsyncWrite + Unpin + Send,
    T: Serialize + ?Sized,
{
    let frame = encode_frame(message).map_err(ProtocolError::from)?;

    let mut writer = writer.lock().await;
    writer.write_all(&frame).await?;
    writer.flush().await?;
    Ok(())
}
