//! Per-connection session
//!
//! Reads frames one at a time, validates them, and hands requests to the
//! router. A one-shot request ends the connection after its reply; `subscribe`
//! keeps it open as an observer until the peer goes away.

use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::sync::Mutex;

use crate::error::{Error, ProtocolError, Result};
use crate::protocol::constants::MSG_INVALID_JSON;
use crate::protocol::{Action, FrameError, Framer, Request, Response};
use crate::registry::SharedWriter;
use crate::server::router::{Dispatch, Router};
use crate::session::{SessionContext, SessionState};
use crate::store::RecordStore;

/// One accepted connection
pub struct Connection<S, R, W> {
    ctx: SessionContext,
    reader: R,
    writer: SharedWriter<W>,
    framer: Framer,
    state: SessionState,
    router: Arc<Router<S, W>>,
}

impl<S, R, W> Connection<S, R, W>
where
    S: RecordStore,
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send + 'static,
{
    pub fn new(
        ctx: SessionContext,
        reader: R,
        writer: W,
        router: Arc<Router<S, W>>,
        max_frame_size: usize,
    ) -> Self {
        Self {
            ctx,
            reader,
            writer: Arc::new(Mutex::new(writer)),
            framer: Framer::with_max_frame_size(max_frame_size),
            state: SessionState::new(),
            router,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Run the session to completion
    ///
    /// Cleanup (observer detach, socket shutdown) happens on every exit path.
    pub async fn run(&mut self) -> Result<()> {
        let result = self.serve().await;
        self.teardown().await;
        result
    }

    async fn serve(&mut self) -> Result<()> {
        loop {
            let frame = match self.framer.read_frame(&mut self.reader).await {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    tracing::debug!(session_id = self.ctx.session_id, "Peer closed connection");
                    return Ok(());
                }
                Err(e) => {
                    if is_invalid_json(&e) && !self.state.is_observer() {
                        tracing::warn!(session_id = self.ctx.session_id, "Invalid JSON received");
                        // Best effort; the connection is closing either way
                        let _ = self
                            .router
                            .send(&self.writer, &Response::error(MSG_INVALID_JSON))
                            .await;
                    }
                    return Err(e);
                }
            };
            self.state.on_frame();

            if self.state.is_observer() {
                tracing::debug!(
                    session_id = self.ctx.session_id,
                    "Ignoring frame from observer"
                );
                continue;
            }

            let request = match Request::from_value(frame) {
                Ok(request) => request,
                Err(e) => {
                    tracing::debug!(session_id = self.ctx.session_id, error = %e, "Rejected request");
                    self.router
                        .send(&self.writer, &Response::error(e.to_string()))
                        .await?;
                    return Ok(());
                }
            };

            if request.action != Action::Subscribe {
                self.state.on_request();
            }

            match self.router.handle(&self.ctx, request, &self.writer).await? {
                Dispatch::Replied(_) => return Ok(()),
                Dispatch::Observing => {
                    self.state.on_subscribe();
                    tracing::info!(
                        session_id = self.ctx.session_id,
                        peer = ?self.ctx.peer_addr,
                        "Connection is now observing"
                    );
                }
            }
        }
    }

    async fn teardown(&mut self) {
        if self.state.is_observer() {
            self.router.registry().detach(self.ctx.session_id).await;
        }
        self.state.close();

        tracing::debug!(
            session_id = self.ctx.session_id,
            frames = self.state.frames_received,
            duration_ms = self.state.duration().as_millis() as u64,
            "Session finished"
        );

        let mut writer = self.writer.lock().await;
        if let Err(e) = writer.shutdown().await {
            tracing::trace!(session_id = self.ctx.session_id, error = %e, "Shutdown failed");
        }
    }
}

fn is_invalid_json(error: &Error) -> bool {
    matches!(
        error,
        Error::Protocol(ProtocolError::Frame(FrameError::InvalidJson(_)))
    )
}
