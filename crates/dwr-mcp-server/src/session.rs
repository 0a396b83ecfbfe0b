//! The single active split-channel session.
//!
//! At most one event stream is live at a time. Opening a new one cancels the previous session
//! (its stream ends and its MCP service stops) and installs the new one.

use futures::SinkExt as _;
use futures::channel::mpsc;
use parking_lot::Mutex;
use rmcp::model::ClientJsonRpcMessage;
use std::sync::Arc;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

const INBOUND_CAPACITY: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ForwardError {
    #[error("No active SSE session")]
    NoSession,
    #[error("Unknown session: {0}")]
    UnknownSession(String),
}

struct ActiveSession {
    id: String,
    inbound: mpsc::Sender<ClientJsonRpcMessage>,
    ct: CancellationToken,
}

/// Handle returned to the `GET /sse` handler for a freshly opened session.
pub struct OpenedSession {
    pub id: String,
    pub inbound: mpsc::Receiver<ClientJsonRpcMessage>,
    pub ct: CancellationToken,
}

#[derive(Clone)]
pub struct SessionSlot {
    active: Arc<Mutex<Option<ActiveSession>>>,
    shutdown: CancellationToken,
}

impl SessionSlot {
    /// Sessions are child tokens of `shutdown`.
    #[must_use]
    pub fn new(shutdown: CancellationToken) -> Self {
        Self {
            active: Arc::new(Mutex::new(None)),
            shutdown,
        }
    }

    /// Create a session and make it the active one, cancelling any predecessor.
    #[must_use]
    pub fn open(&self) -> OpenedSession {
        let id = uuid::Uuid::new_v4().to_string();
        let (tx, rx) = mpsc::channel(INBOUND_CAPACITY);
        let ct = self.shutdown.child_token();

        let previous = self.active.lock().replace(ActiveSession {
            id: id.clone(),
            inbound: tx,
            ct: ct.clone(),
        });
        if let Some(old) = previous {
            info!(session_id = %old.id, replaced_by = %id, "replacing SSE session");
            old.ct.cancel();
        }
        info!(session_id = %id, "SSE session opened");

        OpenedSession {
            id,
            inbound: rx,
            ct,
        }
    }

    /// Cancel `id`, and clear the slot if it is still the active session.
    pub fn close(&self, id: &str) {
        let mut guard = self.active.lock();
        if guard.as_ref().is_some_and(|s| s.id == id) {
            if let Some(s) = guard.take() {
                s.ct.cancel();
            }
            debug!(session_id = %id, "SSE session closed");
        }
    }

    #[must_use]
    pub fn active_id(&self) -> Option<String> {
        self.active
            .lock()
            .as_ref()
            .filter(|s| !s.ct.is_cancelled())
            .map(|s| s.id.clone())
    }

    /// Forward one client message to the active session.
    ///
    /// `session_id` is optional for clients that omit it; when present it must match.
    ///
    /// # Errors
    ///
    /// [`ForwardError::NoSession`] when nothing is open (or the session is shutting down),
    /// [`ForwardError::UnknownSession`] when `session_id` names another session.
    pub async fn forward(
        &self,
        session_id: Option<&str>,
        message: ClientJsonRpcMessage,
    ) -> Result<(), ForwardError> {
        let mut inbound = {
            let guard = self.active.lock();
            let Some(active) = guard.as_ref().filter(|s| !s.ct.is_cancelled()) else {
                return Err(ForwardError::NoSession);
            };
            if let Some(requested) = session_id
                && requested != active.id
            {
                return Err(ForwardError::UnknownSession(requested.to_string()));
            }
            active.inbound.clone()
        };

        inbound
            .send(message)
            .await
            .map_err(|_| ForwardError::NoSession)
    }
}

/// Closes its session when dropped (client disconnect or stream end).
pub struct SessionGuard {
    slot: SessionSlot,
    id: String,
}

impl SessionGuard {
    #[must_use]
    pub fn new(slot: SessionSlot, id: String) -> Self {
        Self { slot, id }
    }
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.slot.close(&self.id);
    }
}
