//! Split-channel transport: `GET /sse` event stream plus `POST /messages`.

use crate::auth::{AuthGate, require_token};
use crate::error::{Result, ServerError};
use crate::handler::DwrMcpServer;
use crate::session::{ForwardError, SessionGuard, SessionSlot};
use axum::Router;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::middleware;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse as _, Response};
use axum::routing::{get, post};
use futures::channel::mpsc;
use futures::{Stream, StreamExt as _, stream};
use rmcp::ServiceExt as _;
use rmcp::model::{ClientJsonRpcMessage, ServerJsonRpcMessage};
use serde::Deserialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const OUTBOUND_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct AppState {
    pub server: DwrMcpServer,
    pub sessions: SessionSlot,
}

/// Build the HTTP surface: MCP endpoints and REST mirrors behind the auth gate, `/health` open.
pub fn router(server: DwrMcpServer, auth: AuthGate, shutdown: CancellationToken) -> Router {
    let state = AppState {
        server,
        sessions: SessionSlot::new(shutdown),
    };

    let gated = Router::new()
        .route("/sse", get(sse_handler))
        .route("/messages", post(messages_handler))
        .merge(crate::rest::router())
        .layer(middleware::from_fn_with_state(auth, require_token));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .merge(gated)
        .with_state(state)
}

/// Serve the split-channel transport until `shutdown` is cancelled.
///
/// # Errors
///
/// Returns an error if the listener cannot be bound or the server fails.
pub async fn serve(
    server: DwrMcpServer,
    auth: AuthGate,
    addr: SocketAddr,
    shutdown: CancellationToken,
) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| ServerError::Startup(format!("bind {addr}: {e}")))?;
    info!(
        addr = %listener.local_addr()?,
        auth = auth.is_enabled(),
        "DWR MCP server listening (SSE endpoint: /sse, messages: /messages)"
    );

    let app = router(server, auth, shutdown.clone());
    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
        .map_err(|e| ServerError::Runtime(format!("http server: {e}")))
}

async fn sse_handler(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = std::result::Result<Event, Infallible>>> {
    let opened = state.sessions.open();
    let session_id = opened.id.clone();
    let ct = opened.ct.clone();
    let (outbound_tx, outbound_rx) = mpsc::channel::<ServerJsonRpcMessage>(OUTBOUND_CAPACITY);

    let server = state.server.clone();
    let service_ct = opened.ct.clone();
    let service_session = session_id.clone();
    tokio::spawn(async move {
        match server
            .serve_with_ct((outbound_tx, opened.inbound), service_ct)
            .await
        {
            Ok(running) => {
                let reason = running.waiting().await;
                debug!(session_id = %service_session, ?reason, "MCP session ended");
            }
            Err(e) => {
                debug!(
                    session_id = %service_session,
                    error = %e,
                    "MCP session ended before initialize"
                );
            }
        }
    });

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/messages?sessionId={session_id}"));
    let guard = SessionGuard::new(state.sessions.clone(), session_id);

    let messages = outbound_rx.filter_map(|msg| futures::future::ready(message_event(&msg)));
    let events = stream::once(futures::future::ready(endpoint))
        .chain(messages)
        .take_until(ct.cancelled_owned())
        .map(move |event| {
            let _session = &guard;
            Ok::<_, Infallible>(event)
        });

    Sse::new(events).keep_alive(KeepAlive::default())
}

fn message_event(msg: &ServerJsonRpcMessage) -> Option<Event> {
    match serde_json::to_string(msg) {
        Ok(data) => Some(Event::default().event("message").data(data)),
        Err(e) => {
            warn!(error = %e, "failed to serialize server message");
            None
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagesQuery {
    session_id: Option<String>,
}

async fn messages_handler(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
    body: Bytes,
) -> Response {
    let message: ClientJsonRpcMessage = match serde_json::from_slice(&body) {
        Ok(m) => m,
        Err(e) => {
            return (StatusCode::BAD_REQUEST, format!("Invalid JSON-RPC message: {e}"))
                .into_response();
        }
    };

    match state
        .sessions
        .forward(query.session_id.as_deref(), message)
        .await
    {
        Ok(()) => (StatusCode::ACCEPTED, "Accepted").into_response(),
        Err(e @ ForwardError::NoSession) => {
            (StatusCode::BAD_REQUEST, e.to_string()).into_response()
        }
        Err(e @ ForwardError::UnknownSession(_)) => {
            (StatusCode::NOT_FOUND, e.to_string()).into_response()
        }
    }
}
