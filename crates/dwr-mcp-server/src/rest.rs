//! Plain REST mirrors of the fixed-endpoint tools.

use crate::sse::AppState;
use axum::Json;
use axum::Router;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse as _, Response};
use axum::routing::{MethodRouter, get};
use dwr_mcp_tools::{DwrToolsError, ToolCallRequest, ToolCallResult, ToolDefinition, ToolKind};
use rmcp::model::JsonObject;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use tracing::warn;

pub(crate) fn router() -> Router<AppState> {
    Router::new()
        .route("/api/surface-water/stations", mirror(ToolKind::SurfaceWaterStations))
        .route("/api/surface-water/ts-day", mirror(ToolKind::SurfaceWaterTsDay))
        .route("/api/water-rights/net-amount", mirror(ToolKind::WaterRightsNetAmount))
        .route("/api/well-permits", mirror(ToolKind::WellPermits))
        .route("/api/admin-calls/active", mirror(ToolKind::ActiveAdminCalls))
}

fn mirror(kind: ToolKind) -> MethodRouter<AppState> {
    get(
        move |State(state): State<AppState>, Query(query): Query<BTreeMap<String, String>>| {
            async move { call(&state, kind, query).await }
        },
    )
}

/// Run one fixed tool with the request's query string as its arguments.
///
/// Upstream and internal failures answer `500 {"error": ..}`. Arguments the caller got wrong
/// (missing, unknown or mistyped parameters) answer `400` with the same body shape, since no
/// upstream request was made.
async fn call(state: &AppState, kind: ToolKind, mut query: BTreeMap<String, String>) -> Response {
    // Consumed by the auth gate, never a tool argument.
    query.remove("token");

    let dispatcher = state.server.dispatcher();
    let arguments = match dispatcher.registry().get(kind.name()) {
        Some(def) => coerce_query(def, query),
        None => JsonObject::new(),
    };

    match dispatcher
        .dispatch(&ToolCallRequest::new(kind.name(), Some(arguments)))
        .await
    {
        Ok(ToolCallResult::Success { payload }) => (StatusCode::OK, Json(payload)).into_response(),
        Ok(ToolCallResult::Failure { message, .. }) => {
            error_response(StatusCode::INTERNAL_SERVER_ERROR, message)
        }
        Err(e @ (DwrToolsError::UnknownTool(_) | DwrToolsError::InvalidArguments { .. })) => {
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
        Err(e) => {
            warn!(tool = kind.name(), error = %e, "REST mirror call failed");
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
    }
}

fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(json!({ "error": message }))).into_response()
}

/// Query strings carry only text; parse numeric properties per the tool schema.
///
/// Values that fail to parse stay strings and are rejected by validation.
fn coerce_query(def: &ToolDefinition, query: BTreeMap<String, String>) -> JsonObject {
    query
        .into_iter()
        .map(|(k, v)| {
            let value = match def.property_type(&k) {
                Some("number") => parse_number(&v).map_or(Value::String(v), Value::Number),
                _ => Value::String(v),
            };
            (k, value)
        })
        .collect()
}

/// Whole numbers stay integers so they are forwarded as `1`, never `1.0`.
fn parse_number(raw: &str) -> Option<serde_json::Number> {
    let raw = raw.trim();
    raw.parse::<i64>()
        .map(serde_json::Number::from)
        .ok()
        .or_else(|| raw.parse::<f64>().ok().and_then(serde_json::Number::from_f64))
}
