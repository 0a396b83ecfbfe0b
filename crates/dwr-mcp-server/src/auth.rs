use axum::extract::{Request, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::middleware::Next;
use axum::response::{IntoResponse as _, Response};
use std::sync::Arc;
use tracing::warn;

/// Shared-token gate for the HTTP surface. With no token configured every request passes.
#[derive(Debug, Clone, Default)]
pub struct AuthGate {
    token: Option<Arc<str>>,
}

impl AuthGate {
    #[must_use]
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: token.map(Arc::from),
        }
    }

    #[must_use]
    pub fn is_enabled(&self) -> bool {
        self.token.is_some()
    }

    /// `token` query parameter first, then `Authorization: Bearer`.
    #[must_use]
    pub fn is_authorized(&self, uri: &Uri, headers: &HeaderMap) -> bool {
        let Some(expected) = self.token.as_deref() else {
            return true;
        };
        if extract_query_token(uri).is_some_and(|t| t == expected) {
            return true;
        }
        extract_bearer_token(headers).is_some_and(|t| t == expected)
    }
}

fn extract_query_token(uri: &Uri) -> Option<String> {
    let query = uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == "token")
        .map(|(_, v)| v.into_owned())
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<&str> {
    let authz = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())?;
    let token = authz.strip_prefix("Bearer ").map(str::trim)?;
    if token.is_empty() {
        return None;
    }
    Some(token)
}

pub(crate) fn unauthorized(msg: &'static str) -> Response {
    (StatusCode::UNAUTHORIZED, msg).into_response()
}

pub(crate) async fn require_token(
    State(gate): State<AuthGate>,
    request: Request,
    next: Next,
) -> Response {
    if gate.is_authorized(request.uri(), request.headers()) {
        return next.run(request).await;
    }
    warn!(path = %request.uri().path(), "rejected unauthorized request");
    unauthorized("Unauthorized")
}
