//! Upstream call executor: one `GET` against the DWR REST API per tool call.

use crate::error::{DwrToolsError, Result};
use crate::normalize::normalize_params;
use crate::result::ToolCallResult;
use reqwest::Client;
use reqwest::header::HeaderName;
use rmcp::model::JsonObject;
use serde_json::{Value, json};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use url::Url;

pub const DEFAULT_BASE_URL: &str = "https://dwr.state.co.us/Rest/GET/api/v2";

/// Where the shared credential is attached on outbound requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CredentialPlacement {
    #[default]
    Query,
    Header,
}

impl CredentialPlacement {
    #[must_use]
    pub fn default_name(self) -> &'static str {
        match self {
            Self::Query => "apiKey",
            Self::Header => "Token",
        }
    }
}

#[derive(Clone)]
pub struct Credential {
    placement: CredentialPlacement,
    name: String,
    secret: String,
}

impl Credential {
    /// `name` defaults to the placement's conventional name (`apiKey` / `Token`).
    #[must_use]
    pub fn new(
        placement: CredentialPlacement,
        name: Option<String>,
        secret: impl Into<String>,
    ) -> Self {
        Self {
            placement,
            name: name.unwrap_or_else(|| placement.default_name().to_string()),
            secret: secret.into(),
        }
    }

    #[must_use]
    pub fn placement(&self) -> CredentialPlacement {
        self.placement
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("placement", &self.placement)
            .field("name", &self.name)
            .field("secret", &"***")
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct UpstreamConfig {
    pub base_url: String,
    pub credential: Option<Credential>,
    /// `None` leaves the HTTP client's default in place.
    pub timeout: Option<Duration>,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            credential: None,
            timeout: None,
        }
    }
}

/// One outbound request, derived from a tool call.
#[derive(Debug, Clone, PartialEq)]
pub struct UpstreamRequest {
    pub endpoint_path: String,
    pub query_params: JsonObject,
}

#[derive(Clone)]
pub struct UpstreamClient {
    inner: Arc<UpstreamClientInner>,
}

struct UpstreamClientInner {
    base_url: String,
    credential: Option<Credential>,
    timeout: Option<Duration>,
    client: Client,
}

impl UpstreamClient {
    /// # Errors
    ///
    /// Returns [`DwrToolsError::Config`] if the base URL is not a valid absolute URL or a header
    /// credential's name is not a valid HTTP header name.
    pub fn new(config: UpstreamConfig) -> Result<Self> {
        Url::parse(&config.base_url).map_err(|e| {
            DwrToolsError::Config(format!("Invalid base URL '{}': {e}", config.base_url))
        })?;
        if let Some(cred) = &config.credential
            && cred.placement == CredentialPlacement::Header
        {
            HeaderName::from_bytes(cred.name.as_bytes()).map_err(|e| {
                DwrToolsError::Config(format!("Invalid API key header name '{}': {e}", cred.name))
            })?;
        }

        Ok(Self {
            inner: Arc::new(UpstreamClientInner {
                base_url: config.base_url,
                credential: config.credential,
                timeout: config.timeout,
                client: Client::new(),
            }),
        })
    }

    /// Issue the request and classify the outcome.
    ///
    /// Non-2xx responses and transport failures are returned as [`ToolCallResult::Failure`].
    ///
    /// # Errors
    ///
    /// Returns [`DwrToolsError::Runtime`] for failures that are not upstream HTTP failures
    /// (e.g. an endpoint path that does not form a valid URL).
    pub async fn execute(&self, request: &UpstreamRequest) -> Result<ToolCallResult> {
        let inner = &self.inner;
        let params = normalize_params(request.query_params.clone());

        let mut query = build_query_pairs(&params);
        if let Some(cred) = &inner.credential
            && cred.placement == CredentialPlacement::Query
        {
            query.retain(|(k, _)| k != &cred.name);
            query.push((cred.name.clone(), cred.secret.clone()));
        }

        let url = build_url(&inner.base_url, &request.endpoint_path, &query)?;

        info!(
            url = %redact_url(&url),
            params = %loggable_params(&query, inner.credential.as_ref()),
            "fetching DWR endpoint"
        );

        let mut req = inner.client.get(url);
        if let Some(cred) = &inner.credential
            && cred.placement == CredentialPlacement::Header
        {
            req = req.header(cred.name.as_str(), cred.secret.as_str());
        }
        if let Some(t) = inner.timeout {
            req = req.timeout(t);
        }

        let response = match req.send().await {
            Ok(r) => r,
            Err(e) => return transport_failure(&e),
        };
        let status = response.status();
        let text = match response.text().await {
            Ok(t) => t,
            Err(e) => return transport_failure(&e),
        };

        if status.is_success() {
            return Ok(ToolCallResult::Success {
                payload: parse_body(text),
            });
        }

        let message = format!("Request failed with status code {}", status.as_u16());
        warn!(
            endpoint = %request.endpoint_path,
            status = status.as_u16(),
            "DWR API returned an error status"
        );
        let upstream_body = if text.trim().is_empty() {
            None
        } else {
            Some(parse_body(text))
        };
        Ok(ToolCallResult::Failure {
            message,
            upstream_body,
        })
    }
}

fn transport_failure(e: &reqwest::Error) -> Result<ToolCallResult> {
    let message = sanitize_reqwest_error(e);
    // Builder errors mean we produced a bad request; that is our bug, not an upstream failure.
    if e.is_builder() {
        return Err(DwrToolsError::Runtime(message));
    }
    warn!(error = %message, "DWR API request failed");
    Ok(ToolCallResult::Failure {
        message,
        upstream_body: None,
    })
}

fn parse_body(text: String) -> Value {
    serde_json::from_str(&text).unwrap_or(Value::String(text))
}

fn build_query_pairs(params: &JsonObject) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for (key, value) in params {
        match value {
            Value::Array(items) => {
                out.extend(
                    items
                        .iter()
                        .filter(|v| !v.is_null())
                        .map(|v| (key.clone(), value_to_string(v))),
                );
            }
            _ => out.push((key.clone(), value_to_string(value))),
        }
    }
    out
}

fn build_url(base_url: &str, endpoint_path: &str, query: &[(String, String)]) -> Result<Url> {
    let url = format!("{}/{}", base_url.trim_end_matches('/'), endpoint_path);
    let mut url = Url::parse(&url)
        .map_err(|e| DwrToolsError::Runtime(format!("Invalid upstream URL: {e}")))?;

    if !query.is_empty() {
        let encoded = query
            .iter()
            .map(|(k, v)| {
                format!(
                    "{}={}",
                    encode_query_component(k),
                    encode_query_component(v)
                )
            })
            .collect::<Vec<_>>()
            .join("&");
        // Keep any query the endpoint path already carries.
        let merged = match url.query() {
            Some(existing) if !existing.is_empty() => format!("{existing}&{encoded}"),
            _ => encoded,
        };
        url.set_query(Some(&merged));
    }

    Ok(url)
}

fn encode_query_component(s: &str) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut out = String::with_capacity(s.len());
    for &b in s.as_bytes() {
        if is_unreserved(b) {
            out.push(b as char);
        } else {
            out.push('%');
            out.push(HEX[(b >> 4) as usize] as char);
            out.push(HEX[(b & 0x0F) as usize] as char);
        }
    }
    out
}

fn is_unreserved(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~')
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => value.to_string(),
    }
}

/// Effective parameters as a JSON object, with the credential masked.
fn loggable_params(query: &[(String, String)], credential: Option<&Credential>) -> Value {
    let mut out = JsonObject::new();
    for (k, v) in query {
        let masked = credential
            .is_some_and(|c| c.placement == CredentialPlacement::Query && &c.name == k);
        out.insert(k.clone(), if masked { json!("***") } else { json!(v) });
    }
    Value::Object(out)
}

#[must_use]
pub fn redact_url(url: &Url) -> String {
    let mut u = url.clone();
    // Best-effort: drop credentials + query + fragment.
    let _ = u.set_username("");
    let _ = u.set_password(None);
    u.set_query(None);
    u.set_fragment(None);
    u.to_string()
}

fn sanitize_reqwest_error(e: &reqwest::Error) -> String {
    let mut msg = e.to_string();
    if let Some(u) = e.url() {
        msg = msg.replace(u.as_str(), &redact_url(u));
    }
    msg
}
