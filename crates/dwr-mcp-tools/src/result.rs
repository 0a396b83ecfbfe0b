//! Transport-agnostic tool call outcome and its MCP envelope.

use rmcp::model::{CallToolResult, Content};
use serde_json::{Value, json};

/// Outcome of one upstream call.
///
/// `Failure` covers upstream HTTP failures only (non-2xx or transport errors). It is a regular
/// result: the MCP call succeeds with `isError = true`.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCallResult {
    /// Upstream payload: parsed JSON, or the raw body text as a JSON string.
    Success { payload: Value },
    Failure {
        message: String,
        upstream_body: Option<Value>,
    },
}

impl ToolCallResult {
    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Failure { .. })
    }

    /// Text rendering used for the single MCP content block.
    #[must_use]
    pub fn to_text(&self) -> String {
        match self {
            Self::Success { payload } => {
                if let Some(s) = payload.as_str() {
                    s.to_string()
                } else {
                    pretty(payload)
                }
            }
            Self::Failure {
                message,
                upstream_body,
            } => {
                let body = upstream_body.clone().unwrap_or_else(|| json!({}));
                format!("DWR API Error: {message}\n{}", pretty(&body))
            }
        }
    }

    #[must_use]
    pub fn into_call_tool_result(self) -> CallToolResult {
        let content = vec![Content::text(self.to_text())];
        if self.is_error() {
            CallToolResult::error(content)
        } else {
            CallToolResult::success(content)
        }
    }
}

impl From<ToolCallResult> for CallToolResult {
    fn from(value: ToolCallResult) -> Self {
        value.into_call_tool_result()
    }
}

fn pretty(v: &Value) -> String {
    serde_json::to_string_pretty(v).unwrap_or_else(|_| v.to_string())
}
