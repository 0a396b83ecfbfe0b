use anyhow::Context as _;
use futures::StreamExt as _;
use futures::stream::BoxStream;
use serde_json::json;
use std::time::Duration;

type EventStream = BoxStream<'static, Result<sse_stream::Sse, sse_stream::Error>>;

/// Minimal MCP client for the split-channel transport (`GET /sse` + `POST /messages`).
///
/// Test-only: replies are read off the event stream in arrival order.
pub struct McpSseSession {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    stream: EventStream,
    pub endpoint: String,
}

impl McpSseSession {
    /// Open the event stream and read the `endpoint` event, without initializing.
    pub async fn open(base_url: &str, token: Option<&str>) -> anyhow::Result<Self> {
        let client = reqwest::Client::new();
        let base_url = base_url.trim_end_matches('/').to_string();

        let mut req = client
            .get(format!("{base_url}/sse"))
            .header("Accept", "text/event-stream");
        if let Some(token) = token {
            req = req.query(&[("token", token)]);
        }
        let resp = req
            .send()
            .await
            .context("GET /sse")?
            .error_for_status()
            .context("GET /sse status")?;

        let content_type = resp
            .headers()
            .get("content-type")
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default()
            .to_string();
        anyhow::ensure!(
            content_type.starts_with("text/event-stream"),
            "unexpected content-type {content_type}"
        );

        let mut stream: EventStream =
            sse_stream::SseStream::from_byte_stream(resp.bytes_stream()).boxed();
        let (event, data) = next_event(&mut stream, Duration::from_secs(5))
            .await?
            .context("event-stream ended before endpoint event")?;
        anyhow::ensure!(event == "endpoint", "first event was {event}");

        Ok(Self {
            client,
            base_url,
            token: token.map(str::to_string),
            stream,
            endpoint: data,
        })
    }

    /// Open the stream and run the initialize handshake.
    pub async fn connect(base_url: &str, token: Option<&str>) -> anyhow::Result<Self> {
        let mut session = Self::open(base_url, token).await?;

        let init = session
            .request(
                0,
                "initialize",
                json!({
                    "protocolVersion": "2024-11-05",
                    "capabilities": {},
                    "clientInfo": { "name": "dwr-mcp-server-integration-tests", "version": "0" }
                }),
                Duration::from_secs(5),
            )
            .await?;
        anyhow::ensure!(init.get("result").is_some(), "initialize failed: {init}");

        let status = session
            .post(json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
            .await?;
        anyhow::ensure!(
            status == 202,
            "POST notifications/initialized returned {status}"
        );

        Ok(session)
    }

    #[must_use]
    pub fn session_id(&self) -> &str {
        self.endpoint
            .split_once("sessionId=")
            .map(|(_, id)| id)
            .unwrap_or_default()
    }

    /// POST one message to the advertised endpoint and return the status code.
    pub async fn post(&self, body: serde_json::Value) -> anyhow::Result<u16> {
        let mut req = self
            .client
            .post(format!("{}{}", self.base_url, self.endpoint))
            .json(&body);
        if let Some(token) = &self.token {
            req = req.query(&[("token", token)]);
        }
        let resp = req.send().await.context("POST /messages")?;
        Ok(resp.status().as_u16())
    }

    pub async fn request(
        &mut self,
        id: u64,
        method: &str,
        params: serde_json::Value,
        timeout_dur: Duration,
    ) -> anyhow::Result<serde_json::Value> {
        let status = self
            .post(json!({
                "jsonrpc": "2.0",
                "id": id,
                "method": method,
                "params": params,
            }))
            .await?;
        anyhow::ensure!(status == 202, "POST {method} returned {status}");

        loop {
            let (event, data) = next_event(&mut self.stream, timeout_dur)
                .await?
                .context("event-stream ended while waiting for response")?;
            if event != "message" {
                continue;
            }
            let msg: serde_json::Value =
                serde_json::from_str(&data).context("parse message event as JSON")?;
            if msg.get("id") == Some(&json!(id)) {
                return Ok(msg);
            }
        }
    }

    /// Wait until the server ends the event stream.
    pub async fn wait_closed(&mut self, timeout_dur: Duration) -> anyhow::Result<()> {
        tokio::time::timeout(timeout_dur, async {
            // A body error also means the server side went away.
            while let Some(Ok(_)) = self.stream.next().await {}
        })
        .await
        .context("timeout waiting for event-stream to close")
    }
}

/// Next `(event, data)` pair, skipping keep-alive comments.
async fn next_event(
    stream: &mut EventStream,
    timeout_dur: Duration,
) -> anyhow::Result<Option<(String, String)>> {
    loop {
        let item = tokio::time::timeout(timeout_dur, stream.next())
            .await
            .context("timeout waiting for SSE event")?;
        let Some(evt) = item else {
            return Ok(None);
        };
        let evt = evt.context("read SSE event")?;
        let Some(data) = evt.data else {
            continue;
        };
        let event = evt.event.unwrap_or_else(|| "message".to_string());
        return Ok(Some((event, data)));
    }
}

/// `result.content[0].text` of a `tools/call` response.
#[allow(dead_code)]
pub fn tool_call_text(msg: &serde_json::Value) -> anyhow::Result<String> {
    msg.get("result")
        .and_then(|r| r.get("content"))
        .and_then(serde_json::Value::as_array)
        .and_then(|c| c.first())
        .and_then(|c| c.get("text"))
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
        .context("tools/call missing result.content[0].text")
}
