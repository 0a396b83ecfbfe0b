#![allow(dead_code)]

use anyhow::Context as _;
use dwr_mcp_server::{AuthGate, build_server, sse};
use dwr_mcp_tools::UpstreamConfig;
use std::process::{Child, Command};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub use dwr_test_support::{KillOnDrop, MockUpstream};

pub fn pick_unused_port() -> anyhow::Result<u16> {
    dwr_test_support::pick_unused_port()
}

pub async fn wait_http_ok(url: &str, timeout_dur: Duration) -> anyhow::Result<()> {
    dwr_test_support::wait_http_ok(url, timeout_dur).await
}

pub const SERVER_BIN: &str = env!("CARGO_BIN_EXE_dwr-mcp-server");

/// Spawn the server binary pointed at `upstream_base`.
pub fn spawn_server(upstream_base: &str, extra_args: &[&str]) -> anyhow::Result<Child> {
    Command::new(SERVER_BIN)
        .arg("--base-url")
        .arg(upstream_base)
        .arg("--log-level")
        .arg("info")
        .args(extra_args)
        .env_remove("RUST_LOG")
        .env_remove("DWR_API_KEY")
        .env_remove("MCP_SERVER_TOKEN")
        .spawn()
        .context("spawn dwr-mcp-server")
}

/// The SSE router served in-process on an ephemeral port.
pub struct InProcessServer {
    pub base_url: String,
    shutdown: CancellationToken,
}

impl InProcessServer {
    pub async fn start(config: UpstreamConfig, token: Option<&str>) -> anyhow::Result<Self> {
        let server = build_server(config).context("build server")?;
        let shutdown = CancellationToken::new();
        let app = sse::router(
            server,
            AuthGate::new(token.map(str::to_string)),
            shutdown.clone(),
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .context("bind test server")?;
        let addr = listener.local_addr().context("test server local_addr")?;

        let ct = shutdown.clone();
        tokio::spawn(async move {
            let _ = axum::serve(listener, app)
                .with_graceful_shutdown(async move { ct.cancelled().await })
                .await;
        });

        Ok(Self {
            base_url: format!("http://{addr}"),
            shutdown,
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

impl Drop for InProcessServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

pub fn upstream_config(upstream: &MockUpstream) -> UpstreamConfig {
    UpstreamConfig {
        base_url: upstream.base_url().to_string(),
        credential: None,
        timeout: Some(Duration::from_secs(10)),
    }
}
