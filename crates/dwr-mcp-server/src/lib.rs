//! MCP server for the Colorado Division of Water Resources REST API.
//!
//! Serves the tool catalog from `dwr-mcp-tools` over either stdio or HTTP+SSE, plus REST
//! mirrors of the fixed-endpoint tools on the HTTP side.

pub mod auth;
pub mod config;
pub mod error;
pub mod handler;
pub mod rest;
pub mod session;
pub mod sse;
pub mod stdio;

pub use auth::AuthGate;
pub use config::{Cli, LogFormat, Transport};
pub use error::{Result, ServerError};
pub use handler::DwrMcpServer;

use dwr_mcp_tools::{Dispatcher, ToolRegistry, UpstreamClient, UpstreamConfig};

/// Build the handler from upstream settings.
///
/// # Errors
///
/// Returns an error if the base URL is invalid or the HTTP client cannot be built.
pub fn build_server(config: UpstreamConfig) -> Result<DwrMcpServer> {
    let upstream = UpstreamClient::new(config)?;
    let dispatcher = Dispatcher::new(ToolRegistry::builtin(), upstream)?;
    Ok(DwrMcpServer::new(dispatcher))
}
