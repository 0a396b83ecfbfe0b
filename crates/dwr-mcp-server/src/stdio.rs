//! Duplex transport: MCP over stdin/stdout.

use crate::error::{Result, ServerError};
use crate::handler::DwrMcpServer;
use rmcp::ServiceExt as _;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Serve MCP on stdio until stdin closes or `shutdown` is cancelled.
///
/// # Errors
///
/// Returns an error if the MCP handshake fails or the service task panics.
pub async fn serve(server: DwrMcpServer, shutdown: CancellationToken) -> Result<()> {
    info!("DWR MCP server running on stdio");

    let running = match server
        .serve_with_ct(rmcp::transport::stdio(), shutdown.clone())
        .await
    {
        Ok(running) => running,
        // Signalled before the client finished initializing.
        Err(_) if shutdown.is_cancelled() => return Ok(()),
        Err(e) => {
            return Err(ServerError::Startup(format!(
                "stdio handshake failed: {e}"
            )));
        }
    };

    let reason = running
        .waiting()
        .await
        .map_err(|e| ServerError::Runtime(format!("stdio service task failed: {e}")))?;
    info!(?reason, "stdio session ended");
    Ok(())
}
