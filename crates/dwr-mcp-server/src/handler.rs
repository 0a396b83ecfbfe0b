//! The MCP server handler shared by both transports.

use dwr_mcp_tools::{Dispatcher, DwrToolsError};
use rmcp::model::{
    CallToolRequestParams, CallToolResult, Implementation, ListToolsResult,
    PaginatedRequestParams, ProtocolVersion, ServerCapabilities, ServerInfo,
};
use rmcp::service::RequestContext;
use rmcp::{ErrorData, RoleServer, ServerHandler};
use std::future::Future;
use tracing::{info, warn};

pub const SERVER_NAME: &str = "dwr-mcp-server";

#[derive(Clone)]
pub struct DwrMcpServer {
    dispatcher: Dispatcher,
}

impl DwrMcpServer {
    #[must_use]
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }
}

/// Map a fatal dispatch error onto a JSON-RPC error. Caller mistakes are `invalid_params`.
#[must_use]
pub fn to_error_data(err: DwrToolsError) -> ErrorData {
    match err {
        DwrToolsError::UnknownTool(_) => ErrorData::invalid_params(err.to_string(), None),
        DwrToolsError::InvalidArguments { message, data } => {
            ErrorData::invalid_params(message, Some(data))
        }
        DwrToolsError::Config(_) | DwrToolsError::Runtime(_) => {
            ErrorData::internal_error(err.to_string(), None)
        }
    }
}

impl ServerHandler for DwrMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            protocol_version: ProtocolVersion::LATEST,
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some("Colorado DWR".to_string()),
                ..Default::default()
            },
            instructions: Some(
                "Read-only access to the Colorado Division of Water Resources REST API. Use the \
                 named tools for stations, daily flows, water rights, well permits and admin \
                 calls; use query_dwr_api for any other endpoint."
                    .to_string(),
            ),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParams>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, ErrorData>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult {
            tools: self.dispatcher.registry().to_mcp_tools(),
            ..Default::default()
        }))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParams,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, ErrorData>> + Send + '_ {
        async move {
            let name = request.name.to_string();
            info!(tool = %name, "tools/call");
            match self.dispatcher.call_tool(&name, request.arguments).await {
                Ok(result) => Ok(result),
                Err(e) => {
                    warn!(tool = %name, error = %e, "tool call rejected");
                    Err(to_error_data(e))
                }
            }
        }
    }
}
