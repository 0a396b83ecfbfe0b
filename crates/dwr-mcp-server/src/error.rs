//! Error types for the DWR MCP server.

use thiserror::Error;

/// Main error type for the server.
#[derive(Error, Debug)]
pub enum ServerError {
    /// Startup errors (listener bind, MCP handshake)
    #[error("Startup error: {0}")]
    Startup(String),

    /// Runtime errors (transport failed while serving)
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// Tool catalog / upstream setup errors (invalid base URL, bad credential name)
    #[error(transparent)]
    Tools(#[from] dwr_mcp_tools::DwrToolsError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
