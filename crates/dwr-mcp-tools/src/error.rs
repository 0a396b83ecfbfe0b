//! Error types for `dwr-mcp-tools`.
//!
//! Upstream HTTP failures are not errors here: they are recovered into
//! [`crate::ToolCallResult::Failure`]. Everything in [`DwrToolsError`] is fatal for the call.

use serde_json::Value;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DwrToolsError {
    /// The requested tool is not in the catalog.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// Arguments failed schema validation.
    #[error("{message}")]
    InvalidArguments { message: String, data: Value },

    /// Configuration errors (invalid base URL, client construction).
    #[error("config error: {0}")]
    Config(String),

    /// Unexpected failures that are neither upstream HTTP failures nor caller errors.
    #[error("runtime error: {0}")]
    Runtime(String),
}

pub type Result<T> = std::result::Result<T, DwrToolsError>;
