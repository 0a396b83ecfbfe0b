//! Tool catalog + dispatch runtime for the DWR MCP gateway.
//!
//! This crate is transport-agnostic: it is used by:
//! - the stdio (duplex) transport
//! - the SSE (split-channel) transport and its REST mirrors
//!
//! It intentionally contains **no** MCP session handling and **no** HTTP server code.

pub mod dispatch;
pub mod error;
pub mod normalize;
pub mod registry;
pub mod result;
pub mod upstream;

pub use dispatch::{Dispatcher, ToolCallRequest};
pub use error::{DwrToolsError, Result};
pub use normalize::normalize_params;
pub use registry::{ToolDefinition, ToolKind, ToolRegistry};
pub use result::ToolCallResult;
pub use upstream::{Credential, CredentialPlacement, UpstreamClient, UpstreamConfig, UpstreamRequest};
