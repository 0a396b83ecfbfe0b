//! Command-line and environment configuration.

use clap::{Parser, ValueEnum};
use dwr_mcp_tools::upstream::DEFAULT_BASE_URL;
use dwr_mcp_tools::{Credential, CredentialPlacement, UpstreamConfig};
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    /// MCP over stdin/stdout
    Stdio,
    /// MCP over HTTP (`GET /sse` + `POST /messages`)
    Sse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KeyPlacement {
    Query,
    Header,
}

impl From<KeyPlacement> for CredentialPlacement {
    fn from(value: KeyPlacement) -> Self {
        match value {
            KeyPlacement::Query => Self::Query,
            KeyPlacement::Header => Self::Header,
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "dwr-mcp-server")]
#[command(version)]
#[command(about = "MCP server for the Colorado Division of Water Resources REST API")]
pub struct Cli {
    /// Which MCP transport to serve
    #[arg(long, env = "DWR_MCP_TRANSPORT", value_enum, default_value_t = Transport::Stdio)]
    pub transport: Transport,

    /// DWR REST API base URL
    #[arg(long, env = "DWR_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// DWR API key (optional; anonymous access is rate limited upstream)
    #[arg(long, env = "DWR_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Where to send the API key
    #[arg(long, env = "DWR_API_KEY_PLACEMENT", value_enum, default_value_t = KeyPlacement::Query)]
    pub api_key_placement: KeyPlacement,

    /// Query parameter or header name for the API key (default: `apiKey` / `Token`)
    #[arg(long, env = "DWR_API_KEY_NAME")]
    pub api_key_name: Option<String>,

    /// Upstream request timeout in seconds (no timeout when unset)
    #[arg(long, env = "DWR_UPSTREAM_TIMEOUT_SECS")]
    pub upstream_timeout_secs: Option<u64>,

    /// Bind host for the SSE transport
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,

    /// Bind port for the SSE transport
    #[arg(long, env = "PORT", default_value_t = 3000)]
    pub port: u16,

    /// Shared token required on SSE and REST endpoints
    #[arg(long, env = "MCP_SERVER_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Default log level (overridden by `RUST_LOG`)
    #[arg(long, default_value = "info")]
    pub log_level: String,

    #[arg(long, env = "DWR_LOG_FORMAT", value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,
}

impl Cli {
    #[must_use]
    pub fn upstream_config(&self) -> UpstreamConfig {
        let credential = self
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(|k| {
                Credential::new(
                    self.api_key_placement.into(),
                    self.api_key_name.clone(),
                    k.to_string(),
                )
            });

        UpstreamConfig {
            base_url: self.base_url.clone(),
            credential,
            timeout: self.upstream_timeout_secs.map(Duration::from_secs),
        }
    }

    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Configured auth token, with blank values treated as unset.
    #[must_use]
    pub fn auth_token(&self) -> Option<String> {
        self.auth_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["dwr-mcp-server"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("valid args")
    }

    #[test]
    fn bind_addr_combines_host_and_port() {
        let cli = parse(&["--host", "127.0.0.1", "--port", "8080"]);
        assert_eq!(cli.log_level, "info");
        assert_eq!(cli.bind_addr().to_string(), "127.0.0.1:8080");
    }

    #[test]
    fn api_key_maps_to_credential() {
        let cli = parse(&[
            "--api-key",
            "secret",
            "--api-key-placement",
            "header",
            "--upstream-timeout-secs",
            "15",
        ]);
        let cfg = cli.upstream_config();
        let cred = cfg.credential.expect("credential");
        assert_eq!(cred.placement(), CredentialPlacement::Header);
        assert_eq!(cred.name(), "Token");
        assert_eq!(cfg.timeout, Some(Duration::from_secs(15)));
    }

    #[test]
    fn blank_secrets_are_unset() {
        let cli = parse(&["--api-key", "  ", "--auth-token", ""]);
        assert!(cli.upstream_config().credential.is_none());
        assert!(cli.auth_token().is_none());
    }

    #[test]
    fn rejects_unknown_transport() {
        assert!(Cli::try_parse_from(["dwr-mcp-server", "--transport", "websocket"]).is_err());
    }
}
