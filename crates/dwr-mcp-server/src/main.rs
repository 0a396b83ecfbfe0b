use anyhow::Context as _;
use clap::Parser as _;
use dwr_mcp_server::{AuthGate, Cli, LogFormat, Transport, build_server, sse, stdio};
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli);

    let server = build_server(cli.upstream_config()).context("build DWR MCP server")?;

    let shutdown = CancellationToken::new();
    tokio::spawn(cancel_on_signal(shutdown.clone()));

    match cli.transport {
        Transport::Stdio => stdio::serve(server, shutdown).await?,
        Transport::Sse => {
            let auth = AuthGate::new(cli.auth_token());
            sse::serve(server, auth, cli.bind_addr(), shutdown).await?;
        }
    }

    info!("DWR MCP server stopped");
    Ok(())
}

fn init_tracing(cli: &Cli) {
    // stdout carries protocol frames on stdio; logs always go to stderr.
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false);

    match cli.log_format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

async fn cancel_on_signal(shutdown: CancellationToken) {
    shutdown_signal().await;
    info!("shutdown signal received");
    shutdown.cancel();
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
}
