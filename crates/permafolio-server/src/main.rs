use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use permafolio::config::{default_config_path, ResolvedConfig};
use permafolio_server::{app_router, build_state};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "permafolio-server")]
#[command(about = "HTTP API for permafolio")]
struct Cli {
    /// Path to config file
    #[arg(short, long, default_value_os_t = default_config_path())]
    config: PathBuf,

    /// Address to listen on (overrides `[server] listen_addr`)
    #[arg(long)]
    listen: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for ctrl-c");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = ResolvedConfig::load_or_default(&cli.config)
        .with_context(|| format!("Failed to load config: {}", cli.config.display()))?;
    let listen_addr = cli
        .listen
        .unwrap_or_else(|| config.server.listen_addr.clone());

    let state = build_state(&config)?;
    let router = app_router(state);

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("Failed to bind {listen_addr}"))?;
    tracing::info!("Listening on {listen_addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}
