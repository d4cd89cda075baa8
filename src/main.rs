//! keep-alive-host: runs a keep-alive provider behind an HTTP inspection API.
//!
//! Entries are JSON values; their owner key is read from the configured
//! `owner_field`. Mount notifications are available as SSE per entry.

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use keep_alive_cache::config::{Cli, Config};
use keep_alive_cache::server::api::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "keep_alive_cache=debug,tower_http=debug"
    } else {
        "keep_alive_cache=info,tower_http=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .init();

    info!("keep-alive-host v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration.
    let mut config = Config::load(&cli.config)?;
    config.apply_cli(&cli);
    let config = Arc::new(config);

    info!(
        max = ?config.provider.max,
        owner_field = %config.provider.owner_field,
        include = ?config.provider.include,
        exclude = ?config.provider.exclude,
        "Configuration loaded"
    );

    let state = Arc::new(AppState::new(config.clone())?);
    info!(
        provider = state.handle.provider_identification(),
        "Provider ready"
    );

    let app = build_router(state.clone());

    let listen_addr = config.server.listen.clone();
    let listener = TcpListener::bind(&listen_addr).await?;
    info!("Listening on {listen_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.handle.teardown().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "Failed to listen for shutdown signal");
    }
    info!("Shutdown requested");
}
