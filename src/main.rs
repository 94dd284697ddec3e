use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;

use prompt_relay::config::{Cli, Config};
use prompt_relay::metrics::Metrics;
use prompt_relay::provider::build_provider;
use prompt_relay::server::relay_api::{build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse CLI arguments.
    let cli = Cli::parse();

    // Initialize tracing/logging.
    let filter = if cli.verbose {
        "prompt_relay=debug,tower_http=debug"
    } else {
        "prompt_relay=info,tower_http=info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| filter.into()),
        )
        .with_target(true)
        .init();

    info!("prompt-relay v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration.
    let mut config = Config::load(&cli.config)?;
    config.apply_cli(&cli);
    let config = Arc::new(config);

    info!(
        provider = %config.provider.kind,
        model = config.provider.model(),
        timeout_secs = ?config.provider.request_timeout_secs,
        error_mode = ?config.server.error_mode,
        static_dir = %config.server.static_dir.display(),
        "Configuration loaded"
    );

    let metrics = Metrics::new().context("failed to register metrics")?;

    // One provider for the whole process, shared read-only by every request.
    let provider = build_provider(&config.provider, &metrics);

    let state = Arc::new(AppState::new(provider, config.clone(), metrics));
    let app = build_router(state);

    let listen_addr = config.server.listen.clone();
    let listener = TcpListener::bind(&listen_addr)
        .await
        .with_context(|| format!("failed to bind {listen_addr}"))?;
    info!("Listening on {listen_addr}");

    axum::serve(listener, app).await?;

    Ok(())
}
