use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use gemini_live_relay::config::Config;
use gemini_live_relay::server::{self, AppState};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
#[command(version, about = "Relays browser microphone audio to the Gemini Live API")]
struct Cli {
    /// Address to listen on, overriding BIND_ADDRESS
    #[arg(long)]
    bind: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // --- 1. Load Configuration ---
    let config = Config::from_env().context("Failed to load application configuration")?;

    // --- 2. Initialize Logging ---
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_timer(ChronoLocal::rfc_3339())
        .init();

    // --- 3. Parse Command-Line Arguments ---
    let args = Cli::parse();
    let bind_address = args.bind.unwrap_or(config.bind_address);

    // --- 4. Application Setup ---
    let shutdown = CancellationToken::new();
    let live = config.live_config();
    tracing::info!(
        "Configuration loaded. Model: {}, voice: {}",
        live.model(),
        live.voice()
    );
    let state = AppState {
        live: Arc::new(live),
        session: Arc::new(config.session_config()),
        shutdown: shutdown.clone(),
    };

    let listener = tokio::net::TcpListener::bind(bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    tracing::info!("Listening on {} (ws endpoint /ws/chat)", bind_address);

    // --- 5. Serve until Ctrl-C ---
    axum::serve(
        listener,
        server::router(state).into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        tracing::info!("shutting down, closing active sessions");
        shutdown.cancel();
    })
    .await
    .context("Server error")?;

    Ok(())
}
