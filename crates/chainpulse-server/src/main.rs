//! Metrics API server entry point.
//!
//! Initializes structured logging, loads configuration from environment
//! variables, and serves the dashboard metrics API until terminated.

use std::sync::Arc;

use chainpulse_server::server::{ServerConfig, start_server};
use chainpulse_server::state::AppState;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if the server cannot bind or fails while serving.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("chainpulse-server starting");

    let config = ServerConfig::from_env();
    let state = Arc::new(AppState::from_env());

    info!(
        host = config.host,
        port = config.port,
        pipeline_configured = state.pipeline.is_some(),
        "configuration loaded"
    );

    start_server(&config, state).await?;
    Ok(())
}
