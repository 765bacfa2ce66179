//! TCP bind and serve lifecycle for the metrics API.

use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::router::build_router;
use crate::state::AppState;

/// Bind configuration for the metrics API server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// The host address to bind to (e.g. `0.0.0.0`).
    pub host: String,
    /// The TCP port to listen on.
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: String::from("0.0.0.0"),
            port: 8080,
        }
    }
}

impl ServerConfig {
    /// Load bind configuration from `HOST` / `PORT`, defaulting to
    /// `0.0.0.0:8080`.
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(default.host),
            port: std::env::var("PORT")
                .ok()
                .and_then(|raw| raw.parse().ok())
                .unwrap_or(default.port),
        }
    }
}

/// Errors that can occur when starting or running the server.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    /// The listener could not be established on the configured address.
    #[error("failed to bind listener: {0}")]
    Bind(String),

    /// The server stopped with a fatal I/O error.
    #[error("server terminated: {0}")]
    Serve(String),
}

/// Bind the configured address and serve the metrics API until the
/// process is terminated.
///
/// # Errors
///
/// Returns [`StartError`] when the listener cannot be established or the
/// server hits a fatal I/O error while running.
pub async fn start_server(config: &ServerConfig, state: Arc<AppState>) -> Result<(), StartError> {
    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .map_err(|e| {
            StartError::Bind(format!(
                "cannot listen on {}:{}: {e}",
                config.host, config.port
            ))
        })?;

    let addr = listener
        .local_addr()
        .map_err(|e| StartError::Bind(format!("listener has no local address: {e}")))?;
    info!(%addr, "serving metrics API");

    axum::serve(listener, build_router(state))
        .await
        .map_err(|e| StartError::Serve(format!("stopped unexpectedly: {e}")))?;

    Ok(())
}
