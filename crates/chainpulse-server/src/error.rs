//! Error types for the metrics API server.
//!
//! [`ServerError`] unifies all handler failure modes into a single enum
//! that converts into an Axum HTTP response. Per-query fetch failures
//! never reach this type -- the engine absorbs them into the snapshot --
//! so anything arriving here is a run-level problem.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chainpulse_engine::EngineError;

/// Errors that can occur in the HTTP API layer.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Required configuration is missing (warehouse credential, webhook
    /// secret, deploy hook URL).
    #[error("config error: {0}")]
    Config(String),

    /// A run-level engine failure (store I/O, configuration).
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// The webhook bearer secret was absent or wrong.
    #[error("unauthorized")]
    Unauthorized,

    /// The deploy hook could not be reached.
    #[error("upstream error: {0}")]
    Upstream(String),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Config(_) | Self::Engine(_) | Self::Upstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = serde_json::json!({
            "error": self.to_string(),
        });

        (status, axum::Json(body)).into_response()
    }
}
