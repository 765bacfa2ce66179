//! Error types for the metrics engine.
//!
//! Uses `thiserror` for typed errors across the whole fetch cycle:
//! configuration, warehouse submission, result polling, and snapshot
//! persistence. All per-query variants are caught inside the pipeline and
//! converted into per-query failure outcomes; only [`EngineError::Config`]
//! and store failures surface as run-level errors.

use std::time::Duration;

/// Errors that can occur while refreshing the metrics snapshot.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// The warehouse rejected a query submission or returned a malformed
    /// submission response.
    #[error("submission error: {0}")]
    Submission(String),

    /// The provider reported that the account's rate or datapoint quota
    /// is exhausted. Logged distinctly, merged identically to other
    /// per-query failures.
    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Polling exceeded the per-query wall-clock budget. The remote
    /// execution is not cancelled; the engine simply stops waiting.
    #[error("query timed out after {}s", .0.as_secs())]
    Timeout(Duration),

    /// The provider reported a terminal failed execution state.
    #[error("query failed: {0}")]
    RemoteFailed(String),

    /// HTTP transport failure talking to the warehouse.
    #[error("http error: {0}")]
    Http(String),

    /// Serialization or deserialization failure.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Filesystem failure in the snapshot store.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Whether this error is the provider's rate/datapoint quota signal.
    pub const fn is_quota(&self) -> bool {
        matches!(self, Self::QuotaExceeded(_))
    }
}
