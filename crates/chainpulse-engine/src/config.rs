//! Configuration for the metrics engine.
//!
//! All configuration is loaded from environment variables once at startup
//! and passed into the pipeline as a value; the engine never reads ambient
//! state after construction. The only required variable is the warehouse
//! API credential -- its absence is a fatal configuration error reported
//! before any network call.

use std::time::Duration;

use crate::error::EngineError;

/// Default warehouse API base URL.
const DEFAULT_API_URL: &str = "https://api.warehouse.example/api/v1";

/// Complete engine configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Warehouse API credential, sent on every request.
    pub api_key: String,
    /// Warehouse API base URL (no trailing slash).
    pub api_url: String,
    /// Execution-profile hint passed with each submission
    /// (`low` / `medium` / `high`).
    pub performance: String,
    /// Interval between status polls for one execution.
    pub poll_interval: Duration,
    /// Per-query wall-clock budget for polling.
    pub query_timeout: Duration,
    /// Delay between sequential query submissions (rate-limit headroom).
    pub submit_delay: Duration,
    /// Maximum age of a previous snapshot below which a run is skipped.
    pub freshness: Duration,
}

impl EngineConfig {
    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `WAREHOUSE_API_KEY` -- warehouse API credential
    ///
    /// Optional variables:
    /// - `WAREHOUSE_API_URL` -- API base URL (default `https://api.warehouse.example/api/v1`)
    /// - `EXECUTION_PROFILE` -- execution-profile hint (default `medium`)
    /// - `POLL_INTERVAL_MS` -- poll interval in milliseconds (default 3000)
    /// - `QUERY_TIMEOUT_MS` -- per-query poll budget in milliseconds (default 90000)
    /// - `SUBMIT_DELAY_MS` -- inter-submission delay in milliseconds (default 300)
    /// - `FRESHNESS_HOURS` -- snapshot freshness threshold in hours (default 24)
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if the credential is missing or a
    /// numeric variable fails to parse.
    pub fn from_env() -> Result<Self, EngineError> {
        let api_key = std::env::var("WAREHOUSE_API_KEY").map_err(|e| {
            EngineError::Config(format!("missing required env var WAREHOUSE_API_KEY: {e}"))
        })?;

        let api_url =
            std::env::var("WAREHOUSE_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_owned());
        let performance =
            std::env::var("EXECUTION_PROFILE").unwrap_or_else(|_| "medium".to_owned());

        let poll_interval_ms = env_u64("POLL_INTERVAL_MS", 3000)?;
        let query_timeout_ms = env_u64("QUERY_TIMEOUT_MS", 90_000)?;
        let submit_delay_ms = env_u64("SUBMIT_DELAY_MS", 300)?;
        let freshness_hours = env_u64("FRESHNESS_HOURS", 24)?;

        Ok(Self {
            api_key,
            api_url,
            performance,
            poll_interval: Duration::from_millis(poll_interval_ms),
            query_timeout: Duration::from_millis(query_timeout_ms),
            submit_delay: Duration::from_millis(submit_delay_ms),
            freshness: Duration::from_secs(freshness_hours.saturating_mul(3600)),
        })
    }
}

/// Read an optional numeric environment variable with a default.
fn env_u64(name: &str, default: u64) -> Result<u64, EngineError> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| EngineError::Config(format!("invalid {name}: {e}"))),
        Err(_) => Ok(default),
    }
}
