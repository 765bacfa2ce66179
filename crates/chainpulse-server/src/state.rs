//! Shared application state for the metrics API server.
//!
//! [`AppState`] holds the configured fetch pipeline and the in-process
//! snapshot cache. The pipeline is `None` when the warehouse credential is
//! absent at startup; the metrics handler then reports the fatal
//! configuration error per request instead of the process refusing to
//! boot, matching the serverless deployment this replaces.

use std::time::Duration;

use chainpulse_engine::registry;
use chainpulse_engine::{EngineConfig, MemoryStore, Pipeline};
use tracing::{info, warn};

/// Default fresh window for the `Cache-Control: s-maxage` directive, in
/// seconds. The stale-while-revalidate window is always double this.
const DEFAULT_CACHE_SECONDS: u64 = 3600;

/// Fallback freshness threshold when no engine config is available.
const DEFAULT_FRESHNESS: Duration = Duration::from_secs(24 * 3600);

/// Shared state for the Axum application, injected via `State`.
pub struct AppState {
    /// The configured fetch pipeline, absent without a credential.
    pub pipeline: Option<Pipeline>,
    /// In-process snapshot cache consulted by the freshness gate.
    pub store: MemoryStore,
    /// Snapshot freshness threshold.
    pub freshness: Duration,
    /// Fresh window for the edge-cache header.
    pub cache_seconds: u64,
    /// Bearer secret required by the redeploy webhook.
    pub redeploy_secret: Option<String>,
    /// Deploy hook URL the webhook posts to.
    pub deploy_hook_url: Option<String>,
    /// HTTP client for the deploy hook call.
    pub http: reqwest::Client,
}

impl AppState {
    /// Build application state from the environment.
    ///
    /// Engine configuration failures are downgraded to a warning here so
    /// the server still serves the webhook (and a useful 500 on
    /// `/api/metrics`) without the credential.
    pub fn from_env() -> Self {
        let (pipeline, freshness) = match EngineConfig::from_env() {
            Ok(config) => {
                let freshness = config.freshness;
                match registry::standard_set() {
                    Ok(queries) => {
                        info!(queries = queries.len(), "fetch pipeline configured");
                        (Some(Pipeline::new(&config, queries)), freshness)
                    }
                    Err(e) => {
                        warn!(error = %e, "query set invalid; /api/metrics disabled");
                        (None, freshness)
                    }
                }
            }
            Err(e) => {
                warn!(error = %e, "warehouse credential missing; /api/metrics will return 500");
                (None, DEFAULT_FRESHNESS)
            }
        };

        let cache_seconds = std::env::var("CACHE_SECONDS")
            .ok()
            .and_then(|raw| raw.parse().ok())
            .unwrap_or(DEFAULT_CACHE_SECONDS);

        Self {
            pipeline,
            store: MemoryStore::new(),
            freshness,
            cache_seconds,
            redeploy_secret: std::env::var("REDEPLOY_SECRET").ok(),
            deploy_hook_url: std::env::var("DEPLOY_HOOK_URL").ok(),
            http: reqwest::Client::new(),
        }
    }
}
