//! One-shot metrics fetcher for static builds.
//!
//! Runs the fetch pipeline once and persists the merged snapshot into
//! each configured output directory, then exits. Intended to run as a
//! pre-build step: a missing credential is a skip, not a failure, so
//! local builds without warehouse access still succeed against whatever
//! snapshot is already committed.

use anyhow::Context;
use chainpulse_engine::config::EngineConfig;
use chainpulse_engine::registry::standard_set;
use chainpulse_engine::{FileStore, Pipeline, refresh};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Default output directories, relative to the working directory.
const DEFAULT_OUTPUT_DIRS: &str = "dist,static";

/// Application entry point.
///
/// # Errors
///
/// Returns an error on configuration problems other than a missing
/// credential, or when the snapshot cannot be persisted.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    if std::env::var("WAREHOUSE_API_KEY").is_err() {
        info!("WAREHOUSE_API_KEY not set, skipping metrics fetch");
        return Ok(());
    }

    let config = EngineConfig::from_env().context("loading engine configuration")?;

    let dirs: Vec<String> = std::env::var("OUTPUT_DIRS")
        .unwrap_or_else(|_| DEFAULT_OUTPUT_DIRS.to_owned())
        .split(',')
        .map(str::trim)
        .filter(|dir| !dir.is_empty())
        .map(str::to_owned)
        .collect();
    let store = FileStore::new(dirs.clone());

    let queries = standard_set().context("building query set")?;
    info!(queries = queries.len(), dirs = ?dirs, "starting metrics fetch");

    let pipeline = Pipeline::new(&config, queries);
    let snapshot = refresh(&pipeline, &store, config.freshness)
        .await
        .context("running metrics fetch")?;

    info!(
        succeeded = snapshot.succeeded(),
        failed = snapshot.failed(),
        updated = %snapshot.updated,
        "metrics fetch complete"
    );
    Ok(())
}
