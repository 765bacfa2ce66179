//! The fetch pipeline: submit, poll, merge, persist.
//!
//! Orchestrates one refresh cycle:
//! 1. Submit every registered query sequentially with a small delay
//!    (rate-limit headroom; a submission failure never aborts the others)
//! 2. Poll all accepted executions concurrently, each under its own
//!    wall-clock budget
//! 3. Join all per-query outcomes and merge them with the previous
//!    snapshot under the no-regression policy
//!
//! [`refresh`] wraps the cycle with the freshness gate and the snapshot
//! store so both entry points (HTTP handler and fetch binary) share the
//! exact same behavior.

use std::collections::BTreeMap;
use std::time::Duration;

use chainpulse_types::{ResultRow, Snapshot};
use chrono::Utc;
use futures::future::join_all;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::client::{self, ExecutionStatus, WarehouseClient};
use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::freshness::is_fresh;
use crate::merge::{RunOutcome, merge};
use crate::registry::QuerySet;
use crate::store::SnapshotStore;

/// A successfully submitted query awaiting results.
#[derive(Debug)]
struct Handle {
    /// Registered query name.
    name: String,
    /// Provider execution identifier.
    execution_id: String,
}

/// One configured fetch pipeline over a fixed query set.
#[derive(Debug)]
pub struct Pipeline {
    client: WarehouseClient,
    queries: QuerySet,
    poll_interval: Duration,
    query_timeout: Duration,
    submit_delay: Duration,
}

impl Pipeline {
    /// Build a pipeline from configuration and a caller-supplied query set.
    pub fn new(config: &EngineConfig, queries: QuerySet) -> Self {
        Self {
            client: WarehouseClient::new(config),
            queries,
            poll_interval: config.poll_interval,
            query_timeout: config.query_timeout,
            submit_delay: config.submit_delay,
        }
    }

    /// Run one full refresh cycle against the warehouse.
    ///
    /// Always returns a complete snapshot: every registered query name
    /// resolves to either fresh rows, preserved previous rows, or an
    /// explicit error descriptor.
    pub async fn run(&self, previous: Option<&Snapshot>) -> Snapshot {
        info!(queries = self.queries.len(), "starting fetch cycle");

        let (handles, mut outcomes) = self.submit_all().await;
        outcomes.extend(self.poll_all(handles).await);

        merge(previous, outcomes, Utc::now())
    }

    /// Submit every query sequentially, pausing between submissions.
    ///
    /// Returns the accepted execution handles plus per-name outcomes for
    /// queries that already failed at submission (these skip polling).
    async fn submit_all(&self) -> (Vec<Handle>, BTreeMap<String, RunOutcome>) {
        let mut handles = Vec::new();
        let mut failed = BTreeMap::new();

        for (name, sql) in self.queries.iter() {
            match self.client.submit(sql).await {
                Ok(execution_id) => {
                    info!(query = name, execution_id = %execution_id, "submitted");
                    handles.push(Handle {
                        name: name.to_owned(),
                        execution_id,
                    });
                }
                Err(err) => {
                    // Captured per name; the merger applies the fallback.
                    failed.insert(name.to_owned(), RunOutcome::Failed(err));
                }
            }
            tokio::time::sleep(self.submit_delay).await;
        }

        (handles, failed)
    }

    /// Poll all executions concurrently and join their outcomes.
    ///
    /// Each query has an independent timeout budget; one query timing out
    /// or failing never affects another's polling.
    async fn poll_all(&self, handles: Vec<Handle>) -> BTreeMap<String, RunOutcome> {
        join_all(handles.into_iter().map(|h| self.poll_one(h)))
            .await
            .into_iter()
            .collect()
    }

    /// Poll one execution to a terminal state or its budget.
    async fn poll_one(&self, handle: Handle) -> (String, RunOutcome) {
        let polled = timeout(
            self.query_timeout,
            self.poll_until_terminal(&handle.execution_id),
        )
        .await;

        let outcome = match polled {
            Ok(Ok(rows)) => {
                info!(query = %handle.name, rows = rows.len(), "completed");
                RunOutcome::Fresh(rows)
            }
            Ok(Err(err)) => RunOutcome::Failed(err),
            Err(_) => {
                // The remote execution keeps running; we only stop waiting.
                warn!(
                    query = %handle.name,
                    budget_ms = self.query_timeout.as_millis(),
                    "poll budget exceeded"
                );
                RunOutcome::Failed(EngineError::Timeout(self.query_timeout))
            }
        };

        (handle.name, outcome)
    }

    /// Poll at the configured interval until the provider reports a
    /// terminal state.
    async fn poll_until_terminal(
        &self,
        execution_id: &str,
    ) -> Result<Vec<ResultRow>, EngineError> {
        loop {
            match self.client.fetch_status(execution_id).await? {
                ExecutionStatus::Completed(rows) => return Ok(rows),
                ExecutionStatus::Failed(detail) => return Err(client::classify_failure(detail)),
                ExecutionStatus::Pending => tokio::time::sleep(self.poll_interval).await,
            }
        }
    }
}

/// Run one refresh cycle end to end: load the previous snapshot, skip the
/// network entirely when it is still fresh, otherwise submit/poll/merge
/// and persist the result.
///
/// # Errors
///
/// Returns an error only for run-level failures (store I/O); per-query
/// failures are absorbed into the snapshot.
pub async fn refresh<S: SnapshotStore>(
    pipeline: &Pipeline,
    store: &S,
    freshness: Duration,
) -> Result<Snapshot, EngineError> {
    let previous = store.load()?;
    let now = Utc::now();

    if let Some(prev) = previous.as_ref()
        && is_fresh(prev, freshness, now)
    {
        info!(
            age_minutes = prev.age(now).num_minutes(),
            "snapshot is fresh, skipping fetch"
        );
        return Ok(prev.clone());
    }

    let snapshot = pipeline.run(previous.as_ref()).await;
    store.save(&snapshot)?;

    info!(
        succeeded = snapshot.succeeded(),
        failed = snapshot.failed(),
        "refresh complete"
    );
    Ok(snapshot)
}
