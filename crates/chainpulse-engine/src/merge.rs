//! Snapshot merging with the no-regression fallback policy.
//!
//! The central resilience property of the system lives here: a query that
//! failed this run reuses its previous `Rows` value when one exists, so a
//! bad run never deletes previously-successful data. The `updated`
//! timestamp only advances when at least one query produced genuinely
//! fresh rows -- fallback reuse does not count.
//!
//! Merging is commutative over per-query outcomes; no cross-query
//! ordering is assumed.

use std::collections::BTreeMap;

use chainpulse_types::{QueryOutcome, ResultRow, Snapshot};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::error::EngineError;

/// Per-query result of the current run, before merging.
///
/// An explicit tagged type instead of chained error handling: each query
/// resolves to exactly one of these inside its own isolation boundary, and
/// the merger is the single join point.
#[derive(Debug)]
pub enum RunOutcome {
    /// This run produced fresh rows for the query.
    Fresh(Vec<ResultRow>),
    /// This run failed for the query; the merger decides the fallback.
    Failed(EngineError),
}

/// Merge this run's per-query outcomes with the previous snapshot.
///
/// Policy per query name:
/// - `Fresh` rows win unconditionally.
/// - `Failed` reuses the previous `Rows` value when one exists.
/// - `Failed` with no previous rows surfaces as an `{"error": ...}` value.
///
/// `updated` is set to `now` when any outcome was `Fresh` (or when there
/// was no previous snapshot at all); otherwise the previous timestamp is
/// carried over unchanged. In particular a run where every query fell back
/// to stale data does not advance the timestamp.
pub fn merge(
    previous: Option<&Snapshot>,
    outcomes: BTreeMap<String, RunOutcome>,
    now: DateTime<Utc>,
) -> Snapshot {
    let mut data = BTreeMap::new();
    let mut fresh_count = 0usize;

    for (name, outcome) in outcomes {
        match outcome {
            RunOutcome::Fresh(rows) => {
                fresh_count = fresh_count.saturating_add(1);
                data.insert(name, QueryOutcome::Rows(rows));
            }
            RunOutcome::Failed(err) => {
                if err.is_quota() {
                    warn!(query = %name, quota = true, error = %err, "query hit provider quota");
                } else {
                    warn!(query = %name, error = %err, "query failed");
                }

                let fallback = previous.and_then(|p| p.data.get(&name)).and_then(|o| {
                    o.rows().map(<[ResultRow]>::to_vec)
                });
                match fallback {
                    Some(rows) => {
                        info!(query = %name, "preserving previous rows");
                        data.insert(name, QueryOutcome::Rows(rows));
                    }
                    None => {
                        data.insert(name, QueryOutcome::failure(err.to_string()));
                    }
                }
            }
        }
    }

    let updated = if fresh_count > 0 {
        now
    } else {
        previous.map_or(now, |p| p.updated)
    };

    info!(
        fresh = fresh_count,
        total = data.len(),
        timestamp_advanced = fresh_count > 0 || previous.is_none(),
        "snapshot merged"
    );

    Snapshot { updated, data }
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use std::time::Duration;

    use chrono::TimeDelta;

    use super::*;

    fn rows(marker: i64) -> Vec<ResultRow> {
        let mut row = ResultRow::new();
        row.insert("x".to_owned(), serde_json::json!(marker));
        vec![row]
    }

    fn prev_snapshot(updated: DateTime<Utc>, entries: &[(&str, QueryOutcome)]) -> Snapshot {
        let mut data = BTreeMap::new();
        for (name, outcome) in entries {
            data.insert((*name).to_owned(), outcome.clone());
        }
        Snapshot { updated, data }
    }

    #[test]
    fn first_run_with_mixed_outcomes() {
        // Registry {A, B}, no previous snapshot, A completes with rows,
        // B fails at submission.
        let now = Utc::now();
        let mut outcomes = BTreeMap::new();
        outcomes.insert("a".to_owned(), RunOutcome::Fresh(rows(1)));
        outcomes.insert(
            "b".to_owned(),
            RunOutcome::Failed(EngineError::Submission("bad sql".to_owned())),
        );

        let merged = merge(None, outcomes, now);

        assert_eq!(merged.updated, now);
        assert_eq!(merged.data.get("a"), Some(&QueryOutcome::Rows(rows(1))));
        assert_eq!(
            merged.data.get("b"),
            Some(&QueryOutcome::failure("submission error: bad sql"))
        );
    }

    #[test]
    fn failure_falls_back_to_previous_rows() {
        let then = Utc::now() - TimeDelta::hours(30);
        let previous = prev_snapshot(then, &[("b", QueryOutcome::Rows(rows(1)))]);

        let mut outcomes = BTreeMap::new();
        outcomes.insert(
            "b".to_owned(),
            RunOutcome::Failed(EngineError::QuotaExceeded("datapoint limit".to_owned())),
        );

        let merged = merge(Some(&previous), outcomes, Utc::now());

        // Previous rows preserved unchanged, timestamp not advanced.
        assert_eq!(merged.data.get("b"), Some(&QueryOutcome::Rows(rows(1))));
        assert_eq!(merged.updated, then);
    }

    #[test]
    fn fresh_rows_win_over_previous_rows() {
        let then = Utc::now() - TimeDelta::hours(30);
        let now = Utc::now();
        let previous = prev_snapshot(then, &[("a", QueryOutcome::Rows(rows(1)))]);

        let mut outcomes = BTreeMap::new();
        outcomes.insert("a".to_owned(), RunOutcome::Fresh(rows(2)));

        let merged = merge(Some(&previous), outcomes, now);

        assert_eq!(merged.data.get("a"), Some(&QueryOutcome::Rows(rows(2))));
        assert_eq!(merged.updated, now);
    }

    #[test]
    fn one_fresh_query_advances_timestamp_despite_fallbacks() {
        let then = Utc::now() - TimeDelta::hours(30);
        let now = Utc::now();
        let previous = prev_snapshot(then, &[("b", QueryOutcome::Rows(rows(1)))]);

        let mut outcomes = BTreeMap::new();
        outcomes.insert("a".to_owned(), RunOutcome::Fresh(rows(9)));
        outcomes.insert(
            "b".to_owned(),
            RunOutcome::Failed(EngineError::Timeout(Duration::from_secs(90))),
        );

        let merged = merge(Some(&previous), outcomes, now);

        assert_eq!(merged.updated, now);
        assert_eq!(merged.data.get("b"), Some(&QueryOutcome::Rows(rows(1))));
    }

    #[test]
    fn failure_without_fallback_surfaces_error() {
        let then = Utc::now() - TimeDelta::hours(30);
        // Previous outcome for "b" was itself an error, not rows.
        let previous = prev_snapshot(then, &[("b", QueryOutcome::failure("old error"))]);

        let mut outcomes = BTreeMap::new();
        outcomes.insert(
            "b".to_owned(),
            RunOutcome::Failed(EngineError::RemoteFailed("new error".to_owned())),
        );

        let merged = merge(Some(&previous), outcomes, Utc::now());

        assert_eq!(
            merged.data.get("b"),
            Some(&QueryOutcome::failure("query failed: new error"))
        );
        assert_eq!(merged.updated, then);
    }

    #[test]
    fn timestamp_never_goes_backward() {
        let then = Utc::now() - TimeDelta::hours(30);
        let now = Utc::now();
        let previous = prev_snapshot(then, &[("a", QueryOutcome::Rows(rows(1)))]);

        // All-failure run carries the old timestamp forward.
        let mut outcomes = BTreeMap::new();
        outcomes.insert(
            "a".to_owned(),
            RunOutcome::Failed(EngineError::Http("down".to_owned())),
        );
        let merged = merge(Some(&previous), outcomes, now);
        assert!(merged.updated >= then);
        assert_eq!(merged.updated, then);

        // A fresh run strictly advances it.
        let mut outcomes = BTreeMap::new();
        outcomes.insert("a".to_owned(), RunOutcome::Fresh(rows(2)));
        let merged = merge(Some(&previous), outcomes, now);
        assert!(merged.updated > then);
    }

    #[test]
    fn every_outcome_name_appears_exactly_once() {
        let mut outcomes = BTreeMap::new();
        outcomes.insert("a".to_owned(), RunOutcome::Fresh(rows(1)));
        outcomes.insert(
            "b".to_owned(),
            RunOutcome::Failed(EngineError::Submission("x".to_owned())),
        );
        outcomes.insert(
            "c".to_owned(),
            RunOutcome::Failed(EngineError::Timeout(Duration::from_secs(1))),
        );

        let merged = merge(None, outcomes, Utc::now());
        let names: Vec<&str> = merged.data.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
