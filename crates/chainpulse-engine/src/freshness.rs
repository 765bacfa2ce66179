//! The freshness gate: skip a run when the previous snapshot is recent.
//!
//! This is quota protection, not a correctness requirement -- a fresh
//! snapshot short-circuits the whole pipeline before any network call and
//! is republished verbatim.

use std::time::Duration;

use chainpulse_types::Snapshot;
use chrono::{DateTime, TimeDelta, Utc};

/// Whether `snapshot` is younger than `threshold` as of `now`.
///
/// A snapshot with a future `updated` timestamp (clock skew between the
/// writer and this process) counts as fresh.
pub fn is_fresh(snapshot: &Snapshot, threshold: Duration, now: DateTime<Utc>) -> bool {
    let threshold = TimeDelta::from_std(threshold).unwrap_or(TimeDelta::MAX);
    snapshot.age(now) < threshold
}

#[cfg(test)]
#[allow(clippy::arithmetic_side_effects)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn snapshot_aged(hours: i64, now: DateTime<Utc>) -> Snapshot {
        Snapshot {
            updated: now - TimeDelta::hours(hours),
            data: BTreeMap::new(),
        }
    }

    #[test]
    fn recent_snapshot_is_fresh() {
        let now = Utc::now();
        let snapshot = snapshot_aged(2, now);
        assert!(is_fresh(&snapshot, Duration::from_secs(24 * 3600), now));
    }

    #[test]
    fn old_snapshot_is_stale() {
        let now = Utc::now();
        let snapshot = snapshot_aged(25, now);
        assert!(!is_fresh(&snapshot, Duration::from_secs(24 * 3600), now));
    }

    #[test]
    fn exact_threshold_is_stale() {
        let now = Utc::now();
        let snapshot = snapshot_aged(24, now);
        assert!(!is_fresh(&snapshot, Duration::from_secs(24 * 3600), now));
    }

    #[test]
    fn future_timestamp_is_fresh() {
        let now = Utc::now();
        let snapshot = snapshot_aged(-1, now);
        assert!(is_fresh(&snapshot, Duration::from_secs(24 * 3600), now));
    }
}
