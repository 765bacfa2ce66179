//! The snapshot document and per-query outcome types.
//!
//! A [`Snapshot`] is the single unit of persistence and publication: a
//! timestamp plus one [`QueryOutcome`] per registered query name. The wire
//! format is fixed so that previously published documents remain readable:
//!
//! ```json
//! {
//!   "updated": "2026-08-30T12:00:00Z",
//!   "data": {
//!     "evm_summary": [ { "token": "USDG", "holders": 1234 } ],
//!     "dex_volume": { "error": "query timed out" }
//!   }
//! }
//! ```

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};

/// A single result row: an ordered mapping of column name to scalar value.
///
/// Row shape is opaque to the engine; columns arrive in provider order and
/// are passed through untouched.
pub type ResultRow = serde_json::Map<String, serde_json::Value>;

/// The outcome recorded for one query name in a snapshot.
///
/// Serialized untagged: a `Rows` outcome is a plain JSON array of row
/// objects, a `Failure` is an `{"error": ...}` object. A name never holds
/// both.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
pub enum QueryOutcome {
    /// The query completed; the ordered row sequence it returned.
    Rows(Vec<ResultRow>),
    /// The query failed and no prior rows were available to fall back on.
    Failure {
        /// Human-readable provider or engine error message.
        error: String,
    },
}

impl QueryOutcome {
    /// Build a failure outcome from any displayable error.
    pub fn failure(message: impl Into<String>) -> Self {
        Self::Failure {
            error: message.into(),
        }
    }

    /// Whether this outcome carries rows.
    pub const fn is_rows(&self) -> bool {
        matches!(self, Self::Rows(_))
    }

    /// The row sequence, when this outcome completed successfully.
    pub fn rows(&self) -> Option<&[ResultRow]> {
        match self {
            Self::Rows(rows) => Some(rows),
            Self::Failure { .. } => None,
        }
    }
}

/// A published metrics snapshot.
///
/// Invariants maintained by the engine:
/// - every registered query name appears exactly once in `data`;
/// - `updated` only advances when a run produced at least one genuinely
///   fresh `Rows` outcome (fallback reuse does not count).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Snapshot {
    /// When the data was last genuinely refreshed (ISO-8601).
    pub updated: DateTime<Utc>,
    /// Per-query outcomes keyed by query name.
    pub data: BTreeMap<String, QueryOutcome>,
}

impl Snapshot {
    /// Age of this snapshot relative to `now`.
    ///
    /// Negative when `updated` lies in the future (clock skew); callers
    /// treat that as fresh.
    pub fn age(&self, now: DateTime<Utc>) -> TimeDelta {
        now.signed_duration_since(self.updated)
    }

    /// Number of query names whose outcome carries rows.
    pub fn succeeded(&self) -> usize {
        self.data.values().filter(|o| o.is_rows()).count()
    }

    /// Number of query names whose outcome is an error descriptor.
    pub fn failed(&self) -> usize {
        self.data.values().filter(|o| !o.is_rows()).count()
    }
}
