//! The query registry: an immutable name->SQL mapping.
//!
//! A [`QuerySet`] is constructed once at startup and passed into the
//! pipeline by value -- the engine is agnostic to query content and never
//! reads query definitions from ambient state. Names are validated for
//! uniqueness at build time and SQL text is normalized (newlines and runs
//! of whitespace collapsed) before submission, since the warehouse API
//! expects single-line statements.

use std::collections::BTreeMap;

use crate::error::EngineError;

/// An immutable, validated mapping from query name to SQL text.
///
/// Iteration order is deterministic (sorted by name).
#[derive(Debug, Clone, Default)]
pub struct QuerySet {
    queries: BTreeMap<String, String>,
}

impl QuerySet {
    /// Start building a query set.
    pub fn builder() -> QuerySetBuilder {
        QuerySetBuilder::default()
    }

    /// Iterate over `(name, sql)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.queries
            .iter()
            .map(|(name, sql)| (name.as_str(), sql.as_str()))
    }

    /// Iterate over registered query names in order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.queries.keys().map(String::as_str)
    }

    /// Number of registered queries.
    pub fn len(&self) -> usize {
        self.queries.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.queries.is_empty()
    }
}

/// Builder for [`QuerySet`] with duplicate-name detection.
#[derive(Debug, Default)]
pub struct QuerySetBuilder {
    entries: Vec<(String, String)>,
}

impl QuerySetBuilder {
    /// Add a named query. SQL is normalized on `build`.
    #[must_use]
    pub fn query(mut self, name: impl Into<String>, sql: impl Into<String>) -> Self {
        self.entries.push((name.into(), sql.into()));
        self
    }

    /// Validate and freeze the set.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Config`] if two queries share a name.
    pub fn build(self) -> Result<QuerySet, EngineError> {
        let mut queries = BTreeMap::new();
        for (name, sql) in self.entries {
            if queries.contains_key(&name) {
                return Err(EngineError::Config(format!("duplicate query name: {name}")));
            }
            queries.insert(name, normalize_sql(&sql));
        }
        Ok(QuerySet { queries })
    }
}

/// Collapse newlines and runs of whitespace into single spaces.
fn normalize_sql(sql: &str) -> String {
    sql.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The stock dashboard query set: token activity summaries, daily transfer
/// series, top holders, and DEX volume, per chain.
///
/// The engine itself does not interpret these; callers may substitute any
/// [`QuerySet`]. Kept small here -- the analytical semantics live with the
/// warehouse.
pub fn standard_set() -> Result<QuerySet, EngineError> {
    QuerySet::builder()
        .query(
            "evm_summary",
            r"
            SELECT token, chain, holders, active_7d, transfers_7d, volume_7d,
                   active_30d, transfers_30d, volume_30d
            FROM metrics.token_activity
            WHERE chain IN ('ethereum', 'ink', 'xlayer', 'arbitrum')
            ",
        )
        .query(
            "evm_daily",
            r"
            SELECT token, chain, DATE_TRUNC('day', block_time) AS day,
                   COUNT(*) AS transfers,
                   COUNT(DISTINCT sender) AS unique_senders,
                   SUM(amount) / 1e6 AS volume_m
            FROM metrics.transfers
            WHERE chain != 'solana' AND block_time > NOW() - INTERVAL '90' DAY
            GROUP BY 1, 2, 3 ORDER BY 1, 3
            ",
        )
        .query(
            "evm_whales",
            r"
            SELECT token, chain, address, balance, pct, rank
            FROM metrics.top_holders
            WHERE chain != 'solana' AND rank <= 15
            ORDER BY token, chain, rank
            ",
        )
        .query(
            "sol_summary",
            r"
            SELECT token, 'solana' AS chain, active_7d, transfers_7d, volume_7d,
                   active_30d, transfers_30d, volume_30d
            FROM metrics.token_activity
            WHERE chain = 'solana'
            ",
        )
        .query(
            "sol_daily",
            r"
            SELECT token, 'solana' AS chain, DATE_TRUNC('day', block_time) AS day,
                   COUNT(*) AS transfers,
                   COUNT(DISTINCT sender) AS unique_senders,
                   SUM(amount) / 1e6 AS volume_m
            FROM metrics.transfers
            WHERE chain = 'solana' AND block_time > NOW() - INTERVAL '90' DAY
            GROUP BY 1, 2, 3 ORDER BY 1, 3
            ",
        )
        .query(
            "dex_volume",
            r"
            SELECT token, project, token_pair,
                   SUM(amount_usd) AS volume_30d, COUNT(*) AS trades
            FROM dex.trades
            WHERE block_time > NOW() - INTERVAL '30' DAY
            GROUP BY 1, 2, 3 ORDER BY volume_30d DESC LIMIT 30
            ",
        )
        .build()
}
