//! Query orchestration and snapshot merge engine.
//!
//! The engine fetches batches of named analytical query results from an
//! asynchronous warehouse API (submit -> poll -> retrieve rows) and merges
//! them with the previously published snapshot so that transient failures
//! never regress previously-available data.
//!
//! # Architecture
//!
//! ```text
//! QuerySet --> submit (sequential) --> poll (concurrent) --> merge --> store
//!                                                  ^
//!                  freshness gate short-circuits --+
//! ```
//!
//! Every per-query failure (submission error, quota, timeout, remote
//! failure) is contained at the query boundary and resolved by the merge
//! fallback policy. Only configuration errors abort a run.
//!
//! # Modules
//!
//! - [`registry`] -- Immutable name->SQL query set with uniqueness checks
//! - [`client`] -- Warehouse HTTP client (submit + result polling)
//! - [`pipeline`] -- The submit/poll/merge refresh cycle
//! - [`freshness`] -- Snapshot age gate that skips redundant runs
//! - [`merge`] -- No-regression snapshot merging
//! - [`store`] -- Snapshot persistence behind a small trait
//! - [`config`] -- Environment-variable configuration
//! - [`error`] -- Typed engine errors

pub mod client;
pub mod config;
pub mod error;
pub mod freshness;
pub mod merge;
pub mod pipeline;
pub mod registry;
pub mod store;

pub use client::WarehouseClient;
pub use config::EngineConfig;
pub use error::EngineError;
pub use merge::RunOutcome;
pub use pipeline::{Pipeline, refresh};
pub use registry::QuerySet;
pub use store::{FileStore, MemoryStore, SnapshotStore};
