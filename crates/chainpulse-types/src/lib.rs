//! Shared type definitions for the chainpulse metrics pipeline.
//!
//! This crate is the single source of truth for the published data model:
//! the [`Snapshot`] document served to the dashboard and written to disk,
//! and the per-query [`QueryOutcome`] values it contains.
//!
//! # Modules
//!
//! - [`snapshot`] -- The snapshot document and per-query outcome types

pub mod snapshot;

pub use snapshot::{QueryOutcome, ResultRow, Snapshot};
