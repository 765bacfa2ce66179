//! Metrics API server for the chainpulse dashboard.
//!
//! Two HTTP surfaces share one Axum router:
//!
//! - `GET /api/metrics` runs the fetch pipeline (behind the freshness
//!   gate) and returns the merged snapshot with edge-cache headers.
//!   Partial per-query failure is still a `200`; only a missing warehouse
//!   credential yields a `500`.
//! - `POST /api/redeploy` is an independent deploy-hook webhook gated by
//!   a bearer secret. It is a collaborator of the dashboard, not part of
//!   the fetch engine.
//!
//! # Modules
//!
//! - [`state`] -- Shared application state (pipeline + snapshot cache)
//! - [`router`] -- Route table and middleware
//! - [`handlers`] -- Endpoint handlers
//! - [`server`] -- TCP bind and serve lifecycle
//! - [`error`] -- HTTP error mapping

pub mod error;
pub mod handlers;
pub mod router;
pub mod server;
pub mod state;
