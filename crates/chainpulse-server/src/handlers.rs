//! Endpoint handlers for the metrics API server.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api/metrics` | Run the fetch pipeline, return the snapshot |
//! | `POST` | `/api/redeploy` | Trigger a redeploy via the deploy hook |

use std::sync::Arc;

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, header};
use axum::response::{IntoResponse, Response};
use chainpulse_engine::refresh;

use crate::error::ServerError;
use crate::state::AppState;

/// Run the fetch pipeline and return the merged snapshot.
///
/// A snapshot younger than the freshness threshold is served from the
/// in-process cache without touching the warehouse. Partial per-query
/// failure is still a `200` -- consumers always see a complete mapping
/// over every registered query name. Only a missing credential (or a
/// run-level engine failure) becomes a `500`.
///
/// The response carries `Cache-Control: s-maxage=<N>,
/// stale-while-revalidate=<2N>` so an edge cache can serve it while
/// revalidating in the background.
pub async fn get_metrics(State(state): State<Arc<AppState>>) -> Result<Response, ServerError> {
    let pipeline = state.pipeline.as_ref().ok_or_else(|| {
        ServerError::Config("missing warehouse API credential".to_owned())
    })?;

    let snapshot = refresh(pipeline, &state.store, state.freshness).await?;

    let cache_control = format!(
        "s-maxage={}, stale-while-revalidate={}",
        state.cache_seconds,
        state.cache_seconds.saturating_mul(2),
    );

    Ok(([(header::CACHE_CONTROL, cache_control)], Json(snapshot)).into_response())
}

/// Trigger a redeploy by posting to the configured deploy hook.
///
/// Requires `Authorization: Bearer <REDEPLOY_SECRET>`. Independent of the
/// fetch engine; reports the hook's status without interpreting it.
pub async fn redeploy(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ServerError> {
    let secret = state
        .redeploy_secret
        .as_deref()
        .ok_or_else(|| ServerError::Config("REDEPLOY_SECRET not configured".to_owned()))?;

    let provided = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "));
    if provided != Some(secret) {
        return Err(ServerError::Unauthorized);
    }

    let hook = state
        .deploy_hook_url
        .as_deref()
        .ok_or_else(|| ServerError::Config("DEPLOY_HOOK_URL not configured".to_owned()))?;

    let response = state
        .http
        .post(hook)
        .send()
        .await
        .map_err(|e| ServerError::Upstream(format!("deploy hook request failed: {e}")))?;

    Ok(Json(serde_json::json!({
        "ok": response.status().is_success(),
        "status": response.status().as_u16(),
    })))
}
