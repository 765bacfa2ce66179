//! Integration tests for the metrics API endpoints.
//!
//! Handlers are exercised through the built router via
//! `tower::ServiceExt::oneshot`; the warehouse and the deploy hook are
//! stub Axum servers on ephemeral local ports.

#![allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use axum::Json;
use axum::Router;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use chainpulse_engine::{EngineConfig, MemoryStore, Pipeline, QuerySet};
use chainpulse_server::router::build_router;
use chainpulse_server::state::AppState;
use chainpulse_types::{QueryOutcome, Snapshot};
use chrono::{TimeDelta, Utc};
use serde_json::{Value, json};
use tower::ServiceExt;

#[derive(Default)]
struct StubState {
    hits: AtomicUsize,
}

async fn stub_submit(State(state): State<Arc<StubState>>, Json(body): Json<Value>) -> Json<Value> {
    state.hits.fetch_add(1, Ordering::SeqCst);
    let sql = body.get("sql").and_then(Value::as_str).unwrap_or_default();
    Json(json!({"execution_id": sql}))
}

async fn stub_results(
    State(state): State<Arc<StubState>>,
    Path(id): Path<String>,
) -> Json<Value> {
    state.hits.fetch_add(1, Ordering::SeqCst);
    if let Some(n) = id.strip_prefix("rows:") {
        let count: usize = n.parse().unwrap_or(0);
        let rows: Vec<Value> = (0..count).map(|i| json!({"x": i})).collect();
        return Json(json!({
            "state": "QUERY_STATE_COMPLETED",
            "result": {"rows": rows},
        }));
    }
    Json(json!({"state": "QUERY_STATE_FAILED", "error": "exploded"}))
}

async fn stub_hook(State(state): State<Arc<StubState>>) -> StatusCode {
    state.hits.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}

async fn serve_on_ephemeral_port(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.ok();
    });
    format!("http://{addr}")
}

async fn start_stub_warehouse() -> (String, Arc<StubState>) {
    let state = Arc::new(StubState::default());
    let router = Router::new()
        .route("/sql/execute", post(stub_submit))
        .route("/execution/{id}/results", get(stub_results))
        .with_state(Arc::clone(&state));
    (serve_on_ephemeral_port(router).await, state)
}

async fn start_stub_hook() -> (String, Arc<StubState>) {
    let state = Arc::new(StubState::default());
    let router = Router::new()
        .route("/hook", post(stub_hook))
        .with_state(Arc::clone(&state));
    let base = serve_on_ephemeral_port(router).await;
    (format!("{base}/hook"), state)
}

fn pipeline_for(base_url: &str, entries: &[(&str, &str)]) -> Pipeline {
    let config = EngineConfig {
        api_key: "test-key".to_owned(),
        api_url: base_url.to_owned(),
        performance: "medium".to_owned(),
        poll_interval: Duration::from_millis(25),
        query_timeout: Duration::from_secs(5),
        submit_delay: Duration::from_millis(5),
        freshness: Duration::from_secs(24 * 3600),
    };
    let mut builder = QuerySet::builder();
    for (name, directive) in entries {
        builder = builder.query(*name, *directive);
    }
    Pipeline::new(&config, builder.build().unwrap())
}

fn test_state(pipeline: Option<Pipeline>, store: MemoryStore) -> Arc<AppState> {
    Arc::new(AppState {
        pipeline,
        store,
        freshness: Duration::from_secs(24 * 3600),
        cache_seconds: 3600,
        redeploy_secret: Some("hunter2".to_owned()),
        deploy_hook_url: None,
        http: reqwest::Client::new(),
    })
}

async fn body_to_json(body: Body) -> Value {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

// =========================================================================
// GET /api/metrics
// =========================================================================

#[tokio::test]
async fn metrics_returns_snapshot_with_cache_headers() {
    let (warehouse, _stub) = start_stub_warehouse().await;
    let state = test_state(
        Some(pipeline_for(&warehouse, &[("evm_summary", "rows:2")])),
        MemoryStore::new(),
    );
    let router = build_router(state);

    let response = router
        .oneshot(Request::get("/api/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let cache_control = response
        .headers()
        .get("cache-control")
        .unwrap()
        .to_str()
        .unwrap();
    assert_eq!(cache_control, "s-maxage=3600, stale-while-revalidate=7200");

    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["data"]["evm_summary"].as_array().map(Vec::len), Some(2));
    assert!(body["updated"].is_string());
}

#[tokio::test]
async fn metrics_partial_failure_is_still_ok() {
    let (warehouse, _stub) = start_stub_warehouse().await;
    let state = test_state(
        Some(pipeline_for(
            &warehouse,
            &[("good", "rows:1"), ("bad", "fail")],
        )),
        MemoryStore::new(),
    );
    let router = build_router(state);

    let response = router
        .oneshot(Request::get("/api/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await;
    assert!(body["data"]["good"].is_array());
    assert!(body["data"]["bad"]["error"].is_string());
}

#[tokio::test]
async fn metrics_without_credential_is_500() {
    let state = test_state(None, MemoryStore::new());
    let router = build_router(state);

    let response = router
        .oneshot(Request::get("/api/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_to_json(response.into_body()).await;
    assert!(
        body["error"]
            .as_str()
            .unwrap_or_default()
            .contains("credential")
    );
}

#[tokio::test]
async fn metrics_served_from_fresh_cache_without_network() {
    let (warehouse, stub) = start_stub_warehouse().await;

    let mut data = BTreeMap::new();
    data.insert("evm_summary".to_owned(), QueryOutcome::Rows(Vec::new()));
    let cached = Snapshot {
        updated: Utc::now() - TimeDelta::hours(1),
        data,
    };

    let state = test_state(
        Some(pipeline_for(&warehouse, &[("evm_summary", "rows:2")])),
        MemoryStore::with_snapshot(cached.clone()),
    );
    let router = build_router(state);

    let response = router
        .oneshot(Request::get("/api/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body, serde_json::to_value(&cached).unwrap());
    assert_eq!(stub.hits.load(Ordering::SeqCst), 0);
}

// =========================================================================
// POST /api/redeploy
// =========================================================================

#[tokio::test]
async fn redeploy_rejects_missing_and_wrong_bearer() {
    let state = test_state(None, MemoryStore::new());
    let router = build_router(state);

    let response = router
        .clone()
        .oneshot(Request::post("/api/redeploy").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = router
        .oneshot(
            Request::post("/api/redeploy")
                .header("authorization", "Bearer wrong")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn redeploy_without_secret_configured_is_500() {
    let state = AppState {
        pipeline: None,
        store: MemoryStore::new(),
        freshness: Duration::from_secs(24 * 3600),
        cache_seconds: 3600,
        redeploy_secret: None,
        deploy_hook_url: None,
        http: reqwest::Client::new(),
    };
    let router = build_router(Arc::new(state));

    let response = router
        .oneshot(
            Request::post("/api/redeploy")
                .header("authorization", "Bearer anything")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn redeploy_triggers_hook_with_correct_bearer() {
    let (hook_url, hook) = start_stub_hook().await;

    let state = Arc::new(AppState {
        pipeline: None,
        store: MemoryStore::new(),
        freshness: Duration::from_secs(24 * 3600),
        cache_seconds: 3600,
        redeploy_secret: Some("hunter2".to_owned()),
        deploy_hook_url: Some(hook_url),
        http: reqwest::Client::new(),
    });
    let router = build_router(state);

    let response = router
        .oneshot(
            Request::post("/api/redeploy")
                .header("authorization", "Bearer hunter2")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_to_json(response.into_body()).await;
    assert_eq!(body["ok"], json!(true));
    assert_eq!(body["status"], json!(200));
    assert_eq!(hook.hits.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn nonexistent_route_returns_404() {
    let state = test_state(None, MemoryStore::new());
    let router = build_router(state);

    let response = router
        .oneshot(Request::get("/api/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
