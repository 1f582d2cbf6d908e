//! Scenario: the HTTP surface answers health/dashboard/trades/broker-limits/
//! export against a seeded snapshot file and an empty paper-trade store.
//!
//! In-process router testing via `tower::ServiceExt::oneshot`, matching the
//! teacher's daemon test style.

use std::sync::Arc;

use axum::http::{Request, StatusCode};
use b5_config::EngineConfig;
use b5_daemon::{routes, state::AppState};
use http_body_util::BodyExt;
use tower::ServiceExt;

async fn call(router: axum::Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let req = Request::builder().method("GET").uri(uri).body(axum::body::Body::empty()).unwrap();
    let resp = router.oneshot(req).await.expect("oneshot failed");
    let status = resp.status();
    let body = resp.into_body().collect().await.expect("body collect failed").to_bytes();
    let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
    (status, json)
}

fn seed_snapshot(dir: &std::path::Path) -> std::path::PathBuf {
    let path = dir.join("snapshot.json");
    let body = serde_json::json!({
        "day": "2026-03-05",
        "updated_at": "2026-03-05T10:00:00Z",
        "row_count": 1,
        "rows": [{
            "symbol": "NSE|1",
            "tsym": "INFY",
            "exchange": "NSE",
            "ltp": 100.9,
            "volume": 500.0,
            "first_1m_close": 100.0,
            "first_5m_close": 100.0,
            "first_15m_close": 100.0,
            "fetch_done": true,
            "updated_at": "2026-03-05T10:00:00Z"
        }],
        "status": {"ok": true}
    });
    std::fs::write(&path, serde_json::to_vec(&body).unwrap()).unwrap();
    path
}

async fn build_state(dir: &tempfile::TempDir) -> Arc<AppState> {
    let snapshot_path = seed_snapshot(dir.path());
    let mut config = EngineConfig::default();
    config.snapshot_path = snapshot_path;
    config.exports_dir = dir.path().join("exports");

    let pool = b5_db::connect(":memory:").await.unwrap();
    b5_db::migrate(&pool).await.unwrap();

    Arc::new(AppState::new(config, pool, None))
}

#[tokio::test]
async fn health_reports_trade_mode_and_ist_clock() {
    let dir = tempfile::tempdir().unwrap();
    let state = build_state(&dir).await;
    let (status, json) = call(routes::build_router(state), "/api/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["ok"], true);
    assert_eq!(json["trade_mode"], "paper");
    assert_eq!(json["live_enabled"], false);
    assert!(json["ist_time"].is_string());
}

#[tokio::test]
async fn dashboard_returns_rows_for_the_configured_timeframe_and_factor() {
    let dir = tempfile::tempdir().unwrap();
    let state = build_state(&dir).await;
    let (status, json) = call(routes::build_router(state), "/api/dashboard?trigger_only=0").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["snapshot"]["day"], "2026-03-05");
    assert_eq!(json["scan"]["total"], 1);
    assert_eq!(json["rows"][0]["symbol"], "NSE|1");
}

#[tokio::test]
async fn dashboard_q_filters_to_matching_symbols() {
    let dir = tempfile::tempdir().unwrap();
    let state = build_state(&dir).await;
    let (status, json) = call(routes::build_router(state), "/api/dashboard?trigger_only=0&q=tcs").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["scan"]["filtered"], 0);
    assert_eq!(json["rows"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn trades_on_an_empty_store_returns_zeroed_summary() {
    let dir = tempfile::tempdir().unwrap();
    let state = build_state(&dir).await;
    let (status, json) = call(routes::build_router(state), "/api/trades").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["summary"]["total"], 0);
    assert_eq!(json["open"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn broker_limits_reflects_fresh_day_counter() {
    let dir = tempfile::tempdir().unwrap();
    let state = build_state(&dir).await;
    let (status, json) = call(routes::build_router(state), "/api/broker-limits").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "green");
    assert_eq!(json["orders_placed"], 0);
}

#[tokio::test]
async fn export_writes_a_file_under_the_exports_dir() {
    let dir = tempfile::tempdir().unwrap();
    let state = build_state(&dir).await;
    let exports_dir = state.config.exports_dir.clone();
    let (status, json) = call(routes::build_router(state), "/api/export?format=json").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["count"], 0);
    let filename = json["filename"].as_str().unwrap();
    assert!(exports_dir.join(filename).exists());
}

#[tokio::test]
async fn export_rejects_unsupported_format() {
    let dir = tempfile::tempdir().unwrap();
    let state = build_state(&dir).await;
    let (status, json) = call(routes::build_router(state), "/api/export?format=xml").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(json["error"].as_str().unwrap().contains("unsupported"));
}
