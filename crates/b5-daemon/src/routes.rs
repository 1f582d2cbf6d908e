//! Axum router and HTTP handlers (spec §6.4).
//!
//! `build_router` is the single entry point; `main.rs` calls it and attaches
//! the CORS/trace middleware layers.

use std::fs::File;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use b5_schemas::{FactorChoice, Timeframe};

use crate::api_types::{
    DashboardParams, ErrorResponse, ExportParams, ExportResponse, HealthResponse, TradesParams,
};
use crate::compute::rows_for_config;
use crate::state::AppState;

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/dashboard", get(dashboard))
        .route("/api/trades", get(trades))
        .route("/api/broker-limits", get(broker_limits))
        .route("/api/export", get(export))
        .with_state(state)
}

fn ist_blocks(state: &AppState) -> (String, String) {
    let now_ist = state.clock.now_utc().with_timezone(&chrono_tz::Asia::Kolkata);
    (now_ist.format("%H:%M:%S").to_string(), now_ist.to_rfc3339())
}

// ---------------------------------------------------------------------------
// GET /api/health
// ---------------------------------------------------------------------------

async fn health(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    let (ist_time, ist_datetime) = ist_blocks(&st);
    Json(HealthResponse {
        ok: true,
        trade_mode: st.config.trade_mode.as_str(),
        live_enabled: st.config.enable_live_trading,
        ist_time,
        ist_datetime,
    })
}

// ---------------------------------------------------------------------------
// GET /api/dashboard
// ---------------------------------------------------------------------------

async fn dashboard(State(st): State<Arc<AppState>>, Query(p): Query<DashboardParams>) -> Response {
    let tf = p
        .tf
        .as_deref()
        .and_then(Timeframe::parse)
        .unwrap_or(st.config.paper_tf);
    let factor = p
        .factor
        .as_deref()
        .and_then(FactorChoice::parse)
        .unwrap_or(st.config.paper_factor);

    let (snapshot, version) = st.snapshot_loader.current();
    let (all_rows, trigger_rows) = rows_for_config(&st, &snapshot, version, tf, factor);

    let query = b5_views::DashboardQuery {
        tf,
        factor,
        q: p.q.filter(|s| !s.is_empty()),
        complete_only: p.complete.unwrap_or(0) != 0,
        trigger_only: p.trigger_only.map(|v| v != 0).unwrap_or(true),
        limit: b5_views::dashboard::DashboardQuery::normalize_limit(p.limit),
    };

    let day = snapshot.day.clone();
    let (first_closes_rows_today, pending_symbols) = match &st.first_close {
        Some(reader) => (reader.row_count_for_day(&day).await, reader.pending_symbol_count().await),
        None => (0, 0),
    };
    let (ticks_file_size_bytes, ticks_file_mtime) = ticks_file_stats(&st);
    let stats = b5_views::StoreStats {
        first_closes_rows_today,
        pending_symbols,
        symbol_cache_size: st.symbol_cache_size(),
        ticks_file_size_bytes,
        ticks_file_mtime,
    };

    let counter = match b5_db::load_broker_limits(&st.db_pool, &day).await {
        Ok(c) => c,
        Err(e) => return error_response(e),
    };
    let broker_limits = b5_paper::evaluate_broker_limits(&counter, &st.config);

    let (ist_time, ist_datetime) = ist_blocks(&st);
    let market_time = b5_views::MarketTimeBlock { ist_time, ist_datetime };

    let view = b5_views::compose_dashboard(
        &snapshot,
        &all_rows,
        &trigger_rows,
        &query,
        stats,
        broker_limits,
        market_time,
    );
    Json(view).into_response()
}

fn ticks_file_stats(state: &AppState) -> (Option<u64>, Option<String>) {
    let Some(path) = &state.config.ticks_file_path else {
        return (None, None);
    };
    match std::fs::metadata(path) {
        Ok(meta) => {
            let mtime = meta
                .modified()
                .ok()
                .map(chrono::DateTime::<chrono::Utc>::from)
                .map(|t| t.to_rfc3339());
            (Some(meta.len()), mtime)
        }
        Err(_) => (None, None),
    }
}

// ---------------------------------------------------------------------------
// GET /api/trades
// ---------------------------------------------------------------------------

async fn trades(State(st): State<Arc<AppState>>, Query(p): Query<TradesParams>) -> Response {
    let (snapshot, version) = st.snapshot_loader.current();
    let (all_rows, _) = rows_for_config(&st, &snapshot, version, st.config.paper_tf, st.config.paper_factor);

    let all_trades = match b5_db::fetch_trades_for_day(&st.db_pool, &snapshot.day, None, 100_000).await {
        Ok(t) => t,
        Err(e) => return error_response(e),
    };

    let query = b5_views::TradesQuery {
        open_limit: b5_views::trades::TradesQuery::normalize_open_limit(p.open_limit),
        closed_limit: b5_views::trades::TradesQuery::normalize_closed_limit(p.closed_limit),
        q: p.q.filter(|s| !s.is_empty()),
    };

    let view = b5_views::compose_trades(&all_trades, &all_rows, &query, 10);
    Json(view).into_response()
}

// ---------------------------------------------------------------------------
// GET /api/broker-limits
// ---------------------------------------------------------------------------

async fn broker_limits(State(st): State<Arc<AppState>>) -> Response {
    let (snapshot, _) = st.snapshot_loader.current();
    let counter = match b5_db::load_broker_limits(&st.db_pool, &snapshot.day).await {
        Ok(c) => c,
        Err(e) => return error_response(e),
    };
    Json(b5_paper::evaluate_broker_limits(&counter, &st.config)).into_response()
}

// ---------------------------------------------------------------------------
// GET /api/export
// ---------------------------------------------------------------------------

async fn export(State(st): State<Arc<AppState>>, Query(p): Query<ExportParams>) -> Response {
    let format = p.format.as_deref().unwrap_or("json");
    if format != "json" && format != "csv" {
        return error_response(anyhow::anyhow!("unsupported export format: {format}"));
    }

    let (snapshot, _) = st.snapshot_loader.current();
    let day = snapshot.day.clone();
    let trades = match b5_db::fetch_trades_for_day(&st.db_pool, &day, None, 100_000).await {
        Ok(t) => t,
        Err(e) => return error_response(e),
    };

    if let Err(e) = std::fs::create_dir_all(&st.config.exports_dir) {
        return error_response(e.into());
    }

    let filename = format!("trades-{day}.{format}");
    let path = st.config.exports_dir.join(&filename);

    let write_result = match format {
        "json" => write_json_export(&path, &trades),
        _ => write_csv_export(&path, &trades),
    };

    if let Err(e) = write_result {
        return error_response(e);
    }

    Json(ExportResponse {
        filename: filename.clone(),
        count: trades.len(),
        download_url: format!("/exports/{filename}"),
    })
    .into_response()
}

fn write_json_export(path: &std::path::Path, trades: &[b5_schemas::PaperTrade]) -> anyhow::Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(file, trades)?;
    Ok(())
}

fn write_csv_export(path: &std::path::Path, trades: &[b5_schemas::PaperTrade]) -> anyhow::Result<()> {
    let file = File::create(path)?;
    let mut writer = csv::Writer::from_writer(file);
    for t in trades {
        writer.serialize(t)?;
    }
    writer.flush()?;
    Ok(())
}

fn error_response(e: anyhow::Error) -> Response {
    tracing::warn!(error = %e, "view handler failed");
    (StatusCode::INTERNAL_SERVER_ERROR, Json(ErrorResponse { error: e.to_string() })).into_response()
}
