//! b5-daemon entry point.
//!
//! Thin by design: resolve config, connect the stores, build shared state,
//! spawn the periodic paper-engine cycle, then serve HTTP. All route
//! handlers live in `routes.rs`; all shared state lives in `state.rs`.

use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::http::{HeaderValue, Method};
use b5_daemon::{cycle, routes, state::AppState};
use b5_config::EngineConfig;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let config = EngineConfig::from_env()?;

    let db_pool = b5_db::connect(&config.paper_db_path)
        .await
        .context("connecting to paper-trade store")?;
    b5_db::migrate(&db_pool).await.context("migrating paper-trade store")?;

    // First-close DB is read-only and optional (spec §7: degrade stats to
    // zero on unavailability rather than failing startup).
    let first_close = match b5_snapshot::FirstCloseReader::connect_readonly(&config.first_close_db_path).await {
        Ok(r) => Some(r),
        Err(e) => {
            tracing::warn!(error = %e, "first-close db unavailable; dashboard stats will read zero");
            None
        }
    };

    let port = config.port;
    let state = Arc::new(AppState::new(config, db_pool, first_close));

    cycle::spawn(Arc::clone(&state));

    let app = routes::build_router(Arc::clone(&state))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors_localhost_only());

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("b5-daemon listening on http://{}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, app)
        .await
        .context("server crashed")?;

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}

/// CORS: allow only localhost origins, matching the dashboard's dev setup.
fn cors_localhost_only() -> CorsLayer {
    let allowed_origins = [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| HeaderValue::from_str(o).ok())
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET])
        .allow_headers(tower_http::cors::Any)
}
