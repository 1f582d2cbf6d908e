//! Request and response types for the daemon's HTTP endpoints (spec §6.4).
//!
//! Plain `Serialize`/`Deserialize` structs, no business logic.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub ok: bool,
    pub trade_mode: &'static str,
    pub live_enabled: bool,
    pub ist_time: String,
    pub ist_datetime: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DashboardParams {
    pub tf: Option<String>,
    pub factor: Option<String>,
    pub q: Option<String>,
    pub complete: Option<u8>,
    pub trigger_only: Option<u8>,
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradesParams {
    pub open_limit: Option<usize>,
    pub closed_limit: Option<usize>,
    pub q: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExportParams {
    pub format: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportResponse {
    pub filename: String,
    pub count: usize,
    pub download_url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}
