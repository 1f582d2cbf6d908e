//! Dashboard view (spec §4.9 para 1): composes the chosen derived rows for a
//! (tf, factor) pair with a search/gate/limit filter, plus scan counts, store
//! stats, and a status block. Pure composition — the caller (the daemon)
//! already holds the snapshot, the derived rows for this config, the stats
//! counters, and the broker-limits/market-time blocks; this module only
//! applies the view's own filtering and shaping rules.

use serde::{Deserialize, Serialize};

use b5_schemas::{BrokerLimitsStatus, DerivedRow, FactorChoice, Snapshot, Timeframe};

pub const DEFAULT_DASHBOARD_LIMIT: usize = 5000;
pub const MAX_DASHBOARD_LIMIT: usize = 50_000;

#[derive(Debug, Clone)]
pub struct DashboardQuery {
    pub tf: Timeframe,
    pub factor: FactorChoice,
    pub q: Option<String>,
    pub complete_only: bool,
    pub trigger_only: bool,
    pub limit: usize,
}

impl DashboardQuery {
    /// Clamp a caller-supplied limit into `[1, 50000]`, defaulting absent
    /// values to 5000 (spec §4.9).
    pub fn normalize_limit(requested: Option<usize>) -> usize {
        requested
            .unwrap_or(DEFAULT_DASHBOARD_LIMIT)
            .clamp(1, MAX_DASHBOARD_LIMIT)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotMeta {
    pub day: String,
    pub updated_at: String,
    pub row_count: i64,
}

impl From<&Snapshot> for SnapshotMeta {
    fn from(s: &Snapshot) -> Self {
        Self {
            day: s.day.clone(),
            updated_at: s.updated_at.clone(),
            row_count: s.row_count,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScanCounts {
    /// Rows available before this view's own filter (the base set chosen by
    /// `trigger_only`: either `allRows` or `triggerRows`).
    pub total: usize,
    /// Rows remaining after `complete_only`/`q` are applied.
    pub filtered: usize,
    /// Rows actually returned, after the limit cap.
    pub returned: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreStats {
    pub first_closes_rows_today: i64,
    pub pending_symbols: i64,
    pub symbol_cache_size: usize,
    pub ticks_file_size_bytes: Option<u64>,
    pub ticks_file_mtime: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketTimeBlock {
    pub ist_time: String,
    pub ist_datetime: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusBlock {
    pub broker_limits: BrokerLimitsStatus,
    pub market_time: MarketTimeBlock,
    /// The snapshot file's own opaque `status` object, re-exposed as-is
    /// (spec §6.1).
    pub upstream: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardView {
    pub snapshot: SnapshotMeta,
    pub tf: &'static str,
    pub factor: &'static str,
    pub rows: Vec<DerivedRow>,
    pub scan: ScanCounts,
    pub stats: StoreStats,
    pub status: StatusBlock,
}

/// Does `row` match the caller's `q` prefix search over symbol/tsym
/// (case-insensitive)?
fn matches_query(row: &DerivedRow, q: &str) -> bool {
    let q = q.to_ascii_lowercase();
    if row.symbol.to_ascii_lowercase().starts_with(&q) {
        return true;
    }
    row.tsym
        .as_deref()
        .map(|t| t.to_ascii_lowercase().starts_with(&q))
        .unwrap_or(false)
}

pub fn compose(
    snapshot: &Snapshot,
    all_rows: &[DerivedRow],
    trigger_rows: &[DerivedRow],
    query: &DashboardQuery,
    stats: StoreStats,
    broker_limits: BrokerLimitsStatus,
    market_time: MarketTimeBlock,
) -> DashboardView {
    let base: &[DerivedRow] = if query.trigger_only { trigger_rows } else { all_rows };
    let total = base.len();

    let filtered: Vec<&DerivedRow> = base
        .iter()
        .filter(|r| !query.complete_only || r.fetch_done)
        .filter(|r| query.q.as_deref().map(|q| matches_query(r, q)).unwrap_or(true))
        .collect();
    let filtered_count = filtered.len();

    let rows: Vec<DerivedRow> = filtered
        .into_iter()
        .take(query.limit)
        .cloned()
        .collect();
    let returned = rows.len();

    DashboardView {
        snapshot: SnapshotMeta::from(snapshot),
        tf: query.tf.as_str(),
        factor: query.factor.as_str(),
        rows,
        scan: ScanCounts {
            total,
            filtered: filtered_count,
            returned,
        },
        stats,
        status: StatusBlock {
            broker_limits,
            market_time,
            upstream: snapshot.status.clone(),
        },
    }
}
