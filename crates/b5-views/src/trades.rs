//! Trades view (spec §4.9 para 2): trade-store summary, open/closed listings,
//! and an analysis block built from the current derived-row snapshot. Pure
//! composition over data the caller already holds.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use b5_schemas::{DerivedRow, PaperTrade};

pub const DEFAULT_OPEN_LIMIT: usize = 500;
pub const MAX_OPEN_LIMIT: usize = 5000;
pub const DEFAULT_CLOSED_LIMIT: usize = 1000;
pub const MAX_CLOSED_LIMIT: usize = 10_000;

#[derive(Debug, Clone)]
pub struct TradesQuery {
    pub open_limit: usize,
    pub closed_limit: usize,
    pub q: Option<String>,
}

impl TradesQuery {
    pub fn normalize_open_limit(requested: Option<usize>) -> usize {
        requested.unwrap_or(DEFAULT_OPEN_LIMIT).clamp(1, MAX_OPEN_LIMIT)
    }

    pub fn normalize_closed_limit(requested: Option<usize>) -> usize {
        requested.unwrap_or(DEFAULT_CLOSED_LIMIT).clamp(1, MAX_CLOSED_LIMIT)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TradeSummary {
    pub total: usize,
    pub open_count: usize,
    pub closed_count: usize,
    pub wins: usize,
    pub losses: usize,
    pub win_rate_pct: f64,
    pub total_pnl: f64,
    pub total_net_pnl: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichedTrade {
    #[serde(flatten)]
    pub trade: PaperTrade,
    pub current_ltp: Option<f64>,
    pub current_volume: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerSymbolPerformance {
    pub symbol: String,
    pub trades: usize,
    pub wins: usize,
    pub losses: usize,
    pub total_pnl: f64,
    pub total_net_pnl: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PctMover {
    pub symbol: String,
    pub tsym: Option<String>,
    pub ltp: f64,
    pub first_close: f64,
    pub pct_change: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeLeader {
    pub symbol: String,
    pub tsym: Option<String>,
    pub volume: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisBlock {
    pub top_winners: Vec<EnrichedTrade>,
    pub top_losers: Vec<EnrichedTrade>,
    pub per_symbol: Vec<PerSymbolPerformance>,
    pub volume_leaders: Vec<VolumeLeader>,
    pub top_gainers: Vec<PctMover>,
    pub top_losers_pct: Vec<PctMover>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradesView {
    pub summary: TradeSummary,
    pub open: Vec<EnrichedTrade>,
    pub closed: Vec<EnrichedTrade>,
    pub analysis: AnalysisBlock,
}

fn matches_query(trade: &PaperTrade, q: &str) -> bool {
    let q = q.to_ascii_lowercase();
    if trade.symbol.to_ascii_lowercase().starts_with(&q) {
        return true;
    }
    trade
        .tsym
        .as_deref()
        .map(|t| t.to_ascii_lowercase().starts_with(&q))
        .unwrap_or(false)
}

fn enrich<'a>(trade: &PaperTrade, by_symbol: &HashMap<&'a str, &'a DerivedRow>) -> EnrichedTrade {
    let row = by_symbol.get(trade.symbol.as_str()).copied();
    EnrichedTrade {
        trade: trade.clone(),
        current_ltp: row.map(|r| r.ltp),
        current_volume: row.map(|r| r.volume),
    }
}

fn summarize(trades: &[PaperTrade]) -> TradeSummary {
    let total = trades.len();
    let open_count = trades.iter().filter(|t| t.status == "OPEN").count();
    let closed = trades.iter().filter(|t| t.status == "CLOSED");
    let mut wins = 0usize;
    let mut losses = 0usize;
    let mut total_pnl = 0.0;
    let mut total_net_pnl = 0.0;
    let mut closed_count = 0usize;
    for t in closed {
        closed_count += 1;
        total_pnl += t.pnl;
        total_net_pnl += t.net_pnl;
        if t.net_pnl > 0.0 {
            wins += 1;
        } else {
            losses += 1;
        }
    }
    let win_rate_pct = if closed_count > 0 {
        wins as f64 / closed_count as f64 * 100.0
    } else {
        0.0
    };

    TradeSummary {
        total,
        open_count,
        closed_count,
        wins,
        losses,
        win_rate_pct,
        total_pnl,
        total_net_pnl,
    }
}

pub fn compose(all_trades: &[PaperTrade], current_rows: &[DerivedRow], query: &TradesQuery, top_n: usize) -> TradesView {
    let by_symbol: HashMap<&str, &DerivedRow> =
        current_rows.iter().map(|r| (r.symbol.as_str(), r)).collect();

    let filtered: Vec<&PaperTrade> = all_trades
        .iter()
        .filter(|t| query.q.as_deref().map(|q| matches_query(t, q)).unwrap_or(true))
        .collect();

    let mut open: Vec<&PaperTrade> = filtered.iter().copied().filter(|t| t.status == "OPEN").collect();
    open.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    open.truncate(query.open_limit);

    let mut closed: Vec<&PaperTrade> = filtered.iter().copied().filter(|t| t.status == "CLOSED").collect();
    closed.sort_by(|a, b| b.exit_ts.cmp(&a.exit_ts));
    closed.truncate(query.closed_limit);

    let summary = summarize(&filtered.iter().map(|t| (*t).clone()).collect::<Vec<_>>());

    let mut by_pnl: Vec<&PaperTrade> = filtered.clone();
    by_pnl.sort_by(|a, b| b.pnl.partial_cmp(&a.pnl).unwrap_or(std::cmp::Ordering::Equal));
    let top_winners = by_pnl.iter().take(top_n).map(|t| enrich(t, &by_symbol)).collect();
    let top_losers = by_pnl
        .iter()
        .rev()
        .take(top_n)
        .map(|t| enrich(t, &by_symbol))
        .collect();

    let mut per_symbol_map: HashMap<&str, PerSymbolPerformance> = HashMap::new();
    for t in &filtered {
        let entry = per_symbol_map
            .entry(t.symbol.as_str())
            .or_insert_with(|| PerSymbolPerformance {
                symbol: t.symbol.clone(),
                trades: 0,
                wins: 0,
                losses: 0,
                total_pnl: 0.0,
                total_net_pnl: 0.0,
            });
        entry.trades += 1;
        entry.total_pnl += t.pnl;
        if t.status == "CLOSED" {
            entry.total_net_pnl += t.net_pnl;
            if t.net_pnl > 0.0 {
                entry.wins += 1;
            } else {
                entry.losses += 1;
            }
        }
    }
    let mut per_symbol: Vec<PerSymbolPerformance> = per_symbol_map.into_values().collect();
    per_symbol.sort_by(|a, b| b.total_pnl.partial_cmp(&a.total_pnl).unwrap_or(std::cmp::Ordering::Equal));

    let mut by_volume: Vec<&DerivedRow> = current_rows.iter().collect();
    by_volume.sort_by(|a, b| b.volume.partial_cmp(&a.volume).unwrap_or(std::cmp::Ordering::Equal));
    let volume_leaders = by_volume
        .iter()
        .take(top_n)
        .map(|r| VolumeLeader {
            symbol: r.symbol.clone(),
            tsym: r.tsym.clone(),
            volume: r.volume,
        })
        .collect();

    let mut movers: Vec<PctMover> = current_rows
        .iter()
        .filter(|r| r.close.abs() > 1e-9)
        .map(|r| PctMover {
            symbol: r.symbol.clone(),
            tsym: r.tsym.clone(),
            ltp: r.ltp,
            first_close: r.close,
            pct_change: (r.ltp - r.close) / r.close * 100.0,
        })
        .collect();
    movers.sort_by(|a, b| b.pct_change.partial_cmp(&a.pct_change).unwrap_or(std::cmp::Ordering::Equal));
    let top_gainers: Vec<PctMover> = movers.iter().take(top_n).cloned().collect();
    let top_losers_pct: Vec<PctMover> = movers.iter().rev().take(top_n).cloned().collect();

    TradesView {
        summary,
        open: open.into_iter().map(|t| enrich(t, &by_symbol)).collect(),
        closed: closed.into_iter().map(|t| enrich(t, &by_symbol)).collect(),
        analysis: AnalysisBlock {
            top_winners,
            top_losers,
            per_symbol,
            volume_leaders,
            top_gainers,
            top_losers_pct,
        },
    }
}
