//! Query/View Layer (spec §4.9): pure composition of the dashboard and
//! trades views from data the caller (the daemon) already holds — the
//! current snapshot, this cycle's derived rows, the paper-trade store, and
//! the store-stats/broker-limits/market-time blocks. No I/O here; view
//! handlers in the daemon gather inputs, these functions shape them.

pub mod dashboard;
pub mod trades;

pub use dashboard::{compose as compose_dashboard, DashboardQuery, DashboardView, MarketTimeBlock, StatusBlock, StoreStats};
pub use trades::{compose as compose_trades, EnrichedTrade, TradeSummary, TradesQuery, TradesView};
