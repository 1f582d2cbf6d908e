//! Single source of truth for runtime configuration (spec §6.4).
//!
//! Mirrors the discipline of the teacher workspace's secrets module: resolve
//! once at startup into a typed, `Clone`-able struct and pass it down —
//! callers must never scatter `std::env::var` reads through the codebase.

use std::env;
use std::path::PathBuf;

use anyhow::{Context, Result};
use b5_schemas::{FactorChoice, Timeframe};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeMode {
    Paper,
    Live,
}

impl TradeMode {
    fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "paper" => Some(TradeMode::Paper),
            "live" => Some(TradeMode::Live),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TradeMode::Paper => "paper",
            TradeMode::Live => "live",
        }
    }
}

/// Fully-resolved engine configuration. Build once via [`EngineConfig::from_env`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub port: u16,

    pub paper_tf: Timeframe,
    pub paper_factor: FactorChoice,
    pub paper_factor_mcx: FactorChoice,
    pub paper_cooldown_sec: u64,
    pub paper_cycle_ms: u64,

    pub trade_mode: TradeMode,
    /// Gate for live trading; the spec requires this to default to off and
    /// never be implicitly enabled by `trade_mode` alone.
    pub enable_live_trading: bool,

    pub trend_only: bool,
    pub min_confirmation: u8,
    pub min_rr: f64,
    pub jackpot_only: bool,
    pub jackpot_touch_lookback_sec: i64,
    pub jackpot_min_confirmation: u8,
    pub jackpot_min_rr: f64,
    pub min_volume_accel: f64,
    pub min_probability_score: i32,
    pub max_spike_points_mult: f64,

    pub max_orders_per_day: i64,
    pub max_open_positions: i64,
    pub max_margin_used_pct: f64,

    // Not named in §6.4's env var table, but the daemon needs somewhere to
    // find its external inputs/outputs: the upstream snapshot file, the
    // read-only first-close DB, this engine's own paper-trade DB, the
    // upstream ticks log (stats-only, §4.9), and the export output dir.
    pub snapshot_path: PathBuf,
    pub first_close_db_path: PathBuf,
    pub paper_db_path: PathBuf,
    pub ticks_file_path: Option<PathBuf>,
    pub exports_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let min_confirmation = 2u8;
        let min_rr = 0.5f64;
        Self {
            port: 8787,
            paper_tf: Timeframe::M5,
            paper_factor: FactorChoice::Smart,
            paper_factor_mcx: FactorChoice::Mini,
            paper_cooldown_sec: 30,
            paper_cycle_ms: 1500,
            trade_mode: TradeMode::Paper,
            enable_live_trading: false,
            trend_only: true,
            min_confirmation,
            min_rr,
            jackpot_only: false,
            jackpot_touch_lookback_sec: 1800,
            jackpot_min_confirmation: min_confirmation.max(3),
            jackpot_min_rr: min_rr.max(2.2),
            min_volume_accel: 1.15,
            min_probability_score: 35,
            max_spike_points_mult: 2.5,
            max_orders_per_day: 2000,
            max_open_positions: 100,
            max_margin_used_pct: 80.0,
            snapshot_path: PathBuf::from("data/snapshot.json"),
            first_close_db_path: PathBuf::from("data/firstclose.db"),
            paper_db_path: PathBuf::from("data/paper_trades.db"),
            ticks_file_path: None,
            exports_dir: PathBuf::from("exports"),
        }
    }
}

impl EngineConfig {
    /// Resolve configuration from the process environment, falling back to
    /// spec-mandated defaults for anything absent or unparsable.
    pub fn from_env() -> Result<Self> {
        let d = Self::default();

        let min_confirmation = env_u8("MIN_CONFIRMATION", d.min_confirmation);
        let min_rr = env_f64("MIN_RR", d.min_rr);

        Ok::<Self, anyhow::Error>(Self {
            port: env_u16("PORT", d.port),
            paper_tf: env_timeframe("PAPER_TF", d.paper_tf),
            paper_factor: env_factor("PAPER_FACTOR", d.paper_factor),
            paper_factor_mcx: env_factor("PAPER_FACTOR_MCX", d.paper_factor_mcx),
            paper_cooldown_sec: env_u64("PAPER_COOLDOWN_SEC", d.paper_cooldown_sec),
            // spec: minimum 500ms regardless of what's configured.
            paper_cycle_ms: env_u64("PAPER_CYCLE_MS", d.paper_cycle_ms).max(500),
            trade_mode: env_trade_mode("TRADE_MODE", d.trade_mode),
            enable_live_trading: env_flag("ENABLE_LIVE_TRADING", d.enable_live_trading),
            trend_only: env_flag("TREND_ONLY", d.trend_only),
            min_confirmation,
            min_rr,
            jackpot_only: env_flag("JACKPOT_ONLY", d.jackpot_only),
            jackpot_touch_lookback_sec: env_i64(
                "JACKPOT_TOUCH_LOOKBACK_SEC",
                d.jackpot_touch_lookback_sec,
            ),
            jackpot_min_confirmation: env_u8(
                "JACKPOT_MIN_CONFIRMATION",
                min_confirmation.max(3),
            ),
            jackpot_min_rr: env_f64("JACKPOT_MIN_RR", min_rr.max(2.2)),
            min_volume_accel: env_f64("MIN_VOLUME_ACCEL", d.min_volume_accel),
            min_probability_score: env_i32("MIN_PROBABILITY_SCORE", d.min_probability_score),
            max_spike_points_mult: env_f64("MAX_SPIKE_POINTS_MULT", d.max_spike_points_mult),
            max_orders_per_day: env_i64("MAX_ORDERS_PER_DAY", d.max_orders_per_day),
            max_open_positions: env_i64("MAX_OPEN_POSITIONS", d.max_open_positions),
            max_margin_used_pct: env_f64("MAX_MARGIN_USED_PCT", d.max_margin_used_pct),
            snapshot_path: env_path("SNAPSHOT_PATH", d.snapshot_path),
            first_close_db_path: env_path("FIRST_CLOSE_DB_PATH", d.first_close_db_path),
            paper_db_path: env_path("PAPER_DB_PATH", d.paper_db_path),
            ticks_file_path: env_raw("TICKS_FILE_PATH").map(PathBuf::from).or(d.ticks_file_path),
            exports_dir: env_path("EXPORTS_DIR", d.exports_dir),
        })
        .context("resolving EngineConfig from environment")
    }
}

fn env_raw(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_u16(key: &str, default: u16) -> u16 {
    env_raw(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env_raw(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_i64(key: &str, default: i64) -> i64 {
    env_raw(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_i32(key: &str, default: i32) -> i32 {
    env_raw(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_u8(key: &str, default: u8) -> u8 {
    env_raw(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env_raw(key).and_then(|v| v.parse().ok()).unwrap_or(default)
}

fn env_flag(key: &str, default: bool) -> bool {
    match env_raw(key) {
        Some(v) => v == "1" || v.eq_ignore_ascii_case("true"),
        None => default,
    }
}

fn env_timeframe(key: &str, default: Timeframe) -> Timeframe {
    env_raw(key)
        .and_then(|v| Timeframe::parse(&v))
        .unwrap_or(default)
}

fn env_factor(key: &str, default: FactorChoice) -> FactorChoice {
    env_raw(key)
        .and_then(|v| FactorChoice::parse(&v))
        .unwrap_or(default)
}

fn env_trade_mode(key: &str, default: TradeMode) -> TradeMode {
    env_raw(key).and_then(|v| TradeMode::parse(&v)).unwrap_or(default)
}

fn env_path(key: &str, default: PathBuf) -> PathBuf {
    env_raw(key).map(PathBuf::from).unwrap_or(default)
}
