//! Wire and domain types shared across the B5 analytics + paper-execution
//! workspace: the base snapshot row, the derived (levels-enriched) row, the
//! paper trade record, and the broker-limits counter.
//!
//! Kept dependency-free of any I/O crate (no sqlx, no axum) so every other
//! crate in the workspace can depend on it without pulling in a runtime.

use serde::{Deserialize, Deserializer, Serialize};

// ---------------------------------------------------------------------------
// Numeric parsing invariant (spec §3.1): missing/empty/non-finite -> None.
// ---------------------------------------------------------------------------

/// Deserialize a JSON number/string/null into `Option<f64>`, collapsing any
/// missing, empty-string, non-numeric-string, or non-finite value to `None`.
pub fn flexible_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        F(f64),
        S(String),
        Null,
    }

    let raw = Option::<Raw>::deserialize(deserializer)?;
    Ok(match raw {
        Some(Raw::F(v)) if v.is_finite() => Some(v),
        Some(Raw::F(_)) => None,
        Some(Raw::S(s)) => {
            let s = s.trim();
            if s.is_empty() {
                None
            } else {
                s.parse::<f64>().ok().filter(|v| v.is_finite())
            }
        }
        Some(Raw::Null) | None => None,
    })
}

fn default_none_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    flexible_f64(deserializer)
}

// ---------------------------------------------------------------------------
// Timeframe / Factor
// ---------------------------------------------------------------------------

/// First-candle timeframe a derived-row configuration is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timeframe {
    #[serde(rename = "1m")]
    M1,
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
}

impl Timeframe {
    pub fn as_str(self) -> &'static str {
        match self {
            Timeframe::M1 => "1m",
            Timeframe::M5 => "5m",
            Timeframe::M15 => "15m",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "1m" => Some(Timeframe::M1),
            "5m" => Some(Timeframe::M5),
            "15m" => Some(Timeframe::M15),
            _ => None,
        }
    }
}

/// Level-ladder multiplier selection. `Smart` defers to the per-row selector
/// (`b5-levels::factor::select_factor`); the other three are fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FactorChoice {
    Micro,
    Mini,
    Mega,
    Smart,
}

impl FactorChoice {
    pub fn as_str(self) -> &'static str {
        match self {
            FactorChoice::Micro => "micro",
            FactorChoice::Mini => "mini",
            FactorChoice::Mega => "mega",
            FactorChoice::Smart => "smart",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "micro" => Some(FactorChoice::Micro),
            "mini" => Some(FactorChoice::Mini),
            "mega" => Some(FactorChoice::Mega),
            "smart" => Some(FactorChoice::Smart),
            _ => None,
        }
    }
}

/// Concrete multipliers behind `micro`/`mini`/`mega` (spec §4.1).
pub const FACTOR_MICRO: f64 = 0.002611;
pub const FACTOR_MINI: f64 = 0.0261;
pub const FACTOR_MEGA: f64 = 0.2611;

impl FactorChoice {
    /// Resolve a *fixed* factor name to its multiplier. Returns `None` for
    /// `Smart`, which has no single multiplier (it is row-dependent).
    pub fn multiplier(self) -> Option<f64> {
        match self {
            FactorChoice::Micro => Some(FACTOR_MICRO),
            FactorChoice::Mini => Some(FACTOR_MINI),
            FactorChoice::Mega => Some(FACTOR_MEGA),
            FactorChoice::Smart => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Base snapshot row (spec §3.1)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BaseRow {
    pub symbol: String,
    #[serde(default)]
    pub tsym: Option<String>,
    #[serde(default)]
    pub exchange: Option<String>,
    #[serde(default, deserialize_with = "default_none_f64")]
    pub ltp: Option<f64>,
    #[serde(default, deserialize_with = "default_none_f64")]
    pub volume: Option<f64>,
    #[serde(default, deserialize_with = "default_none_f64")]
    pub first_1m_close: Option<f64>,
    #[serde(default, deserialize_with = "default_none_f64")]
    pub first_5m_close: Option<f64>,
    #[serde(default, deserialize_with = "default_none_f64")]
    pub first_15m_close: Option<f64>,
    #[serde(default)]
    pub fetch_done: bool,
    #[serde(default)]
    pub updated_at: Option<String>,

    // Traderscope fields: opaque, passed through untouched.
    #[serde(default)]
    pub digit_analyses: Option<serde_json::Value>,
    #[serde(default)]
    pub selected_digit: Option<serde_json::Value>,
    #[serde(default)]
    pub selected_analysis: Option<serde_json::Value>,
    #[serde(default)]
    pub gamma_move: Option<serde_json::Value>,
    #[serde(default)]
    pub range_shifts: Option<serde_json::Value>,
    #[serde(default)]
    pub traderscope_ready: Option<bool>,
}

impl BaseRow {
    pub fn first_close_for(&self, tf: Timeframe) -> Option<f64> {
        match tf {
            Timeframe::M1 => self.first_1m_close,
            Timeframe::M5 => self.first_5m_close,
            Timeframe::M15 => self.first_15m_close,
        }
    }

    pub fn exchange_upper(&self) -> String {
        self.exchange
            .as_deref()
            .unwrap_or("")
            .to_ascii_uppercase()
    }

    pub fn tsym_upper(&self) -> String {
        self.tsym.as_deref().unwrap_or("").to_ascii_uppercase()
    }
}

// ---------------------------------------------------------------------------
// Snapshot envelope (spec §6.1)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub day: String,
    pub updated_at: String,
    pub row_count: i64,
    pub rows: Vec<BaseRow>,
    #[serde(default)]
    pub status: serde_json::Value,
}

impl Snapshot {
    /// The empty snapshot served when the file is absent or unreadable.
    pub fn empty() -> Self {
        Self {
            day: "-".to_string(),
            updated_at: "-".to_string(),
            row_count: 0,
            rows: Vec::new(),
            status: serde_json::Value::Null,
        }
    }
}

// ---------------------------------------------------------------------------
// Trend / derived row (spec §3.2)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Trend {
    Up,
    Down,
    Sideways,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DerivedRow {
    pub symbol: String,
    pub tsym: Option<String>,
    pub exchange: Option<String>,

    pub ltp: f64,
    pub volume: f64,
    pub fetch_done: bool,
    pub updated_at: Option<String>,

    pub close: f64,
    pub points: f64,
    pub bu1: f64,
    pub bu2: f64,
    pub bu3: f64,
    pub bu4: f64,
    pub bu5: f64,
    pub be1: f64,
    pub be2: f64,
    pub be3: f64,
    pub be4: f64,
    pub be5: f64,

    pub near_name: String,
    pub near_value: f64,
    pub near_diff: f64,
    pub near_pct: f64,

    pub in_range_up: bool,
    pub in_range_down: bool,
    pub sideways: bool,
    pub trend: Trend,

    pub up_break_count: u8,
    pub down_break_count: u8,
    pub confirmation: u8,

    pub rr_to_bu5: f64,

    pub volume_delta: f64,
    pub volume_accel: f64,

    pub be5_touched_recent: bool,
    pub jackpot_be5_reversal: bool,
    pub jackpot_retest: bool,
    pub jackpot_short: bool,
    pub spike_flag: bool,

    pub probability_score: i32,

    pub selected_factor: f64,
    pub factor_name: String,
    pub factor_reason: String,
}

// ---------------------------------------------------------------------------
// Paper trade (spec §3.4)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeStatus {
    Open,
    Closed,
}

impl TradeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TradeStatus::Open => "OPEN",
            TradeStatus::Closed => "CLOSED",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "OPEN" => Some(TradeStatus::Open),
            "CLOSED" => Some(TradeStatus::Closed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InstrumentType {
    Equity,
    Index,
    Option,
    Future,
    Commodity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperTrade {
    pub id: String,
    pub symbol: String,
    pub tsym: Option<String>,
    pub exchange: Option<String>,
    pub day: String,
    pub timeframe: String,
    pub factor: String,
    pub instrument_type: String,

    pub close_price: f64,
    pub points: f64,
    pub bu1: f64,
    pub bu2: f64,
    pub bu3: f64,
    pub bu4: f64,
    pub bu5: f64,
    pub be1: f64,
    pub be2: f64,
    pub be3: f64,
    pub be4: f64,
    pub be5: f64,

    pub sl_price: f64,
    pub tp_price: f64,
    pub tsl_trigger: f64,
    pub tsl_active: bool,
    pub tsl_sl_price: f64,

    pub entry_ltp: f64,
    pub entry_ts: String,
    pub exit_ltp: Option<f64>,
    pub exit_ts: Option<String>,
    pub quantity: i64,
    pub reason: Option<String>,

    pub last_ltp: f64,
    pub max_ltp: f64,
    pub min_ltp: f64,
    pub runup: f64,
    pub drawdown: f64,
    pub max_profit_points: f64,

    pub pnl: f64,
    pub pnl_pct: f64,
    pub brokerage: f64,
    pub stt: f64,
    pub exchange_charges: f64,
    pub sebi_charges: f64,
    pub stamp_duty: f64,
    pub gst: f64,
    pub total_charges: f64,
    pub net_pnl: f64,

    pub status: String,
    pub updated_at: String,
}

// ---------------------------------------------------------------------------
// Broker limits (spec §3.5, §4.7)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BrokerSafety {
    Green,
    Yellow,
    Red,
}

impl BrokerSafety {
    pub fn as_str(self) -> &'static str {
        match self {
            BrokerSafety::Green => "green",
            BrokerSafety::Yellow => "yellow",
            BrokerSafety::Red => "red",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerLimitsCounter {
    pub day: String,
    pub orders_placed: i64,
    pub open_positions: i64,
    pub margin_used: f64,
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerLimitsStatus {
    pub day: String,
    pub orders_placed: i64,
    pub max_orders_per_day: i64,
    pub orders_remaining: i64,
    pub open_positions: i64,
    pub max_open_positions: i64,
    pub positions_remaining: i64,
    pub margin_used: f64,
    pub max_margin_used_pct: f64,
    pub status: BrokerSafety,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flexible_f64_handles_missing_empty_and_nonfinite() {
        #[derive(Deserialize)]
        struct W {
            #[serde(default, deserialize_with = "default_none_f64")]
            v: Option<f64>,
        }
        let w: W = serde_json::from_str(r#"{"v": null}"#).unwrap();
        assert_eq!(w.v, None);
        let w: W = serde_json::from_str(r#"{"v": ""}"#).unwrap();
        assert_eq!(w.v, None);
        let w: W = serde_json::from_str(r#"{"v": "3.5"}"#).unwrap();
        assert_eq!(w.v, Some(3.5));
        let w: W = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(w.v, None);
        let w: W = serde_json::from_str(r#"{"v": 12.25}"#).unwrap();
        assert_eq!(w.v, Some(12.25));
    }

    #[test]
    fn timeframe_roundtrip() {
        for tf in [Timeframe::M1, Timeframe::M5, Timeframe::M15] {
            assert_eq!(Timeframe::parse(tf.as_str()), Some(tf));
        }
    }

    #[test]
    fn factor_multipliers_match_spec() {
        assert_eq!(FactorChoice::Micro.multiplier(), Some(0.002611));
        assert_eq!(FactorChoice::Mini.multiplier(), Some(0.0261));
        assert_eq!(FactorChoice::Mega.multiplier(), Some(0.2611));
        assert_eq!(FactorChoice::Smart.multiplier(), None);
    }
}
