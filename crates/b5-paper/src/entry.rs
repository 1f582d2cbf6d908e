//! Entry filter and entry guard (spec §4.5).

use b5_config::EngineConfig;
use b5_schemas::{DerivedRow, InstrumentType};

use crate::types::EntryRejection;

#[derive(Debug, Clone, PartialEq)]
pub struct EntryPlan {
    pub sl_price: f64,
    pub tp_price: f64,
    pub tsl_trigger: f64,
    pub tsl_active: bool,
    pub tsl_sl_price: f64,
    pub quantity: i64,
    pub reason: &'static str,
}

const DEFAULT_ENTRY_REASON: &str = "be5_reversal_guard_entry";

/// Context the entry filter needs beyond the row itself and the config —
/// everything here comes from state the paper engine owns (open trades,
/// cooldown, broker limits, market clock), kept as plain booleans so this
/// function stays pure and independently testable.
#[derive(Debug, Clone, Copy)]
pub struct EntryContext {
    pub has_open_trade: bool,
    pub cooldown_elapsed: bool,
    pub market_open: bool,
    pub broker_safe: bool,
    pub is_mcx_evening_session: bool,
}

/// Evaluate the entry filter (spec §4.5 steps 1-9) against one trigger row,
/// then the entry guard. Returns the trade parameters to open on acceptance.
pub fn evaluate(
    row: &DerivedRow,
    instrument_type: InstrumentType,
    cfg: &EngineConfig,
    ctx: &EntryContext,
) -> Result<EntryPlan, EntryRejection> {
    if ctx.has_open_trade {
        return Err(EntryRejection::AlreadyOpen);
    }
    if !ctx.cooldown_elapsed {
        return Err(EntryRejection::Cooldown);
    }
    if !row.fetch_done || !row.in_range_up {
        return Err(EntryRejection::NotTrendingUp);
    }
    if cfg.trend_only {
        if row.sideways || row.trend != b5_schemas::Trend::Up {
            return Err(EntryRejection::NotTrendingUp);
        }
    } else if row.trend == b5_schemas::Trend::Down {
        return Err(EntryRejection::NotTrendingUp);
    }
    if row.confirmation < cfg.min_confirmation {
        return Err(EntryRejection::ConfirmationTooLow);
    }
    if row.rr_to_bu5 < cfg.min_rr {
        return Err(EntryRejection::RrTooLow);
    }

    let min_probability = if instrument_type == InstrumentType::Commodity && ctx.is_mcx_evening_session {
        25
    } else {
        cfg.min_probability_score
    };
    if row.probability_score < min_probability {
        return Err(EntryRejection::ProbabilityTooLow);
    }

    if row.spike_flag {
        return Err(EntryRejection::Spike);
    }
    if cfg.jackpot_only && !row.jackpot_be5_reversal {
        return Err(EntryRejection::NotJackpot);
    }
    if !ctx.market_open {
        return Err(EntryRejection::MarketClosed);
    }
    if !ctx.broker_safe {
        return Err(EntryRejection::BrokerLimitsRed);
    }

    // Entry guard: re-check levels are sane for the ltp we're about to enter at.
    if row.bu1 <= 0.0 || row.bu5 <= 0.0 || row.bu1 > row.bu5 {
        return Err(EntryRejection::MissingLevels);
    }
    if !(row.bu1 <= row.ltp && row.ltp <= row.bu5) {
        return Err(EntryRejection::OutsideBu1Bu5);
    }

    let quantity = if instrument_type == InstrumentType::Option { 50 } else { 1 };

    Ok(EntryPlan {
        sl_price: row.be1,
        tp_price: row.bu5,
        tsl_trigger: row.bu3,
        tsl_active: false,
        tsl_sl_price: row.be1,
        quantity,
        reason: DEFAULT_ENTRY_REASON,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use b5_schemas::Trend;

    fn base_row() -> DerivedRow {
        DerivedRow {
            symbol: "NSE|1".to_string(),
            tsym: Some("INFY".to_string()),
            exchange: Some("NSE".to_string()),
            ltp: 100.90,
            volume: 0.0,
            fetch_done: true,
            updated_at: None,
            close: 100.0,
            points: 0.2611,
            bu1: 100.2611,
            bu2: 100.5222,
            bu3: 100.7833,
            bu4: 101.0444,
            bu5: 101.3055,
            be1: 99.7389,
            be2: 99.4778,
            be3: 99.2167,
            be4: 98.9556,
            be5: 98.6945,
            near_name: "BU3".to_string(),
            near_value: 100.7833,
            near_diff: 0.1167,
            near_pct: 0.12,
            in_range_up: true,
            in_range_down: false,
            sideways: false,
            trend: Trend::Up,
            up_break_count: 3,
            down_break_count: 0,
            confirmation: 3,
            rr_to_bu5: (101.3055 - 100.90) / (100.90 - 100.2611),
            volume_delta: 0.0,
            volume_accel: 0.0,
            be5_touched_recent: false,
            jackpot_be5_reversal: false,
            jackpot_retest: false,
            jackpot_short: false,
            spike_flag: false,
            probability_score: 60,
            selected_factor: 0.002611,
            factor_name: "micro".to_string(),
            factor_reason: "equity_normal_move".to_string(),
        }
    }

    fn ctx_all_clear() -> EntryContext {
        EntryContext {
            has_open_trade: false,
            cooldown_elapsed: true,
            market_open: true,
            broker_safe: true,
            is_mcx_evening_session: false,
        }
    }

    // Scenario S3 (spec §8.2).
    #[test]
    fn scenario_s3_entry_accepted() {
        let row = base_row();
        let cfg = EngineConfig::default();
        let plan = evaluate(&row, InstrumentType::Equity, &cfg, &ctx_all_clear()).unwrap();
        assert!((plan.sl_price - 99.7389).abs() < 1e-9);
        assert!((plan.tp_price - 101.3055).abs() < 1e-9);
        assert!((plan.tsl_trigger - 100.7833).abs() < 1e-9);
        assert!(!plan.tsl_active);
        assert_eq!(plan.quantity, 1);
    }

    #[test]
    fn option_quantity_is_fifty() {
        let row = base_row();
        let cfg = EngineConfig::default();
        let plan = evaluate(&row, InstrumentType::Option, &cfg, &ctx_all_clear()).unwrap();
        assert_eq!(plan.quantity, 50);
    }

    #[test]
    fn already_open_rejects_before_other_checks() {
        let row = base_row();
        let cfg = EngineConfig::default();
        let mut ctx = ctx_all_clear();
        ctx.has_open_trade = true;
        assert_eq!(
            evaluate(&row, InstrumentType::Equity, &cfg, &ctx).unwrap_err(),
            EntryRejection::AlreadyOpen
        );
    }

    #[test]
    fn spike_flag_blocks_entry() {
        let mut row = base_row();
        row.spike_flag = true;
        let cfg = EngineConfig::default();
        assert_eq!(
            evaluate(&row, InstrumentType::Equity, &cfg, &ctx_all_clear()).unwrap_err(),
            EntryRejection::Spike
        );
    }

    #[test]
    fn sideways_row_rejected_when_trend_only() {
        let mut row = base_row();
        row.sideways = true;
        row.trend = b5_schemas::Trend::Sideways;
        let cfg = EngineConfig::default();
        assert!(cfg.trend_only);
        assert_eq!(
            evaluate(&row, InstrumentType::Equity, &cfg, &ctx_all_clear()).unwrap_err(),
            EntryRejection::NotTrendingUp
        );
    }

    #[test]
    fn sideways_row_accepted_when_trend_only_disabled() {
        let mut row = base_row();
        row.sideways = true;
        row.trend = b5_schemas::Trend::Sideways;
        let mut cfg = EngineConfig::default();
        cfg.trend_only = false;
        assert!(evaluate(&row, InstrumentType::Equity, &cfg, &ctx_all_clear()).is_ok());
    }

    #[test]
    fn down_trend_still_rejected_when_trend_only_disabled() {
        let mut row = base_row();
        row.sideways = false;
        row.trend = b5_schemas::Trend::Down;
        let mut cfg = EngineConfig::default();
        cfg.trend_only = false;
        assert_eq!(
            evaluate(&row, InstrumentType::Equity, &cfg, &ctx_all_clear()).unwrap_err(),
            EntryRejection::NotTrendingUp
        );
    }

    #[test]
    fn jackpot_only_requires_jackpot_flag() {
        let row = base_row();
        let mut cfg = EngineConfig::default();
        cfg.jackpot_only = true;
        assert_eq!(
            evaluate(&row, InstrumentType::Equity, &cfg, &ctx_all_clear()).unwrap_err(),
            EntryRejection::NotJackpot
        );
    }

    #[test]
    fn mcx_evening_session_relaxes_probability_threshold() {
        let mut row = base_row();
        row.probability_score = 28;
        let cfg = EngineConfig::default();
        let mut ctx = ctx_all_clear();
        ctx.is_mcx_evening_session = true;
        let plan = evaluate(&row, InstrumentType::Commodity, &cfg, &ctx);
        assert!(plan.is_ok());
    }

    #[test]
    fn outside_bu1_bu5_is_rejected_by_entry_guard() {
        let mut row = base_row();
        row.ltp = 102.0; // above bu5
        let cfg = EngineConfig::default();
        assert_eq!(
            evaluate(&row, InstrumentType::Equity, &cfg, &ctx_all_clear()).unwrap_err(),
            EntryRejection::OutsideBu1Bu5
        );
    }
}
