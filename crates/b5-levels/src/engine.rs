//! Derived-Row Engine (spec §3.2/§4.2): turns one snapshot's base rows into
//! the levels-enriched derived rows for a single (timeframe, factor)
//! configuration, mutating the Signal State Store as it goes.

use std::collections::HashMap;

use b5_schemas::{BaseRow, DerivedRow, FactorChoice, Timeframe, Trend};

use crate::factor::resolve_factor;
use crate::signal_state::SignalState;

const RR_EPSILON: f64 = 1e-4;
const JACKPOT_RETEST_PCT_BAND: f64 = 0.08;

/// Thresholds the engine needs that originate in `EngineConfig` (kept local
/// to this crate so `b5-levels` has no dependency on `b5-config`).
#[derive(Debug, Clone, Copy)]
pub struct LevelParams {
    pub jackpot_touch_lookback_sec: i64,
    pub jackpot_min_confirmation: u8,
    pub jackpot_min_rr: f64,
    pub min_volume_accel: f64,
    pub max_spike_points_mult: f64,
}

impl Default for LevelParams {
    fn default() -> Self {
        Self {
            jackpot_touch_lookback_sec: 1800,
            jackpot_min_confirmation: 3,
            jackpot_min_rr: 2.2,
            min_volume_accel: 1.15,
            max_spike_points_mult: 2.5,
        }
    }
}

struct NamedLevel {
    name: &'static str,
    value: f64,
}

/// Result of one Derived-Row Engine recomputation.
pub struct DerivedRowsResult {
    pub all_rows: Vec<DerivedRow>,
    pub trigger_rows: Vec<DerivedRow>,
    pub new_state: HashMap<String, SignalState>,
}

/// Recompute derived rows for every base row under one (timeframe, factor)
/// configuration. `now_ts` is the snapshot's timestamp (unix seconds), used
/// for the BE5-retest recency window. `prev_state` is the signal state map
/// taken from the store for this config at the start of the run (spec
/// §4.4): this function is pure given `prev_state` and does not touch the
/// store itself — callers own the take/put around this call.
///
/// O(N) in `rows.len()`; no internal quadratic loops (spec §4.2).
pub fn compute(
    rows: &[BaseRow],
    timeframe: Timeframe,
    requested_factor: FactorChoice,
    now_ts: i64,
    params: LevelParams,
    prev_state: &HashMap<String, SignalState>,
) -> DerivedRowsResult {
    let mut all_rows = Vec::with_capacity(rows.len());
    let mut new_state = HashMap::with_capacity(rows.len());

    for row in rows {
        let ltp = match row.ltp {
            Some(v) => v,
            None => {
                carry_forward(&mut new_state, row, prev_state);
                continue;
            }
        };
        let close = match row.first_close_for(timeframe) {
            Some(v) => v,
            None => {
                carry_forward(&mut new_state, row, prev_state);
                continue;
            }
        };

        let exchange_upper = row.exchange_upper();
        let tsym_upper = row.tsym_upper();
        let volume = row.volume.unwrap_or(0.0);

        let (factor, factor_name, factor_reason) =
            resolve_factor(requested_factor, ltp, close, &exchange_upper, &tsym_upper);

        let points = close * factor;
        let bu = [
            close + points,
            close + 2.0 * points,
            close + 3.0 * points,
            close + 4.0 * points,
            close + 5.0 * points,
        ];
        let be = [
            close - points,
            close - 2.0 * points,
            close - 3.0 * points,
            close - 4.0 * points,
            close - 5.0 * points,
        ];

        let levels = [
            NamedLevel { name: "BU1", value: bu[0] },
            NamedLevel { name: "BU2", value: bu[1] },
            NamedLevel { name: "BU3", value: bu[2] },
            NamedLevel { name: "BU4", value: bu[3] },
            NamedLevel { name: "BU5", value: bu[4] },
            NamedLevel { name: "BE1", value: be[0] },
            NamedLevel { name: "BE2", value: be[1] },
            NamedLevel { name: "BE3", value: be[2] },
            NamedLevel { name: "BE4", value: be[3] },
            NamedLevel { name: "BE5", value: be[4] },
        ];
        let nearest = levels
            .iter()
            .min_by(|a, b| {
                (ltp - a.value)
                    .abs()
                    .partial_cmp(&(ltp - b.value).abs())
                    .expect("levels are always finite")
            })
            .expect("levels is non-empty");
        let near_name = nearest.name.to_string();
        let near_value = nearest.value;
        let near_diff = ltp - near_value;
        let near_pct = if near_value != 0.0 {
            near_diff / near_value * 100.0
        } else {
            0.0
        };

        let in_range_up = ltp >= bu[0] && ltp <= bu[4];
        let in_range_down = ltp >= be[4] && ltp <= be[0];
        let sideways = ltp > be[0] && ltp < bu[0];

        let trend = if ltp >= bu[0] {
            Trend::Up
        } else if ltp <= be[0] {
            Trend::Down
        } else {
            Trend::Sideways
        };

        let up_break_count = bu.iter().filter(|&&level| ltp >= level).count() as u8;
        let down_break_count = be.iter().filter(|&&level| ltp <= level).count() as u8;
        let confirmation = match trend {
            Trend::Up => up_break_count,
            Trend::Down => down_break_count,
            Trend::Sideways => 0,
        };

        let rr_to_bu5 = (bu[4] - ltp).max(0.0) / (ltp - bu[0]).max(RR_EPSILON);

        let prior = prev_state.get(&row.symbol).copied().unwrap_or_default();

        let volume_delta = match prior.prev_volume {
            Some(prev_vol) => (volume - prev_vol).max(0.0),
            None => 0.0,
        };
        let volume_accel = match prior.prev_vol_delta {
            Some(prev_delta) if prev_delta > 0.0 => volume_delta / prev_delta,
            _ => {
                if volume_delta > 0.0 {
                    1.0
                } else {
                    0.0
                }
            }
        };

        // BE5 retest window (spec §3.2).
        let mut be5_touch_ts = prior.be5_touch_ts;
        let mut be5_min_ltp = prior.be5_min_ltp;
        let mut be5_touch_volume = prior.be5_touch_volume;
        if ltp <= be[4] {
            be5_touch_ts = Some(now_ts);
            be5_min_ltp = Some(be5_min_ltp.map_or(ltp, |m| m.min(ltp)));
            be5_touch_volume = Some(volume);
        }
        let be5_touched_recent = match be5_touch_ts {
            Some(ts) => now_ts.saturating_sub(ts) <= params.jackpot_touch_lookback_sec,
            None => false,
        };
        if !be5_touched_recent {
            be5_touch_ts = None;
            be5_min_ltp = None;
            be5_touch_volume = None;
        }

        let just_crossed_up = matches!(prior.prev_ltp, Some(prev_ltp) if prev_ltp < bu[0]) && ltp >= bu[0];
        let jackpot_be5_reversal = be5_touched_recent
            && be5_min_ltp.is_some_and(|m| m <= be[4])
            && ltp >= bu[0]
            && (just_crossed_up || near_name == "BU1")
            && confirmation >= params.jackpot_min_confirmation
            && rr_to_bu5 >= params.jackpot_min_rr
            && volume_accel >= params.min_volume_accel;

        let jackpot_retest =
            trend == Trend::Up && near_name == "BU1" && near_pct.abs() <= JACKPOT_RETEST_PCT_BAND;
        let jackpot_short =
            trend == Trend::Down && near_name == "BE1" && near_pct.abs() <= JACKPOT_RETEST_PCT_BAND;

        let spike_flag = points > 0.0
            && prior
                .prev_ltp
                .is_some_and(|prev_ltp| (ltp - prev_ltp).abs() > points * params.max_spike_points_mult);

        let probability_score = {
            let conf_term = 45.0 * (confirmation as f64).min(5.0) / 5.0;
            let rr_term = 35.0 * rr_to_bu5.min(5.0) / 5.0;
            let vol_term = 15.0 * volume_accel.min(3.0) / 3.0;
            let retest_term = if be5_touched_recent { 5.0 } else { 0.0 };
            ((conf_term + rr_term + vol_term + retest_term).round() as i32).clamp(0, 100)
        };

        new_state.insert(
            row.symbol.clone(),
            SignalState {
                prev_ltp: Some(ltp),
                prev_volume: Some(volume),
                prev_vol_delta: Some(volume_delta),
                be5_touch_ts,
                be5_min_ltp,
                be5_touch_volume,
            },
        );

        all_rows.push(DerivedRow {
            symbol: row.symbol.clone(),
            tsym: row.tsym.clone(),
            exchange: row.exchange.clone(),
            ltp,
            volume,
            fetch_done: row.fetch_done,
            updated_at: row.updated_at.clone(),
            close,
            points,
            bu1: bu[0],
            bu2: bu[1],
            bu3: bu[2],
            bu4: bu[3],
            bu5: bu[4],
            be1: be[0],
            be2: be[1],
            be3: be[2],
            be4: be[3],
            be5: be[4],
            near_name,
            near_value,
            near_diff,
            near_pct,
            in_range_up,
            in_range_down,
            sideways,
            trend,
            up_break_count,
            down_break_count,
            confirmation,
            rr_to_bu5,
            volume_delta,
            volume_accel,
            be5_touched_recent,
            jackpot_be5_reversal,
            jackpot_retest,
            jackpot_short,
            spike_flag,
            probability_score,
            selected_factor: factor,
            factor_name: factor_name.to_string(),
            factor_reason: factor_reason.to_string(),
        });
    }

    all_rows.sort_by(|a, b| {
        a.symbol
            .cmp(&b.symbol)
            .then_with(|| a.tsym.cmp(&b.tsym))
    });

    let trigger_rows: Vec<DerivedRow> = all_rows
        .iter()
        .filter(|r| r.in_range_up && !r.sideways)
        .cloned()
        .collect();

    DerivedRowsResult {
        all_rows,
        trigger_rows,
        new_state,
    }
}

/// Rows that fail the numeric guard keep their existing signal state
/// entry unchanged rather than being dropped from the store (spec §4.2).
fn carry_forward(
    new_state: &mut HashMap<String, SignalState>,
    row: &BaseRow,
    prev_state: &HashMap<String, SignalState>,
) {
    if let Some(existing) = prev_state.get(&row.symbol) {
        new_state.insert(row.symbol.clone(), *existing);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use b5_schemas::FactorChoice;

    fn row(symbol: &str, ltp: f64, close: f64) -> BaseRow {
        BaseRow {
            symbol: symbol.to_string(),
            tsym: Some(symbol.to_string()),
            exchange: Some("NSE".to_string()),
            ltp: Some(ltp),
            volume: Some(1000.0),
            first_1m_close: Some(close),
            first_5m_close: Some(close),
            first_15m_close: Some(close),
            fetch_done: true,
            updated_at: Some("2026-03-05T10:00:00Z".to_string()),
            digit_analyses: None,
            selected_digit: None,
            selected_analysis: None,
            gamma_move: None,
            range_shifts: None,
            traderscope_ready: None,
        }
    }

    // Scenario S2 (spec §8.2): level ladder for close=100, factor=0.002611.
    #[test]
    fn scenario_s2_level_ladder() {
        let rows = vec![row("NSE|1", 100.0, 100.0)];
        let result = compute(
            &rows,
            Timeframe::M1,
            FactorChoice::Micro,
            0,
            LevelParams::default(),
            &HashMap::new(),
        );
        let r = &result.all_rows[0];
        assert!((r.points - 0.2611).abs() < 1e-9);
        assert!((r.bu1 - 100.2611).abs() < 1e-9);
        assert!((r.bu5 - 101.3055).abs() < 1e-9);
        assert!((r.be1 - 99.7389).abs() < 1e-9);
        assert!((r.be5 - 98.6945).abs() < 1e-9);
    }

    #[test]
    fn invariant_level_ladder_monotone() {
        let rows = vec![row("NSE|1", 103.0, 100.0)];
        let result = compute(
            &rows,
            Timeframe::M5,
            FactorChoice::Mini,
            0,
            LevelParams::default(),
            &HashMap::new(),
        );
        let r = &result.all_rows[0];
        assert!(r.be5 < r.be4);
        assert!(r.be4 < r.be3);
        assert!(r.be3 < r.be2);
        assert!(r.be2 < r.be1);
        assert!(r.be1 < r.close);
        assert!(r.close < r.bu1);
        assert!(r.bu1 < r.bu2);
        assert!(r.bu2 < r.bu3);
        assert!(r.bu3 < r.bu4);
        assert!(r.bu4 < r.bu5);
    }

    #[test]
    fn trend_partition_is_exhaustive_and_exclusive() {
        for ltp in [90.0, 100.0, 103.0, 110.0] {
            let rows = vec![row("NSE|1", ltp, 100.0)];
            let result = compute(
                &rows,
                Timeframe::M1,
                FactorChoice::Mini,
                0,
                LevelParams::default(),
                &HashMap::new(),
            );
            let r = &result.all_rows[0];
            match r.trend {
                Trend::Up => assert!(r.ltp >= r.bu1),
                Trend::Down => assert!(r.ltp <= r.be1),
                Trend::Sideways => assert!(r.ltp > r.be1 && r.ltp < r.bu1),
            }
        }
    }

    #[test]
    fn trigger_rows_are_subset_and_match_predicate() {
        let rows = vec![
            row("NSE|1", 100.0, 100.0),  // sideways -> not trigger
            row("NSE|2", 101.0, 100.0),  // up trend, likely in range
            row("NSE|3", 50.0, 100.0),   // deep down
        ];
        let result = compute(
            &rows,
            Timeframe::M1,
            FactorChoice::Mini,
            0,
            LevelParams::default(),
            &HashMap::new(),
        );
        for t in &result.trigger_rows {
            assert!(result.all_rows.iter().any(|a| a.symbol == t.symbol));
            assert!(t.in_range_up && !t.sideways);
        }
    }

    #[test]
    fn probability_score_is_bounded_integer() {
        let rows = vec![row("NSE|1", 110.0, 100.0)];
        let result = compute(
            &rows,
            Timeframe::M1,
            FactorChoice::Mini,
            0,
            LevelParams::default(),
            &HashMap::new(),
        );
        let r = &result.all_rows[0];
        assert!(r.probability_score >= 0 && r.probability_score <= 100);
    }

    #[test]
    fn missing_numerics_are_excluded_but_keep_signal_state() {
        let mut prev = HashMap::new();
        prev.insert(
            "NSE|1".to_string(),
            SignalState {
                prev_ltp: Some(99.0),
                ..Default::default()
            },
        );
        let mut r = row("NSE|1", 100.0, 100.0);
        r.ltp = None;
        let result = compute(
            &[r],
            Timeframe::M1,
            FactorChoice::Mini,
            0,
            LevelParams::default(),
            &prev,
        );
        assert!(result.all_rows.is_empty());
        assert_eq!(
            result.new_state.get("NSE|1").unwrap().prev_ltp,
            Some(99.0)
        );
    }

    #[test]
    fn signal_state_stability_across_versions() {
        let rows = vec![row("NSE|1", 101.0, 100.0)];
        let r1 = compute(
            &rows,
            Timeframe::M1,
            FactorChoice::Mini,
            0,
            LevelParams::default(),
            &HashMap::new(),
        );
        let ltp_v1 = r1.all_rows[0].ltp;

        let rows2 = vec![row("NSE|1", 102.0, 100.0)];
        let r2 = compute(
            &rows2,
            Timeframe::M1,
            FactorChoice::Mini,
            1,
            LevelParams::default(),
            &r1.new_state,
        );
        assert_eq!(r2.new_state.get("NSE|1").unwrap().prev_ltp, Some(102.0));
        // The prev_ltp consumed when computing V2's row must equal V1's ltp.
        assert_eq!(ltp_v1, 101.0);
    }

    // Scenario S5 (spec §8.2): spike rejection.
    #[test]
    fn scenario_s5_spike_detection() {
        let mut prev = HashMap::new();
        prev.insert(
            "NSE|1".to_string(),
            SignalState {
                prev_ltp: Some(100.0),
                ..Default::default()
            },
        );
        let rows = vec![row("NSE|1", 101.0, 100.0)];
        let params = LevelParams {
            max_spike_points_mult: 2.5,
            ..Default::default()
        };
        let result = compute(&rows, Timeframe::M1, FactorChoice::Micro, 10, params, &prev);
        let r = &result.all_rows[0];
        // points = 0.2611, threshold = 0.6528, jump = 1.00 -> spike.
        assert!(r.spike_flag);
    }

    #[test]
    fn determinism_same_inputs_same_outputs() {
        let rows = vec![row("NSE|1", 101.0, 100.0), row("NSE|2", 99.0, 100.0)];
        let r1 = compute(
            &rows,
            Timeframe::M1,
            FactorChoice::Smart,
            5,
            LevelParams::default(),
            &HashMap::new(),
        );
        let r2 = compute(
            &rows,
            Timeframe::M1,
            FactorChoice::Smart,
            5,
            LevelParams::default(),
            &HashMap::new(),
        );
        assert_eq!(r1.all_rows.len(), r2.all_rows.len());
        for (a, b) in r1.all_rows.iter().zip(r2.all_rows.iter()) {
            assert_eq!(a.symbol, b.symbol);
            assert_eq!(a.near_name, b.near_name);
            assert!((a.probability_score - b.probability_score).abs() == 0);
            assert!((a.bu1 - b.bu1).abs() < 1e-12);
        }
    }
}
