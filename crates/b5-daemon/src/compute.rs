//! Bridges `AppState`'s shared cache/signal-state primitives to one
//! `b5_levels::compute` call per (snapshot version, timeframe, factor).
//! Shared by the periodic cycle task and the dashboard view handler, since
//! both need "the current derived rows for some config" and neither should
//! recompute when the cache already has them.

use std::sync::Arc;

use b5_levels::ConfigKey;
use b5_schemas::{DerivedRow, FactorChoice, Snapshot, Timeframe};

use crate::state::AppState;

pub type SnapshotVersion = i128;

pub fn rows_for_config(
    state: &AppState,
    snapshot: &Snapshot,
    version: SnapshotVersion,
    tf: Timeframe,
    factor: FactorChoice,
) -> (Arc<Vec<DerivedRow>>, Arc<Vec<DerivedRow>>) {
    let cfg = &state.config;
    let key = ConfigKey { timeframe: tf, factor };
    let now_ts = state.clock.now_utc().timestamp();
    let params = b5_levels::LevelParams {
        jackpot_touch_lookback_sec: cfg.jackpot_touch_lookback_sec,
        jackpot_min_confirmation: cfg.jackpot_min_confirmation,
        jackpot_min_rr: cfg.jackpot_min_rr,
        min_volume_accel: cfg.min_volume_accel,
        max_spike_points_mult: cfg.max_spike_points_mult,
    };

    state.derived_cache.get_or_compute(tf, factor, version, || {
        let prev_state = state.signal_state.take(key);
        let result = b5_levels::compute(&snapshot.rows, tf, factor, now_ts, params, &prev_state);
        state.signal_state.put(key, result.new_state);
        (result.all_rows, result.trigger_rows)
    })
}
