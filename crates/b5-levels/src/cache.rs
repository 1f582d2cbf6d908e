//! Config-Keyed Derived Cache (spec §4.3): caches the Derived-Row Engine's
//! output per (timeframe, factor), invalidating the whole cache whenever the
//! snapshot version advances.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use b5_schemas::{DerivedRow, FactorChoice, Timeframe};

type SnapshotVersion = i128;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    timeframe: Timeframe,
    factor: FactorChoice,
}

#[derive(Clone)]
struct Entry {
    all_rows: Arc<Vec<DerivedRow>>,
    trigger_rows: Arc<Vec<DerivedRow>>,
}

struct Inner {
    version: SnapshotVersion,
    entries: HashMap<CacheKey, Entry>,
}

/// Single-writer, many-reader cache of per-config derived rows.
///
/// `get_or_compute` holds the lock across the supplied compute closure: the
/// computation is CPU-bound (no I/O), so this does not violate the "never
/// hold a lock across I/O" concurrency rule (spec §5) while still giving a
/// single consistent view of one config's rows to racing callers.
pub struct DerivedCache {
    inner: Mutex<Inner>,
}

impl Default for DerivedCache {
    fn default() -> Self {
        Self {
            inner: Mutex::new(Inner {
                version: i128::MIN,
                entries: HashMap::new(),
            }),
        }
    }
}

impl DerivedCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the cached rows for `(timeframe, factor)` at `version`,
    /// computing and storing them via `compute` on a miss. Any call
    /// observing a `version` different from the cache's current version
    /// purges every entry before computing (the whole cache is versioned
    /// together, not per-key, since one snapshot update invalidates all
    /// configs at once).
    pub fn get_or_compute<F>(
        &self,
        timeframe: Timeframe,
        factor: FactorChoice,
        version: SnapshotVersion,
        compute: F,
    ) -> (Arc<Vec<DerivedRow>>, Arc<Vec<DerivedRow>>)
    where
        F: FnOnce() -> (Vec<DerivedRow>, Vec<DerivedRow>),
    {
        let key = CacheKey { timeframe, factor };
        let mut guard = self.inner.lock().expect("derived cache poisoned");

        if guard.version != version {
            guard.entries.clear();
            guard.version = version;
        }

        if let Some(entry) = guard.entries.get(&key) {
            return (entry.all_rows.clone(), entry.trigger_rows.clone());
        }

        let (all_rows, trigger_rows) = compute();
        let entry = Entry {
            all_rows: Arc::new(all_rows),
            trigger_rows: Arc::new(trigger_rows),
        };
        guard.entries.insert(key, entry.clone());
        (entry.all_rows, entry.trigger_rows)
    }

    #[cfg(test)]
    fn entry_count(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn row(symbol: &str) -> DerivedRow {
        DerivedRow {
            symbol: symbol.to_string(),
            tsym: None,
            exchange: None,
            ltp: 100.0,
            volume: 0.0,
            fetch_done: true,
            updated_at: None,
            close: 100.0,
            points: 0.0,
            bu1: 0.0,
            bu2: 0.0,
            bu3: 0.0,
            bu4: 0.0,
            bu5: 0.0,
            be1: 0.0,
            be2: 0.0,
            be3: 0.0,
            be4: 0.0,
            be5: 0.0,
            near_name: "BU1".to_string(),
            near_value: 0.0,
            near_diff: 0.0,
            near_pct: 0.0,
            in_range_up: false,
            in_range_down: false,
            sideways: true,
            trend: b5_schemas::Trend::Sideways,
            up_break_count: 0,
            down_break_count: 0,
            confirmation: 0,
            rr_to_bu5: 0.0,
            volume_delta: 0.0,
            volume_accel: 0.0,
            be5_touched_recent: false,
            jackpot_be5_reversal: false,
            jackpot_retest: false,
            jackpot_short: false,
            spike_flag: false,
            probability_score: 0,
            selected_factor: 0.0,
            factor_name: String::new(),
            factor_reason: String::new(),
        }
    }

    #[test]
    fn cache_hit_same_config_same_version() {
        let cache = DerivedCache::new();
        let calls = AtomicUsize::new(0);
        let compute = || {
            calls.fetch_add(1, Ordering::SeqCst);
            (vec![row("A")], vec![])
        };
        let _ = cache.get_or_compute(Timeframe::M1, FactorChoice::Smart, 1, compute);
        let _ = cache.get_or_compute(Timeframe::M1, FactorChoice::Smart, 1, compute);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn version_bump_purges_all_entries() {
        let cache = DerivedCache::new();
        let _ = cache.get_or_compute(Timeframe::M1, FactorChoice::Smart, 1, || {
            (vec![row("A")], vec![])
        });
        let _ = cache.get_or_compute(Timeframe::M5, FactorChoice::Mini, 1, || {
            (vec![row("B")], vec![])
        });
        assert_eq!(cache.entry_count(), 2);

        let _ = cache.get_or_compute(Timeframe::M1, FactorChoice::Smart, 2, || {
            (vec![row("A2")], vec![])
        });
        // The other config's entry was purged by the version bump, not lazily.
        assert_eq!(cache.entry_count(), 1);
    }

    #[test]
    fn distinct_configs_do_not_collide() {
        let cache = DerivedCache::new();
        let (a, _) = cache.get_or_compute(Timeframe::M1, FactorChoice::Micro, 1, || {
            (vec![row("A")], vec![])
        });
        let (b, _) = cache.get_or_compute(Timeframe::M1, FactorChoice::Mini, 1, || {
            (vec![row("B")], vec![])
        });
        assert_eq!(a[0].symbol, "A");
        assert_eq!(b[0].symbol, "B");
    }
}
