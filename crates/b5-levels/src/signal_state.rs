//! Signal State Store (spec §3.3/§4.4): per-(config, symbol) memory of the
//! prior tick, used to compute deltas and the BE5-retest window.

use std::collections::HashMap;
use std::sync::Mutex;

use b5_schemas::{FactorChoice, Timeframe};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConfigKey {
    pub timeframe: Timeframe,
    pub factor: FactorChoice,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SignalState {
    pub prev_ltp: Option<f64>,
    pub prev_volume: Option<f64>,
    pub prev_vol_delta: Option<f64>,
    pub be5_touch_ts: Option<i64>,
    pub be5_min_ltp: Option<f64>,
    pub be5_touch_volume: Option<f64>,
}

/// Holds one symbol map per (timeframe, factor) configuration.
///
/// Mutation is bound to the Derived-Row Engine: callers [`take`][Self::take]
/// the map for a config at the start of a recomputation, build a fresh map
/// from it (symbols absent from the new run are naturally evicted by simply
/// not being copied forward), and [`put`][Self::put] it back atomically.
#[derive(Default)]
pub struct SignalStateStore {
    inner: Mutex<HashMap<ConfigKey, HashMap<String, SignalState>>>,
}

impl SignalStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take(&self, key: ConfigKey) -> HashMap<String, SignalState> {
        self.inner
            .lock()
            .expect("signal state store poisoned")
            .remove(&key)
            .unwrap_or_default()
    }

    pub fn put(&self, key: ConfigKey, map: HashMap<String, SignalState>) {
        self.inner
            .lock()
            .expect("signal state store poisoned")
            .insert(key, map);
    }

    #[cfg(test)]
    pub fn peek(&self, key: ConfigKey, symbol: &str) -> Option<SignalState> {
        self.inner
            .lock()
            .unwrap()
            .get(&key)
            .and_then(|m| m.get(symbol))
            .copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn take_then_put_round_trips() {
        let store = SignalStateStore::new();
        let key = ConfigKey {
            timeframe: Timeframe::M5,
            factor: FactorChoice::Smart,
        };
        let mut map = store.take(key);
        assert!(map.is_empty());
        map.insert(
            "NSE|1".to_string(),
            SignalState {
                prev_ltp: Some(100.0),
                ..Default::default()
            },
        );
        store.put(key, map);

        assert_eq!(
            store.peek(key, "NSE|1").unwrap().prev_ltp,
            Some(100.0)
        );
    }

    #[test]
    fn symbols_not_rewritten_are_evicted() {
        let store = SignalStateStore::new();
        let key = ConfigKey {
            timeframe: Timeframe::M1,
            factor: FactorChoice::Micro,
        };
        let mut map = store.take(key);
        map.insert("A".to_string(), SignalState::default());
        map.insert("B".to_string(), SignalState::default());
        store.put(key, map);

        // Next run only sees symbol A.
        let old = store.take(key);
        let mut fresh = HashMap::new();
        if let Some(s) = old.get("A") {
            fresh.insert("A".to_string(), *s);
        }
        store.put(key, fresh);

        assert!(store.peek(key, "A").is_some());
        assert!(store.peek(key, "B").is_none());
    }
}
