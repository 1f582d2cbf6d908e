//! Per-symbol cooldown window after a trade closes (spec §4.5 step 1, §8.1
//! invariant 11): blocks re-entry until `PAPER_COOLDOWN_SEC` has elapsed.

use std::collections::HashMap;
use std::sync::Mutex;

#[derive(Default)]
pub struct CooldownTracker {
    last_close_ts: Mutex<HashMap<String, i64>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&self, symbol: &str, closed_at_ts: i64) {
        self.last_close_ts
            .lock()
            .expect("cooldown tracker poisoned")
            .insert(symbol.to_string(), closed_at_ts);
    }

    /// `true` iff `symbol` has no recorded close, or the cooldown window has
    /// fully elapsed as of `now_ts`.
    pub fn has_elapsed(&self, symbol: &str, now_ts: i64, cooldown_sec: u64) -> bool {
        match self
            .last_close_ts
            .lock()
            .expect("cooldown tracker poisoned")
            .get(symbol)
        {
            Some(&closed_at) => now_ts.saturating_sub(closed_at) >= cooldown_sec as i64,
            None => true,
        }
    }
}
