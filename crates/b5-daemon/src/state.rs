//! Shared runtime state for b5-daemon.
//!
//! Handlers receive `State<Arc<AppState>>`; the periodic cycle task (see
//! `cycle.rs`) holds the same `Arc`. Every piece of mutable shared state is
//! either a crate-provided concurrency primitive (`DerivedCache`,
//! `SignalStateStore`, `CooldownTracker`) or a plain `Mutex`/pool, matching
//! the daemon's single-writer-over-shared-state model (spec §5).

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use sqlx::SqlitePool;

use b5_config::EngineConfig;
use b5_levels::{DerivedCache, SignalStateStore};
use b5_market::{Clock, SystemClock};
use b5_paper::CooldownTracker;
use b5_snapshot::{FirstCloseReader, SnapshotLoader};

#[derive(Clone)]
pub struct BuildInfo {
    pub service: &'static str,
    pub version: &'static str,
}

pub struct AppState {
    pub config: EngineConfig,
    pub build: BuildInfo,
    pub clock: Arc<dyn Clock>,

    pub snapshot_loader: SnapshotLoader,
    pub first_close: Option<FirstCloseReader>,
    pub db_pool: SqlitePool,

    pub derived_cache: DerivedCache,
    pub signal_state: SignalStateStore,
    pub cooldown: CooldownTracker,

    /// Distinct symbols observed across every snapshot seen this process
    /// lifetime — surfaced as the dashboard's "symbol cache size" stat.
    pub symbol_cache: Mutex<HashSet<String>>,
}

impl AppState {
    pub fn new(
        config: EngineConfig,
        db_pool: SqlitePool,
        first_close: Option<FirstCloseReader>,
    ) -> Self {
        let snapshot_loader = SnapshotLoader::new(config.snapshot_path.clone());
        Self {
            build: BuildInfo {
                service: "b5-daemon",
                version: env!("CARGO_PKG_VERSION"),
            },
            clock: Arc::new(SystemClock),
            snapshot_loader,
            first_close,
            db_pool,
            derived_cache: DerivedCache::new(),
            signal_state: SignalStateStore::new(),
            cooldown: CooldownTracker::new(),
            symbol_cache: Mutex::new(HashSet::new()),
            config,
        }
    }

    pub fn record_symbols<'a>(&self, symbols: impl Iterator<Item = &'a str>) {
        let mut cache = self.symbol_cache.lock().expect("symbol cache poisoned");
        for s in symbols {
            cache.insert(s.to_string());
        }
    }

    pub fn symbol_cache_size(&self) -> usize {
        self.symbol_cache.lock().expect("symbol cache poisoned").len()
    }
}
