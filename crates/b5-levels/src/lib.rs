//! Derived-row analytics: Smart Factor Selector, Derived-Row Engine, Signal
//! State Store, and the Config-Keyed Derived Cache (spec §4.1-§4.4).

pub mod cache;
pub mod engine;
pub mod factor;
pub mod signal_state;

pub use cache::DerivedCache;
pub use engine::{compute, DerivedRowsResult, LevelParams};
pub use factor::resolve_factor;
pub use signal_state::{ConfigKey, SignalState, SignalStateStore};
