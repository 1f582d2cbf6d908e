//! Paper Trading Engine (spec §4.5-§4.7): entry filter, management pass,
//! charge accounting, and the broker-limits governor. Pure and clock-free —
//! the daemon crate owns persistence, the snapshot-version gate, and IST
//! time, and drives one cycle of this engine per version change.

pub mod broker_limits;
pub mod charges;
pub mod cooldown;
pub mod engine;
pub mod entry;
pub mod management;
pub mod state_machine;
pub mod types;

pub use cooldown::CooldownTracker;
pub use engine::{attempt_entries, evaluate_broker_limits, manage_open_trades, now_iso, ClosedTrade};
pub use entry::{EntryContext, EntryPlan};
pub use state_machine::PaperTradeMachine;
pub use types::{CloseReason, EntryRejection, TradeEvent, TradeLifecycleState, TransitionError};
