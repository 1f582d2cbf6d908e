//! Paper trade lifecycle types (spec §4.5): states, events, and the error
//! returned for an illegal transition.

/// All states a paper trade can occupy. `NONE` (no trade exists) is the
/// absence of a [`crate::state_machine::PaperTradeMachine`] rather than a
/// variant of this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TradeLifecycleState {
    Open,
    Closed,
}

impl TradeLifecycleState {
    pub fn is_terminal(self) -> bool {
        matches!(self, TradeLifecycleState::Closed)
    }
}

/// Why a trade was closed (spec §4.5 step 3, §8.2 S4/S5/S6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    MarketCloseAuto,
    TargetBu5,
    TrailingSl,
    SlBelowBu1,
    SpikeProtection,
}

impl CloseReason {
    pub fn as_str(self) -> &'static str {
        match self {
            CloseReason::MarketCloseAuto => "market_close_auto",
            CloseReason::TargetBu5 => "target_bu5",
            CloseReason::TrailingSl => "trailing_sl",
            CloseReason::SlBelowBu1 => "sl_below_bu1",
            CloseReason::SpikeProtection => "spike_protection",
        }
    }
}

/// Why an entry attempt was rejected (spec §7: "rejection reason is implicit
/// and not surfaced via an API" — kept internal, logged at debug level only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryRejection {
    AlreadyOpen,
    Cooldown,
    NumericGuardFailed,
    NotTrendingUp,
    ConfirmationTooLow,
    RrTooLow,
    ProbabilityTooLow,
    Spike,
    NotJackpot,
    MarketClosed,
    BrokerLimitsRed,
    OutsideBu1Bu5,
    MissingLevels,
}

/// Lifecycle events driving [`crate::state_machine::PaperTradeMachine`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TradeEvent {
    /// A management pass observed the trade still qualifies to stay open.
    Manage,
    /// Exit evaluation matched a close condition.
    Close(CloseReason),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub from: TradeLifecycleState,
    pub event: String,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "illegal paper-trade transition: {:?} + {}", self.from, self.event)
    }
}

impl std::error::Error for TransitionError {}
