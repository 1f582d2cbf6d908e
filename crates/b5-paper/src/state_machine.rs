//! Explicit state machine for one paper trade (spec §4.5): `OPEN -> CLOSED`
//! is the only legal transition; everything else is rejected. Terminality
//! (invariant 9) falls directly out of `do_transition` never matching a
//! `Closed` state.

use crate::types::{CloseReason, TradeEvent, TradeLifecycleState, TransitionError};

#[derive(Debug, Clone, Copy)]
pub struct PaperTradeMachine {
    pub state: TradeLifecycleState,
    pub close_reason: Option<CloseReason>,
}

impl PaperTradeMachine {
    pub fn new() -> Self {
        Self {
            state: TradeLifecycleState::Open,
            close_reason: None,
        }
    }

    pub fn apply(&mut self, event: TradeEvent) -> Result<(), TransitionError> {
        use TradeEvent::*;
        use TradeLifecycleState::*;

        match (self.state, event) {
            (Open, Manage) => {}
            (Open, Close(reason)) => {
                self.state = Closed;
                self.close_reason = Some(reason);
            }
            (state, ev) => {
                return Err(TransitionError {
                    from: state,
                    event: format!("{ev:?}"),
                });
            }
        }
        Ok(())
    }
}

impl Default for PaperTradeMachine {
    fn default() -> Self {
        Self::new()
    }
}
