//! Management pass for one OPEN trade: running metrics, the trailing-stop
//! ladder, and exit evaluation (spec §4.5 step "Management pass").

use b5_schemas::PaperTrade;

use crate::types::CloseReason;

/// Mutates `trade`'s running metrics and trailing-stop fields in place, then
/// returns the close reason if an exit condition fired (first match wins).
/// `market_should_close` is the caller-evaluated `shouldAutoClose(exchange)`
/// result (spec §4.8); `spike_flag` is this tick's derived-row spike flag —
/// both are inputs rather than `PaperTrade` fields since they are live
/// derived-row concepts, not part of the persisted trade shape.
pub fn manage(
    trade: &mut PaperTrade,
    ltp: f64,
    spike_flag: bool,
    market_should_close: bool,
) -> Option<CloseReason> {
    trade.last_ltp = ltp;
    trade.max_ltp = trade.max_ltp.max(ltp);
    trade.min_ltp = trade.min_ltp.min(ltp);
    trade.runup = trade.runup.max(ltp - trade.entry_ltp);
    trade.drawdown = trade.drawdown.max(trade.entry_ltp - ltp);
    trade.max_profit_points = trade
        .max_profit_points
        .max(trade.max_ltp - trade.entry_ltp);
    trade.pnl = (ltp - trade.entry_ltp) * trade.quantity as f64;
    trade.pnl_pct = (ltp - trade.entry_ltp) / trade.entry_ltp * 100.0;

    // Trailing-stop ladder: activation and each rung are one-way (invariant 12).
    if !trade.tsl_active && ltp >= trade.tsl_trigger {
        trade.tsl_active = true;
        trade.tsl_sl_price = trade.tsl_sl_price.max(trade.be1);
    }
    if trade.tsl_active && ltp >= trade.bu4 && trade.tsl_sl_price < trade.bu1 {
        trade.tsl_sl_price = trade.bu1;
    }
    if trade.tsl_active && ltp >= trade.bu5 && trade.tsl_sl_price < trade.bu2 {
        trade.tsl_sl_price = trade.bu2;
    }

    if market_should_close {
        return Some(CloseReason::MarketCloseAuto);
    }
    if ltp >= trade.bu5 {
        return Some(CloseReason::TargetBu5);
    }
    let floor = if trade.tsl_active {
        trade.tsl_sl_price
    } else {
        trade.bu1
    };
    if ltp < floor {
        return Some(if trade.tsl_active {
            CloseReason::TrailingSl
        } else {
            CloseReason::SlBelowBu1
        });
    }
    if spike_flag && ltp < trade.entry_ltp {
        return Some(CloseReason::SpikeProtection);
    }

    None
}
