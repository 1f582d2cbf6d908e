//! Orchestration for one paper-engine cycle (spec §4.5 top paragraph): the
//! engine no-ops unless the snapshot version has advanced since its last
//! run. This module is pure — no DB, no clock — callers (the daemon) own
//! persistence and wall-clock time, and drive a cycle only on a version
//! change.

use b5_schemas::{BrokerLimitsStatus, DerivedRow, InstrumentType, PaperTrade, Trend};
use chrono::Utc;
use uuid::Uuid;

use crate::broker_limits;
use crate::charges;
use crate::entry::{self, EntryContext};
use crate::management;
use crate::state_machine::PaperTradeMachine;
use crate::types::{CloseReason, TradeEvent};
use b5_config::EngineConfig;

/// A trade that exited this cycle, with its terminal fields already set.
pub struct ClosedTrade {
    pub trade: PaperTrade,
    pub reason: CloseReason,
}

/// Management pass over every currently-OPEN trade (spec §4.5 "Management
/// pass"). `ltp_lookup` resolves a symbol to `(ltp, spike_flag)` from the
/// current derived rows; a symbol absent from the current snapshot is left
/// untouched (its last known ltp stands, per the numeric-guard skip rule).
pub fn manage_open_trades<F, G>(
    open_trades: Vec<PaperTrade>,
    ltp_lookup: F,
    market_should_close: G,
    now_iso: &str,
) -> (Vec<PaperTrade>, Vec<ClosedTrade>)
where
    F: Fn(&str) -> Option<(f64, bool)>,
    G: Fn(&str) -> bool,
{
    let mut still_open = Vec::with_capacity(open_trades.len());
    let mut closed = Vec::new();

    for mut trade in open_trades {
        let Some((ltp, spike_flag)) = ltp_lookup(&trade.symbol) else {
            still_open.push(trade);
            continue;
        };

        let exchange = trade.exchange.clone().unwrap_or_default();
        let should_close = market_should_close(&exchange);

        match management::manage(&mut trade, ltp, spike_flag, should_close) {
            None => still_open.push(trade),
            Some(reason) => {
                let mut machine = PaperTradeMachine::new();
                machine
                    .apply(TradeEvent::Close(reason))
                    .expect("OPEN -> CLOSED is always legal from a live trade");

                let c = charges::compute(trade.entry_ltp, ltp, trade.quantity, &exchange);
                trade.exit_ltp = Some(ltp);
                trade.exit_ts = Some(now_iso.to_string());
                trade.reason = Some(reason.as_str().to_string());
                trade.pnl = (ltp - trade.entry_ltp) * trade.quantity as f64;
                trade.pnl_pct = (ltp - trade.entry_ltp) / trade.entry_ltp * 100.0;
                trade.brokerage = c.brokerage;
                trade.stt = c.stt;
                trade.exchange_charges = c.exchange_charges;
                trade.sebi_charges = c.sebi_charges;
                trade.stamp_duty = c.stamp_duty;
                trade.gst = c.gst;
                trade.total_charges = c.total_charges;
                trade.net_pnl = trade.pnl - c.total_charges;
                trade.status = "CLOSED".to_string();
                trade.updated_at = now_iso.to_string();

                closed.push(ClosedTrade { trade, reason });
            }
        }
    }

    (still_open, closed)
}

/// Attempt entry on every trigger row not already filtered out by the
/// caller's per-symbol state (open-trade/cooldown/broker-limits/market
/// checks, supplied via `ctx_for`). Returns newly OPENed trades; rejections
/// are intentionally not returned (spec §7: "rejection reason is implicit
/// and not surfaced via an API"), only logged at debug level by the caller.
pub fn attempt_entries<F>(
    trigger_rows: &[DerivedRow],
    cfg: &EngineConfig,
    day: &str,
    timeframe: &str,
    ctx_for: F,
    now_iso: &str,
) -> Vec<PaperTrade>
where
    F: Fn(&DerivedRow) -> EntryContext,
{
    let mut opened = Vec::new();

    for row in trigger_rows {
        if row.trend != Trend::Up {
            continue;
        }
        let exchange_upper = row.exchange.as_deref().unwrap_or("").to_ascii_uppercase();
        let tsym_upper = row.tsym.as_deref().unwrap_or("").to_ascii_uppercase();
        let instrument_type = b5_market::detect_instrument_type(&exchange_upper, &tsym_upper);

        let ctx = ctx_for(row);
        let plan = match entry::evaluate(row, instrument_type, cfg, &ctx) {
            Ok(plan) => plan,
            Err(_rejection) => continue,
        };

        opened.push(PaperTrade {
            id: Uuid::new_v4().to_string(),
            symbol: row.symbol.clone(),
            tsym: row.tsym.clone(),
            exchange: row.exchange.clone(),
            day: day.to_string(),
            timeframe: timeframe.to_string(),
            factor: row.factor_name.clone(),
            instrument_type: instrument_type_str(instrument_type).to_string(),
            close_price: row.close,
            points: row.points,
            bu1: row.bu1,
            bu2: row.bu2,
            bu3: row.bu3,
            bu4: row.bu4,
            bu5: row.bu5,
            be1: row.be1,
            be2: row.be2,
            be3: row.be3,
            be4: row.be4,
            be5: row.be5,
            sl_price: plan.sl_price,
            tp_price: plan.tp_price,
            tsl_trigger: plan.tsl_trigger,
            tsl_active: plan.tsl_active,
            tsl_sl_price: plan.tsl_sl_price,
            entry_ltp: row.ltp,
            entry_ts: now_iso.to_string(),
            exit_ltp: None,
            exit_ts: None,
            quantity: plan.quantity,
            reason: Some(plan.reason.to_string()),
            last_ltp: row.ltp,
            max_ltp: row.ltp,
            min_ltp: row.ltp,
            runup: 0.0,
            drawdown: 0.0,
            max_profit_points: 0.0,
            pnl: 0.0,
            pnl_pct: 0.0,
            brokerage: 0.0,
            stt: 0.0,
            exchange_charges: 0.0,
            sebi_charges: 0.0,
            stamp_duty: 0.0,
            gst: 0.0,
            total_charges: 0.0,
            net_pnl: 0.0,
            status: "OPEN".to_string(),
            updated_at: now_iso.to_string(),
        });
    }

    opened
}

fn instrument_type_str(t: InstrumentType) -> &'static str {
    match t {
        InstrumentType::Equity => "equity",
        InstrumentType::Index => "index",
        InstrumentType::Option => "option",
        InstrumentType::Future => "future",
        InstrumentType::Commodity => "commodity",
    }
}

pub fn evaluate_broker_limits(
    counter: &b5_schemas::BrokerLimitsCounter,
    cfg: &EngineConfig,
) -> BrokerLimitsStatus {
    broker_limits::evaluate(
        counter,
        cfg.max_orders_per_day,
        cfg.max_open_positions,
        cfg.max_margin_used_pct,
    )
}

pub fn now_iso() -> String {
    Utc::now().to_rfc3339()
}
