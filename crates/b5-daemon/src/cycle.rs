//! Periodic paper-engine driver (spec §4.5 top paragraph, §5 scheduling
//! model): one task ticks every `PAPER_CYCLE_MS`, loads the snapshot, and
//! runs exactly one engine cycle only if the snapshot version advanced.
//! "Update opens, then consider entries" runs in that order every cycle
//! (spec §5 ordering guarantee).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use b5_schemas::DerivedRow;

use crate::compute::rows_for_config;
use crate::state::AppState;

pub fn spawn(state: Arc<AppState>) {
    let last_version = Arc::new(Mutex::new(i128::MIN));
    let interval = Duration::from_millis(state.config.paper_cycle_ms);

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        loop {
            ticker.tick().await;
            if let Err(e) = run_cycle(&state, &last_version).await {
                tracing::warn!(error = %e, "paper-engine cycle failed");
            }
        }
    });
}

async fn run_cycle(state: &AppState, last_version: &Mutex<i128>) -> anyhow::Result<()> {
    let (snapshot, version) = state.snapshot_loader.current();
    state.record_symbols(snapshot.rows.iter().map(|r| r.symbol.as_str()));

    if version == *last_version.lock().expect("last_version poisoned") {
        return Ok(());
    }

    let cfg = &state.config;
    let (all_rows, trigger_rows) = rows_for_config(state, &snapshot, version, cfg.paper_tf, cfg.paper_factor);

    let by_symbol: HashMap<&str, &DerivedRow> = all_rows.iter().map(|r| (r.symbol.as_str(), r)).collect();
    let now_utc = state.clock.now_utc();
    let now_ist = now_utc.with_timezone(&chrono_tz::Asia::Kolkata);
    let now_ts = now_utc.timestamp();
    let is_evening = b5_market::is_evening_session(now_ist.time());
    let day = snapshot.day.clone();
    let now_iso = now_utc.to_rfc3339();

    let mut counter = b5_db::load_broker_limits(&state.db_pool, &day).await?;

    let open_trades = b5_db::fetch_open_trades(&state.db_pool).await?;
    let (still_open, closed) = b5_paper::manage_open_trades(
        open_trades,
        |symbol| by_symbol.get(symbol).map(|r| (r.ltp, r.spike_flag)),
        |exchange| b5_market::should_auto_close(exchange, now_ist.time()),
        &now_iso,
    );

    for c in &closed {
        b5_db::update_trade(&state.db_pool, &c.trade).await?;
        state.cooldown.start(&c.trade.symbol, now_ts);
        counter.open_positions = (counter.open_positions - 1).max(0);
        tracing::info!(symbol = %c.trade.symbol, reason = c.reason.as_str(), "paper trade closed");
    }

    let open_trade_symbols: std::collections::HashSet<&str> =
        still_open.iter().map(|t| t.symbol.as_str()).collect();

    let broker_status = b5_paper::evaluate_broker_limits(&counter, cfg);
    let broker_safe = !b5_paper::broker_limits::blocks_entry(&broker_status);

    let opened = b5_paper::attempt_entries(
        &trigger_rows,
        cfg,
        &day,
        cfg.paper_tf.as_str(),
        |row| {
            let exchange_upper = row.exchange.as_deref().unwrap_or("").to_ascii_uppercase();
            let instrument_type = b5_market::detect_instrument_type(
                &exchange_upper,
                &row.tsym.as_deref().unwrap_or("").to_ascii_uppercase(),
            );
            b5_paper::EntryContext {
                has_open_trade: open_trade_symbols.contains(row.symbol.as_str()),
                cooldown_elapsed: state.cooldown.has_elapsed(&row.symbol, now_ts, cfg.paper_cooldown_sec),
                market_open: !b5_market::should_auto_close(&exchange_upper, now_ist.time()),
                broker_safe,
                is_mcx_evening_session: is_evening
                    && instrument_type == b5_schemas::InstrumentType::Commodity,
            }
        },
        &now_iso,
    );

    for t in &opened {
        b5_db::insert_trade(&state.db_pool, t).await?;
        counter.orders_placed += 1;
        counter.open_positions += 1;
        tracing::info!(symbol = %t.symbol, entry_ltp = t.entry_ltp, "paper trade opened");
    }

    counter.margin_used = still_open
        .iter()
        .chain(opened.iter())
        .map(|t| t.entry_ltp * t.quantity as f64)
        .sum();
    counter.day = day;
    counter.updated_at = now_iso;
    b5_db::save_broker_limits(&state.db_pool, &counter).await?;

    *last_version.lock().expect("last_version poisoned") = version;
    Ok(())
}
