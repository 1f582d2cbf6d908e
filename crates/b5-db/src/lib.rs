//! Persistent store for this engine's own state: paper trades and the
//! broker-limits daily counter (spec §3.4/§3.5/§6.3).
//!
//! One canonical schema, applied via embedded `sqlx::migrate!` at startup —
//! no runtime column-drift detection against the live file.

use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use b5_schemas::{BrokerLimitsCounter, PaperTrade, TradeStatus};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Row, SqlitePool};

pub async fn connect(path: impl AsRef<Path>) -> Result<SqlitePool> {
    let display = path.as_ref().display().to_string();
    let is_memory = display == ":memory:";

    let opts = SqliteConnectOptions::from_str(&format!("sqlite://{display}"))
        .context("invalid sqlite path")?
        .create_if_missing(true);

    // A single pooled connection per in-memory database: SQLite hands every
    // new connection its own empty `:memory:` database, so pooling more than
    // one connection would silently fragment test state across connections.
    let max_connections = if is_memory { 1 } else { 8 };

    let pool = SqlitePoolOptions::new()
        .max_connections(max_connections)
        .connect_with(opts)
        .await
        .context("failed to connect to paper-trade store")?;

    Ok(pool)
}

pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("paper-trade db migrate failed")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Paper trades
// ---------------------------------------------------------------------------

pub async fn insert_trade(pool: &SqlitePool, t: &PaperTrade) -> Result<()> {
    sqlx::query(
        r#"
        insert into paper_trades (
            id, symbol, tsym, exchange, day, timeframe, factor, instrument_type,
            close_price, points, bu1, bu2, bu3, bu4, bu5, be1, be2, be3, be4, be5,
            sl_price, tp_price, tsl_trigger, tsl_active, tsl_sl_price,
            entry_ltp, entry_ts, exit_ltp, exit_ts, quantity, reason,
            last_ltp, max_ltp, min_ltp, runup, drawdown, max_profit_points,
            pnl, pnl_pct, brokerage, stt, exchange_charges, sebi_charges,
            stamp_duty, gst, total_charges, net_pnl, status, updated_at
        ) values (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
            ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19, ?20,
            ?21, ?22, ?23, ?24, ?25,
            ?26, ?27, ?28, ?29, ?30, ?31,
            ?32, ?33, ?34, ?35, ?36, ?37,
            ?38, ?39, ?40, ?41, ?42, ?43,
            ?44, ?45, ?46, ?47, ?48, ?49
        )
        "#,
    )
    .bind(&t.id)
    .bind(&t.symbol)
    .bind(&t.tsym)
    .bind(&t.exchange)
    .bind(&t.day)
    .bind(&t.timeframe)
    .bind(&t.factor)
    .bind(&t.instrument_type)
    .bind(t.close_price)
    .bind(t.points)
    .bind(t.bu1)
    .bind(t.bu2)
    .bind(t.bu3)
    .bind(t.bu4)
    .bind(t.bu5)
    .bind(t.be1)
    .bind(t.be2)
    .bind(t.be3)
    .bind(t.be4)
    .bind(t.be5)
    .bind(t.sl_price)
    .bind(t.tp_price)
    .bind(t.tsl_trigger)
    .bind(t.tsl_active)
    .bind(t.tsl_sl_price)
    .bind(t.entry_ltp)
    .bind(&t.entry_ts)
    .bind(t.exit_ltp)
    .bind(&t.exit_ts)
    .bind(t.quantity)
    .bind(&t.reason)
    .bind(t.last_ltp)
    .bind(t.max_ltp)
    .bind(t.min_ltp)
    .bind(t.runup)
    .bind(t.drawdown)
    .bind(t.max_profit_points)
    .bind(t.pnl)
    .bind(t.pnl_pct)
    .bind(t.brokerage)
    .bind(t.stt)
    .bind(t.exchange_charges)
    .bind(t.sebi_charges)
    .bind(t.stamp_duty)
    .bind(t.gst)
    .bind(t.total_charges)
    .bind(t.net_pnl)
    .bind(&t.status)
    .bind(&t.updated_at)
    .execute(pool)
    .await
    .context("insert_trade failed")?;

    Ok(())
}

/// Overwrite every mutable field of an existing trade (management/exit
/// passes only ever update a trade that was already inserted).
pub async fn update_trade(pool: &SqlitePool, t: &PaperTrade) -> Result<()> {
    sqlx::query(
        r#"
        update paper_trades set
            tsl_trigger = ?1, tsl_active = ?2, tsl_sl_price = ?3,
            exit_ltp = ?4, exit_ts = ?5, reason = ?6,
            last_ltp = ?7, max_ltp = ?8, min_ltp = ?9, runup = ?10,
            drawdown = ?11, max_profit_points = ?12,
            pnl = ?13, pnl_pct = ?14, brokerage = ?15, stt = ?16,
            exchange_charges = ?17, sebi_charges = ?18, stamp_duty = ?19,
            gst = ?20, total_charges = ?21, net_pnl = ?22,
            status = ?23, updated_at = ?24
        where id = ?25
        "#,
    )
    .bind(t.tsl_trigger)
    .bind(t.tsl_active)
    .bind(t.tsl_sl_price)
    .bind(t.exit_ltp)
    .bind(&t.exit_ts)
    .bind(&t.reason)
    .bind(t.last_ltp)
    .bind(t.max_ltp)
    .bind(t.min_ltp)
    .bind(t.runup)
    .bind(t.drawdown)
    .bind(t.max_profit_points)
    .bind(t.pnl)
    .bind(t.pnl_pct)
    .bind(t.brokerage)
    .bind(t.stt)
    .bind(t.exchange_charges)
    .bind(t.sebi_charges)
    .bind(t.stamp_duty)
    .bind(t.gst)
    .bind(t.total_charges)
    .bind(t.net_pnl)
    .bind(&t.status)
    .bind(&t.updated_at)
    .bind(&t.id)
    .execute(pool)
    .await
    .context("update_trade failed")?;

    Ok(())
}

pub async fn fetch_open_trades(pool: &SqlitePool) -> Result<Vec<PaperTrade>> {
    let rows = sqlx::query("select * from paper_trades where status = ?1 order by entry_ts asc")
        .bind(TradeStatus::Open.as_str())
        .fetch_all(pool)
        .await
        .context("fetch_open_trades failed")?;

    rows.iter().map(row_to_trade).collect()
}

pub async fn fetch_trades_for_day(
    pool: &SqlitePool,
    day: &str,
    status: Option<TradeStatus>,
    limit: i64,
) -> Result<Vec<PaperTrade>> {
    let rows = match status {
        Some(s) => {
            sqlx::query(
                "select * from paper_trades where day = ?1 and status = ?2 \
                 order by entry_ts desc limit ?3",
            )
            .bind(day)
            .bind(s.as_str())
            .bind(limit)
            .fetch_all(pool)
            .await
        }
        None => {
            sqlx::query("select * from paper_trades where day = ?1 order by entry_ts desc limit ?2")
                .bind(day)
                .bind(limit)
                .fetch_all(pool)
                .await
        }
    }
    .context("fetch_trades_for_day failed")?;

    rows.iter().map(row_to_trade).collect()
}

fn row_to_trade(row: &sqlx::sqlite::SqliteRow) -> Result<PaperTrade> {
    Ok(PaperTrade {
        id: row.try_get("id")?,
        symbol: row.try_get("symbol")?,
        tsym: row.try_get("tsym")?,
        exchange: row.try_get("exchange")?,
        day: row.try_get("day")?,
        timeframe: row.try_get("timeframe")?,
        factor: row.try_get("factor")?,
        instrument_type: row.try_get("instrument_type")?,
        close_price: row.try_get("close_price")?,
        points: row.try_get("points")?,
        bu1: row.try_get("bu1")?,
        bu2: row.try_get("bu2")?,
        bu3: row.try_get("bu3")?,
        bu4: row.try_get("bu4")?,
        bu5: row.try_get("bu5")?,
        be1: row.try_get("be1")?,
        be2: row.try_get("be2")?,
        be3: row.try_get("be3")?,
        be4: row.try_get("be4")?,
        be5: row.try_get("be5")?,
        sl_price: row.try_get("sl_price")?,
        tp_price: row.try_get("tp_price")?,
        tsl_trigger: row.try_get("tsl_trigger")?,
        tsl_active: row.try_get("tsl_active")?,
        tsl_sl_price: row.try_get("tsl_sl_price")?,
        entry_ltp: row.try_get("entry_ltp")?,
        entry_ts: row.try_get("entry_ts")?,
        exit_ltp: row.try_get("exit_ltp")?,
        exit_ts: row.try_get("exit_ts")?,
        quantity: row.try_get("quantity")?,
        reason: row.try_get("reason")?,
        last_ltp: row.try_get("last_ltp")?,
        max_ltp: row.try_get("max_ltp")?,
        min_ltp: row.try_get("min_ltp")?,
        runup: row.try_get("runup")?,
        drawdown: row.try_get("drawdown")?,
        max_profit_points: row.try_get("max_profit_points")?,
        pnl: row.try_get("pnl")?,
        pnl_pct: row.try_get("pnl_pct")?,
        brokerage: row.try_get("brokerage")?,
        stt: row.try_get("stt")?,
        exchange_charges: row.try_get("exchange_charges")?,
        sebi_charges: row.try_get("sebi_charges")?,
        stamp_duty: row.try_get("stamp_duty")?,
        gst: row.try_get("gst")?,
        total_charges: row.try_get("total_charges")?,
        net_pnl: row.try_get("net_pnl")?,
        status: row.try_get("status")?,
        updated_at: row.try_get("updated_at")?,
    })
}

// ---------------------------------------------------------------------------
// Broker limits counter (spec §4.7)
// ---------------------------------------------------------------------------

pub async fn load_broker_limits(pool: &SqlitePool, day: &str) -> Result<BrokerLimitsCounter> {
    let row = sqlx::query("select * from broker_limits where day = ?1")
        .bind(day)
        .fetch_optional(pool)
        .await
        .context("load_broker_limits failed")?;

    Ok(match row {
        Some(row) => BrokerLimitsCounter {
            day: row.try_get("day")?,
            orders_placed: row.try_get("orders_placed")?,
            open_positions: row.try_get("open_positions")?,
            margin_used: row.try_get("margin_used")?,
            updated_at: row.try_get("updated_at")?,
        },
        None => BrokerLimitsCounter {
            day: day.to_string(),
            orders_placed: 0,
            open_positions: 0,
            margin_used: 0.0,
            updated_at: String::new(),
        },
    })
}

pub async fn save_broker_limits(pool: &SqlitePool, counter: &BrokerLimitsCounter) -> Result<()> {
    sqlx::query(
        r#"
        insert into broker_limits (day, orders_placed, open_positions, margin_used, updated_at)
        values (?1, ?2, ?3, ?4, ?5)
        on conflict(day) do update set
            orders_placed = excluded.orders_placed,
            open_positions = excluded.open_positions,
            margin_used = excluded.margin_used,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&counter.day)
    .bind(counter.orders_placed)
    .bind(counter.open_positions)
    .bind(counter.margin_used)
    .bind(&counter.updated_at)
    .execute(pool)
    .await
    .context("save_broker_limits failed")?;

    Ok(())
}
