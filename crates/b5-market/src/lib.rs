//! Market-time and exchange policies (spec §4.8): an IST-aware clock plus
//! per-exchange close-time thresholds used both to block new entries and to
//! force-close open paper trades at end of session.

use chrono::{DateTime, NaiveTime, Timelike, Utc};
use chrono_tz::Asia::Kolkata;
use chrono_tz::Tz;

// ---------------------------------------------------------------------------
// Clock
// ---------------------------------------------------------------------------

/// Injectable wall clock. Production uses [`SystemClock`]; tests use
/// [`FixedClock`] so market-time boundary behavior is deterministic.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;

    fn now_ist(&self) -> DateTime<Tz> {
        self.now_utc().with_timezone(&Kolkata)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now_utc(&self) -> DateTime<Utc> {
        self.0
    }
}

// ---------------------------------------------------------------------------
// Exchange close-time table
// ---------------------------------------------------------------------------

/// IST time-of-day at which an exchange's session is treated as closed for
/// new entries and as a forced-close trigger for open positions.
pub fn close_threshold(exchange: &str) -> Option<NaiveTime> {
    match exchange.to_ascii_uppercase().as_str() {
        "NSE" | "BSE" | "NFO" | "BFO" => NaiveTime::from_hms_opt(15, 28, 30),
        "MCX" => NaiveTime::from_hms_opt(23, 30, 0),
        _ => None,
    }
}

/// `true` iff the current IST time-of-day is at or past the exchange's close
/// threshold. Unknown exchanges never auto-close (no threshold configured).
pub fn should_auto_close(exchange: &str, now_ist_time: NaiveTime) -> bool {
    match close_threshold(exchange) {
        Some(threshold) => now_ist_time >= threshold,
        None => false,
    }
}

/// `true` iff the IST hour-of-day is >= 17 (used to relax the MCX evening
/// probability-score threshold, spec §4.5 step 5).
pub fn is_evening_session(now_ist_time: NaiveTime) -> bool {
    now_ist_time.hour() >= 17
}

// ---------------------------------------------------------------------------
// Instrument-type detection (spec §4.1 classes, reused by §3.4's instrument_type)
// ---------------------------------------------------------------------------

use b5_schemas::InstrumentType;

const INDEX_NAMES: [&str; 4] = ["NIFTY", "BANKNIFTY", "FINNIFTY", "SENSEX"];

/// Detect instrument class from uppercased exchange + tradingsymbol, per the
/// class rules shared with the Smart Factor Selector (spec §4.1 step 2).
pub fn detect_instrument_type(exchange_upper: &str, tsym_upper: &str) -> InstrumentType {
    if exchange_upper == "MCX" {
        return InstrumentType::Commodity;
    }
    if INDEX_NAMES.contains(&tsym_upper) {
        return InstrumentType::Index;
    }
    let is_option = matches!(exchange_upper, "NFO" | "BFO")
        || tsym_upper.ends_with("CE")
        || tsym_upper.ends_with("PE");
    if is_option {
        return InstrumentType::Option;
    }
    if tsym_upper.contains("FUT") {
        return InstrumentType::Future;
    }
    InstrumentType::Equity
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn close_threshold_known_exchanges() {
        assert_eq!(
            close_threshold("nse"),
            NaiveTime::from_hms_opt(15, 28, 30)
        );
        assert_eq!(
            close_threshold("MCX"),
            NaiveTime::from_hms_opt(23, 30, 0)
        );
        assert_eq!(close_threshold("UNKNOWN"), None);
    }

    #[test]
    fn should_auto_close_boundary() {
        let before = NaiveTime::from_hms_opt(15, 28, 29).unwrap();
        let at = NaiveTime::from_hms_opt(15, 28, 30).unwrap();
        let after = NaiveTime::from_hms_opt(15, 28, 31).unwrap();
        assert!(!should_auto_close("NSE", before));
        assert!(should_auto_close("NSE", at));
        assert!(should_auto_close("NSE", after));
    }

    #[test]
    fn unknown_exchange_never_autocloses() {
        assert!(!should_auto_close("XUNK", NaiveTime::from_hms_opt(23, 59, 59).unwrap()));
    }

    #[test]
    fn fixed_clock_reports_ist_offset() {
        let utc = Utc.with_ymd_and_hms(2026, 3, 5, 10, 0, 0).unwrap();
        let clock = FixedClock(utc);
        let ist = clock.now_ist();
        // IST is UTC+5:30.
        assert_eq!(ist.time(), NaiveTime::from_hms_opt(15, 30, 0).unwrap());
    }

    #[test]
    fn instrument_type_detection() {
        assert_eq!(
            detect_instrument_type("MCX", "GOLD"),
            InstrumentType::Commodity
        );
        assert_eq!(
            detect_instrument_type("NSE", "NIFTY"),
            InstrumentType::Index
        );
        assert_eq!(
            detect_instrument_type("NFO", "NIFTY24JUL24000CE"),
            InstrumentType::Option
        );
        assert_eq!(
            detect_instrument_type("NSE", "INFYFUT"),
            InstrumentType::Future
        );
        assert_eq!(
            detect_instrument_type("NSE", "INFY"),
            InstrumentType::Equity
        );
    }
}
