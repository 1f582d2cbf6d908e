//! Broker-Limits Governor (spec §4.7): per-day counters plus a green/yellow/
//! red safety verdict gating new entries.

use b5_schemas::{BrokerLimitsCounter, BrokerLimitsStatus, BrokerSafety};

pub fn evaluate(
    counter: &BrokerLimitsCounter,
    max_orders_per_day: i64,
    max_open_positions: i64,
    max_margin_used_pct: f64,
) -> BrokerLimitsStatus {
    let orders_remaining = (max_orders_per_day - counter.orders_placed).max(0);
    let positions_remaining = (max_open_positions - counter.open_positions).max(0);

    let orders_remaining_pct = ratio(orders_remaining, max_orders_per_day);
    let positions_remaining_pct = ratio(positions_remaining, max_open_positions);

    let status = if orders_remaining_pct < 0.20 || positions_remaining_pct < 0.20 {
        BrokerSafety::Red
    } else if orders_remaining_pct < 0.50 || positions_remaining_pct < 0.50 {
        BrokerSafety::Yellow
    } else {
        BrokerSafety::Green
    };

    BrokerLimitsStatus {
        day: counter.day.clone(),
        orders_placed: counter.orders_placed,
        max_orders_per_day,
        orders_remaining,
        open_positions: counter.open_positions,
        max_open_positions,
        positions_remaining,
        margin_used: counter.margin_used,
        max_margin_used_pct,
        status,
    }
}

fn ratio(remaining: i64, limit: i64) -> f64 {
    if limit <= 0 {
        return 0.0;
    }
    remaining as f64 / limit as f64
}

/// Entry attempts are blocked only on `red` (spec §4.7, last line).
pub fn blocks_entry(status: &BrokerLimitsStatus) -> bool {
    status.status == BrokerSafety::Red
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counter(orders: i64, positions: i64) -> BrokerLimitsCounter {
        BrokerLimitsCounter {
            day: "2026-03-05".to_string(),
            orders_placed: orders,
            open_positions: positions,
            margin_used: 0.0,
            updated_at: String::new(),
        }
    }

    #[test]
    fn green_when_well_under_limits() {
        let c = counter(100, 10);
        let s = evaluate(&c, 2000, 100, 80.0);
        assert_eq!(s.status, BrokerSafety::Green);
        assert!(!blocks_entry(&s));
    }

    #[test]
    fn yellow_under_fifty_percent_remaining() {
        let c = counter(1050, 10); // 950/2000 = 47.5% remaining
        let s = evaluate(&c, 2000, 100, 80.0);
        assert_eq!(s.status, BrokerSafety::Yellow);
    }

    #[test]
    fn red_under_twenty_percent_remaining_blocks_entry() {
        let c = counter(1650, 10); // 350/2000 = 17.5% remaining
        let s = evaluate(&c, 2000, 100, 80.0);
        assert_eq!(s.status, BrokerSafety::Red);
        assert!(blocks_entry(&s));
    }

    #[test]
    fn positions_limit_drives_status_independent_of_orders() {
        let c = counter(0, 85); // 15/100 = 15% remaining on positions
        let s = evaluate(&c, 2000, 100, 80.0);
        assert_eq!(s.status, BrokerSafety::Red);
    }
}
