//! Smart Factor Selector (spec §4.1).

use b5_schemas::{FactorChoice, FACTOR_MEGA, FACTOR_MICRO, FACTOR_MINI};

const INDEX_NAMES: [&str; 4] = ["NIFTY", "BANKNIFTY", "FINNIFTY", "SENSEX"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Index,
    Option,
    Future,
    Equity,
}

fn classify(exchange_upper: &str, tsym_upper: &str) -> Class {
    if INDEX_NAMES.contains(&tsym_upper) {
        return Class::Index;
    }
    let is_option = matches!(exchange_upper, "NFO" | "BFO")
        || tsym_upper.ends_with("CE")
        || tsym_upper.ends_with("PE");
    if is_option {
        return Class::Option;
    }
    if tsym_upper.contains("FUT") {
        return Class::Future;
    }
    Class::Equity
}

/// Row-dependent "smart" selection (spec §4.1 rules 1-6), including the MCX
/// short-circuit.
pub fn select_smart(ltp: f64, close: f64, exchange_upper: &str, tsym_upper: &str) -> (f64, &'static str, &'static str) {
    if exchange_upper == "MCX" {
        return (FACTOR_MINI, "mini", "mcx_commodity");
    }

    match classify(exchange_upper, tsym_upper) {
        Class::Index => (FACTOR_MICRO, "micro", "index"),
        Class::Option => {
            let move_pct = move_pct(ltp, close);
            if move_pct > 10.0 {
                (FACTOR_MEGA, "mega", "extreme_volatility_option")
            } else if move_pct > 5.0 {
                (FACTOR_MINI, "mini", "option_elevated_move")
            } else {
                (FACTOR_MICRO, "micro", "option_normal_move")
            }
        }
        Class::Future => {
            let move_pct = move_pct(ltp, close);
            if move_pct > 3.0 {
                (FACTOR_MINI, "mini", "future_elevated_move")
            } else {
                (FACTOR_MICRO, "micro", "future_normal_move")
            }
        }
        Class::Equity => {
            let move_pct = move_pct(ltp, close);
            if move_pct > 8.0 {
                (FACTOR_MEGA, "mega", "equity_extreme_move")
            } else if move_pct > 3.0 {
                (FACTOR_MINI, "mini", "equity_elevated_move")
            } else {
                (FACTOR_MICRO, "micro", "equity_normal_move")
            }
        }
    }
}

fn move_pct(ltp: f64, close: f64) -> f64 {
    if close == 0.0 {
        return 0.0;
    }
    (ltp - close).abs() / close * 100.0
}

/// Resolve the requested configuration factor to a concrete multiplier for
/// one row. `Smart` defers to [`select_smart`]; any fixed factor is used
/// directly except that MCX is always promoted to `mini` regardless of the
/// configured fixed factor (spec §4.1, final paragraph).
pub fn resolve_factor(
    requested: FactorChoice,
    ltp: f64,
    close: f64,
    exchange_upper: &str,
    tsym_upper: &str,
) -> (f64, &'static str, &'static str) {
    if requested == FactorChoice::Smart {
        return select_smart(ltp, close, exchange_upper, tsym_upper);
    }
    if exchange_upper == "MCX" {
        return (FACTOR_MINI, "mini", "mcx_commodity");
    }
    (
        requested.multiplier().expect("fixed factor has a multiplier"),
        requested.as_str(),
        "fixed_config",
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // Scenario S1 (spec §8.2): equity moderate volatility walk.
    #[test]
    fn scenario_s1_equity_moderate_volatility() {
        let close = 1500.0;
        let (_, name, _) = select_smart(1545.0, close, "NSE", "INFY");
        assert_eq!(name, "micro"); // 3.0%
        let (_, name, _) = select_smart(1560.0, close, "NSE", "INFY");
        assert_eq!(name, "micro"); // 4.0%
        let (_, name, _) = select_smart(1570.0, close, "NSE", "INFY");
        assert_eq!(name, "micro"); // 4.67%
        let (_, name, _) = select_smart(1600.0, close, "NSE", "INFY");
        assert_eq!(name, "mini"); // 6.67%
        let (_, name, _) = select_smart(1700.0, close, "NSE", "INFY");
        assert_eq!(name, "mega"); // 13.33%
    }

    #[test]
    fn mcx_always_mini_even_for_fixed_factor() {
        let (f, name, reason) =
            resolve_factor(FactorChoice::Mega, 100.0, 100.0, "MCX", "GOLD");
        assert_eq!(name, "mini");
        assert_eq!(reason, "mcx_commodity");
        assert!((f - FACTOR_MINI).abs() < 1e-12);
    }

    #[test]
    fn index_is_always_micro() {
        let (_, name, reason) = select_smart(19500.0, 19000.0, "NSE", "NIFTY");
        assert_eq!(name, "micro");
        assert_eq!(reason, "index");
    }

    #[test]
    fn option_extreme_volatility_is_mega() {
        let (_, name, _) = select_smart(120.0, 100.0, "NFO", "NIFTY24JUL24000CE");
        assert_eq!(name, "mega");
    }

    #[test]
    fn fixed_factor_used_directly_off_mcx() {
        let (f, name, reason) = resolve_factor(FactorChoice::Mini, 100.0, 100.0, "NSE", "INFY");
        assert_eq!(name, "mini");
        assert_eq!(reason, "fixed_config");
        assert!((f - FACTOR_MINI).abs() < 1e-12);
    }
}
