//! Charge accounting on trade close (spec §4.6).

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Charges {
    pub brokerage: f64,
    pub stt: f64,
    pub exchange_charges: f64,
    pub sebi_charges: f64,
    pub stamp_duty: f64,
    pub gst: f64,
    pub total_charges: f64,
}

/// Compute all charge components for one closed trade. `exchange` is matched
/// case-insensitively against the NSE/BSE STT rate.
pub fn compute(entry: f64, exit: f64, quantity: i64, exchange: &str) -> Charges {
    let turnover = (entry + exit) * quantity as f64;
    let exchange_upper = exchange.to_ascii_uppercase();

    let brokerage = (turnover * 0.0001).min(20.00);
    let stt = if exchange_upper.starts_with("NSE") || exchange_upper.starts_with("BSE") {
        turnover * 0.00025
    } else {
        turnover * 0.0001
    };
    let exchange_charges = turnover * 0.0000325;
    let sebi_charges = turnover * 0.000001;
    let stamp_duty = entry * quantity as f64 * 0.00015;
    let gst = (brokerage + exchange_charges) * 0.18;
    let total_charges = brokerage + stt + exchange_charges + sebi_charges + stamp_duty + gst;

    Charges {
        brokerage,
        stt,
        exchange_charges,
        sebi_charges,
        stamp_duty,
        gst,
        total_charges,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nse_stt_rate_applies() {
        let c = compute(100.0, 101.0, 10, "NSE");
        let turnover = 2010.0;
        assert!((c.stt - turnover * 0.00025).abs() < 1e-9);
        assert!((c.brokerage - (turnover * 0.0001).min(20.0)).abs() < 1e-9);
    }

    #[test]
    fn non_nse_bse_stt_rate_applies() {
        let c = compute(100.0, 101.0, 10, "NFO");
        let turnover = 2010.0;
        assert!((c.stt - turnover * 0.0001).abs() < 1e-9);
    }

    #[test]
    fn brokerage_caps_at_twenty() {
        let c = compute(10_000.0, 10_100.0, 500, "NSE");
        assert!((c.brokerage - 20.0).abs() < 1e-9);
    }

    #[test]
    fn stamp_duty_is_buy_side_only() {
        let c = compute(100.0, 50.0, 10, "NSE");
        assert!((c.stamp_duty - (100.0 * 10.0 * 0.00015)).abs() < 1e-9);
    }

    #[test]
    fn total_charges_identity() {
        let c = compute(100.0, 101.0, 10, "NSE");
        let sum = c.brokerage + c.stt + c.exchange_charges + c.sebi_charges + c.stamp_duty + c.gst;
        assert!((c.total_charges - sum).abs() < 1e-9);
    }
}
