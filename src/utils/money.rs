// src/utils/money.rs

/// Kalshi quotes prices in whole cents.
pub fn cents_to_dollars(cents: i64) -> f64 {
    cents as f64 / 100.0
}

/// Per-share cost basis from the account's exposure figure.
///
/// The API reports exposure in cents for market positions but some event
/// aggregates arrive already in dollars; a raw cost above 100 is taken to
/// be cents and scaled down.
pub fn infer_entry_price(cost: f64, shares: u32) -> f64 {
    if shares == 0 {
        return 0.0;
    }
    let per_share = cost / shares as f64;
    if cost > 100.0 {
        per_share / 100.0
    } else {
        per_share
    }
}

/// Unrealized PnL as a percentage of entry. Zero when entry is non-positive.
pub fn pnl_pct(entry: f64, current: f64) -> f64 {
    if entry > 0.0 {
        (current - entry) / entry * 100.0
    } else {
        0.0
    }
}

/// Bid-ask spread as a percentage of the bid.
pub fn spread_pct(bid: f64, ask: f64) -> f64 {
    if bid > 0.0 {
        (ask - bid) / bid * 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_price_cents_heuristic() {
        // 500 cents for 10 shares -> $0.50/share
        assert!((infer_entry_price(500.0, 10) - 0.50).abs() < 1e-9);
        // small raw cost is already dollars
        assert!((infer_entry_price(5.0, 10) - 0.50).abs() < 1e-9);
        assert_eq!(infer_entry_price(500.0, 0), 0.0);
    }

    #[test]
    fn pnl_pct_guards_zero_entry() {
        assert_eq!(pnl_pct(0.0, 0.60), 0.0);
        assert!((pnl_pct(0.50, 0.60) - 20.0).abs() < 1e-9);
        assert!((pnl_pct(0.50, 0.44) + 12.0).abs() < 1e-9);
    }

    #[test]
    fn spread_pct_of_bid() {
        assert!((spread_pct(0.40, 0.44) - 10.0).abs() < 1e-9);
        assert_eq!(spread_pct(0.0, 0.44), 0.0);
    }
}
