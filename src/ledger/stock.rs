/// Closing stock from the three ledger counters, or `None` when the result
/// does not fit in an `i64`.
///
/// No clamping happens here; callers clamp `sold` with [`clamp_sold`] first.
pub fn closing_stock(opening: i64, purchased: i64, sold: i64) -> Option<i64> {
    opening.checked_add(purchased)?.checked_sub(sold)
}

pub fn clamp_sold(sold: i64) -> i64 {
    sold.max(0)
}

/// Point-in-time view of a product's stock counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockSnapshot {
    pub opening: i64,
    pub purchased: i64,
    pub sold: i64,
    pub closing: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closing_passes_negative_results_through() {
        assert_eq!(closing_stock(5, 0, 9), Some(-4));
    }

    #[test]
    fn closing_reports_overflow() {
        assert_eq!(closing_stock(10, i64::MAX, 1), None);
        assert_eq!(closing_stock(0, 0, i64::MIN), None);
        assert_eq!(closing_stock(i64::MAX, 0, 0), Some(i64::MAX));
    }

    #[test]
    fn clamp_only_raises_negative_values() {
        assert_eq!(clamp_sold(-3), 0);
        assert_eq!(clamp_sold(7), 7);
    }
}
