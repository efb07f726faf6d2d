use billing_core::ledger::{clamp_sold, closing_stock, derive_retail, derive_wholesale, round2};
use proptest::prelude::*;

proptest! {
    #[test]
    fn closing_stock_is_opening_plus_purchased_minus_sold(
        opening in 0i64..1_000_000,
        purchased in 0i64..1_000_000,
        sold in 0i64..2_000_000,
    ) {
        let closing = closing_stock(opening, purchased, sold).unwrap();
        prop_assert_eq!(closing, opening + purchased - sold);
        prop_assert_eq!(closing + sold - purchased, opening);
    }

    #[test]
    fn closing_stock_reports_overflow_instead_of_wrapping(
        opening in (i64::MAX - 1_000)..=i64::MAX,
        purchased in 1_001i64..1_000_000,
    ) {
        prop_assert_eq!(closing_stock(opening, purchased, 0), None);
        prop_assert_eq!(closing_stock(-opening, 0, purchased + 1), None);
    }

    #[test]
    fn clamped_sold_never_goes_negative(sold in -1_000i64..1_000) {
        let clamped = clamp_sold(sold);
        prop_assert!(clamped >= 0);
        prop_assert_eq!(clamped, sold.max(0));
    }

    #[test]
    fn nonzero_margin_ignores_the_manual_value(
        purchase in 0.0f64..100_000.0,
        margin in 0.5f64..500.0,
        manual_a in 0.0f64..100_000.0,
        manual_b in 0.0f64..100_000.0,
    ) {
        let a = derive_wholesale(purchase, margin, manual_a);
        let b = derive_wholesale(purchase, margin, manual_b);
        prop_assert_eq!(a, b);
        prop_assert_eq!(a, round2(purchase * (1.0 + margin / 100.0)));
    }

    #[test]
    fn zero_margin_returns_the_manual_value_exactly(
        base in 0.0f64..100_000.0,
        manual in 0.0f64..100_000.0,
    ) {
        prop_assert_eq!(derive_wholesale(base, 0.0, manual), manual);
        prop_assert_eq!(derive_retail(base, 0.0, manual), manual);
    }
}
