//! Margin-based rate derivation.
//!
//! A margin of exactly `0` means the tier's rate was entered manually and must be
//! carried through untouched instead of being derived from the tier below it.

/// Rounds to two decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Applies a percentage markup to `base`, rounded to two decimals.
pub fn apply_margin(base: f64, margin: f64) -> f64 {
    round2(base * (1.0 + margin / 100.0))
}

/// Wholesale rate derived from the purchase rate, or `manual_wholesale` when
/// `margin1` is zero.
pub fn derive_wholesale(purchase_rate: f64, margin1: f64, manual_wholesale: f64) -> f64 {
    if margin1 != 0.0 {
        apply_margin(purchase_rate, margin1)
    } else {
        manual_wholesale
    }
}

/// Retail rate derived from the wholesale rate, or `manual_retail` when
/// `margin2` is zero.
pub fn derive_retail(wholesale_rate: f64, margin2: f64, manual_retail: f64) -> f64 {
    if margin2 != 0.0 {
        apply_margin(wholesale_rate, margin2)
    } else {
        manual_retail
    }
}

/// Derives both tiers in one go, feeding the (possibly manual) wholesale rate
/// into the retail derivation.
pub fn derive_tiers(
    purchase_rate: f64,
    margin1: f64,
    manual_wholesale: f64,
    margin2: f64,
    manual_retail: f64,
) -> (f64, f64) {
    let wholesale = derive_wholesale(purchase_rate, margin1, manual_wholesale);
    let retail = derive_retail(wholesale, margin2, manual_retail);
    (wholesale, retail)
}
