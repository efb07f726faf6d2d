use chrono::NaiveDate;
use tracing::info;

use crate::errors::LedgerError;
use crate::ledger::{same_product_name, FutureRateChange, Product, RateQuote};

use super::ServiceResult;

pub struct RateService;

impl RateService {
    /// A change dated after `today` waits in the schedule; anything else is
    /// applied straight away.
    pub fn is_future(change: &FutureRateChange, today: NaiveDate) -> bool {
        change.effective_date > today
    }

    pub fn validate(change: &FutureRateChange) -> ServiceResult<()> {
        if change.product_name.trim().is_empty() {
            return Err(LedgerError::validation("Product Name is required"));
        }
        let rates = [
            change.new_purchase_rate,
            change.wholesale_rate,
            change.retail_rate,
        ];
        if rates.iter().any(|rate| !(*rate >= 0.0)) {
            return Err(LedgerError::validation("Rates must not be negative"));
        }
        Ok(())
    }

    /// Applies `change` to the first product with the same name.
    pub fn apply_now(
        products: &mut [Product],
        change: &FutureRateChange,
        today: NaiveDate,
    ) -> ServiceResult<RateQuote> {
        let product = products
            .iter_mut()
            .find(|product| change.applies_to(&product.product_name))
            .ok_or_else(|| LedgerError::ProductNotFound(change.product_name.clone()))?;
        change.apply_to(product, today);
        info!(
            product = %product.product_name,
            purchase_rate = product.purchase_rate,
            "rate change applied"
        );
        Ok(RateQuote::from(&*product))
    }

    /// Rates in force on `on`: a pending change already due wins over the
    /// catalog values.
    pub fn current_rate(
        products: &[Product],
        pending: &[FutureRateChange],
        product_name: &str,
        on: NaiveDate,
    ) -> ServiceResult<RateQuote> {
        if let Some(change) = pending
            .iter()
            .find(|change| change.applies_to(product_name) && change.is_due(on))
        {
            return Ok(change.rates());
        }
        products
            .iter()
            .find(|product| same_product_name(&product.product_name, product_name))
            .map(RateQuote::from)
            .ok_or_else(|| LedgerError::ProductNotFound(product_name.trim().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::RateEdit;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 8, d).unwrap()
    }

    fn product() -> Product {
        Product {
            brand: "Acme".into(),
            product_name: "Bulb".into(),
            purchase_date: day(1),
            purchase_rate: 100.0,
            margin1: 10.0,
            wholesale_rate: 110.0,
            margin2: 20.0,
            retail_rate: 132.0,
            opening_stock: 0,
            purchased_stock: 0,
            sold_stock: 0,
            closing_stock: 0,
            modified_date: day(1),
        }
    }

    fn change(effective: NaiveDate) -> FutureRateChange {
        RateEdit {
            product_name: "bulb".into(),
            new_purchase_rate: 200.0,
            effective_date: effective,
            margin1: 10.0,
            manual_wholesale: 0.0,
            margin2: 10.0,
            manual_retail: 0.0,
        }
        .into_change(day(1))
    }

    #[test]
    fn only_strictly_later_dates_are_future() {
        assert!(RateService::is_future(&change(day(2)), day(1)));
        assert!(!RateService::is_future(&change(day(1)), day(1)));
    }

    #[test]
    fn apply_now_matches_name_case_insensitively() {
        let mut products = vec![product()];
        let quote = RateService::apply_now(&mut products, &change(day(1)), day(1)).unwrap();
        assert_eq!(quote.wholesale_rate, 220.0);
        assert_eq!(quote.retail_rate, 242.0);
        assert_eq!(products[0].purchase_rate, 200.0);
    }

    #[test]
    fn current_rate_prefers_due_pending_change() {
        let products = vec![product()];
        let pending = vec![change(day(5))];
        let before = RateService::current_rate(&products, &pending, "Bulb", day(4)).unwrap();
        assert_eq!(before.purchase_rate, 100.0);
        let after = RateService::current_rate(&products, &pending, "Bulb", day(5)).unwrap();
        assert_eq!(after.purchase_rate, 200.0);
        assert!(RateService::current_rate(&products, &pending, "Fan", day(5)).is_err());
    }

    #[test]
    fn negative_rates_are_rejected() {
        let mut bad = change(day(3));
        bad.retail_rate = -1.0;
        assert!(RateService::validate(&bad).is_err());
        assert!(RateService::validate(&change(day(3))).is_ok());
    }
}
