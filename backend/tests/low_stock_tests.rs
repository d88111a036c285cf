//! Low-stock and expiry tests
//!
//! Tests for stock-level derivations including:
//! - Inclusive threshold boundary per branch type
//! - Unavailable records never flagged
//! - Transition idempotence of `low_stock_since`
//! - Expiry status buckets

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    evaluate_and_update, BranchProduct, BranchType, ExpiryStatus, LowStockTransition, Product,
    ProductBatch, StockLevel,
};

fn product(retail: i32, wholesale: i32) -> Product {
    Product {
        id: 1,
        name: "Amoxicillin 500mg".into(),
        cost: Decimal::new(850, 2),
        srp: Decimal::new(1200, 2),
        retail_low_stock_threshold: retail,
        wholesale_low_stock_threshold: wholesale,
        is_retail_available: true,
        is_wholesale_available: true,
        image_url: None,
    }
}

fn record(is_available: bool) -> BranchProduct {
    BranchProduct {
        product_id: 1,
        branch_id: 1,
        quantity: 0,
        is_available,
        low_stock_since: None,
    }
}

fn batch(id: i32, quantity: i32, is_active: bool) -> ProductBatch {
    ProductBatch {
        id,
        branch_id: 1,
        product_id: 1,
        quantity,
        expiration_date: NaiveDate::from_ymd_opt(2027, 6, 30).unwrap(),
        is_active,
        created_at: Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[test]
    fn test_threshold_is_inclusive() {
        let p = product(50, 50);
        let r = record(true);

        let at = [batch(1, 50, true)];
        assert!(StockLevel::new(&r, &p, BranchType::Retail, &at).is_low_stock());

        let above = [batch(1, 51, true)];
        assert!(!StockLevel::new(&r, &p, BranchType::Retail, &above).is_low_stock());
    }

    #[test]
    fn test_wholesale_branch_uses_wholesale_threshold() {
        let p = product(10, 200);
        let r = record(true);
        let batches = [batch(1, 100, true)];

        assert!(!StockLevel::new(&r, &p, BranchType::Retail, &batches).is_low_stock());
        assert!(StockLevel::new(&r, &p, BranchType::Wholesale, &batches).is_low_stock());
    }

    #[test]
    fn test_inactive_batches_do_not_count() {
        let p = product(50, 50);
        let r = record(true);
        let batches = [batch(1, 30, true), batch(2, 500, false)];
        let level = StockLevel::new(&r, &p, BranchType::Retail, &batches);

        assert_eq!(level.active_quantity(), 30);
        assert!(level.is_low_stock());
    }

    #[test]
    fn test_enter_then_clear() {
        let p = product(50, 50);
        let mut r = record(true);
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();

        let low = [batch(1, 10, true)];
        assert_eq!(
            evaluate_and_update(&mut r, &p, BranchType::Retail, &low, t0),
            Some(LowStockTransition::Entered { at: t0 })
        );
        assert_eq!(r.low_stock_since, Some(t0));

        let restocked = [batch(1, 10, true), batch(2, 100, true)];
        let t1 = t0 + Duration::days(3);
        assert_eq!(
            evaluate_and_update(&mut r, &p, BranchType::Retail, &restocked, t1),
            Some(LowStockTransition::Cleared { since: t0 })
        );
        assert_eq!(r.low_stock_since, None);
    }

    #[test]
    fn test_unavailable_record_keeps_its_timestamp() {
        let p = product(50, 50);
        let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let mut r = BranchProduct {
            low_stock_since: Some(t0),
            ..record(false)
        };

        let plenty = [batch(1, 1000, true)];
        assert_eq!(
            evaluate_and_update(&mut r, &p, BranchType::Retail, &plenty, t0 + Duration::days(1)),
            None
        );
        assert_eq!(r.low_stock_since, Some(t0));
    }

    #[test]
    fn test_expiry_buckets() {
        assert_eq!(ExpiryStatus::from_days(-3), ExpiryStatus::Expired);
        assert_eq!(ExpiryStatus::from_days(0), ExpiryStatus::Expired);
        assert_eq!(ExpiryStatus::from_days(30), ExpiryStatus::Critical);
        assert_eq!(ExpiryStatus::from_days(31), ExpiryStatus::Warning);
        assert_eq!(ExpiryStatus::from_days(90), ExpiryStatus::Warning);
        assert_eq!(ExpiryStatus::from_days(91), ExpiryStatus::Good);
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn batches_strategy() -> impl Strategy<Value = Vec<ProductBatch>> {
        prop::collection::vec((0..200i32, any::<bool>()), 0..8).prop_map(|pairs| {
            pairs
                .into_iter()
                .enumerate()
                .map(|(i, (qty, active))| batch(i as i32, qty, active))
                .collect()
        })
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Low exactly when available and active quantity is at or below threshold
        #[test]
        fn prop_low_stock_rule(
            threshold in 1..500i32,
            batches in batches_strategy(),
            available in any::<bool>(),
        ) {
            let p = product(threshold, threshold);
            let r = record(available);
            let level = StockLevel::new(&r, &p, BranchType::Retail, &batches);

            let active: i64 = batches.iter().filter(|b| b.is_active).map(|b| i64::from(b.quantity)).sum();
            prop_assert_eq!(level.is_low_stock(), available && active <= i64::from(threshold));
        }

        /// Re-evaluating without crossing the threshold never moves the timestamp
        #[test]
        fn prop_evaluation_is_idempotent(
            threshold in 1..500i32,
            batches in batches_strategy(),
            repeats in 1..6usize,
        ) {
            let p = product(threshold, threshold);
            let mut r = record(true);
            let t0 = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();

            evaluate_and_update(&mut r, &p, BranchType::Retail, &batches, t0);
            let settled = r.low_stock_since;

            for n in 1..=repeats {
                let later = t0 + Duration::hours(n as i64);
                prop_assert_eq!(
                    evaluate_and_update(&mut r, &p, BranchType::Retail, &batches, later),
                    None
                );
                prop_assert_eq!(r.low_stock_since, settled);
            }
        }

        /// Days in low stock are whole days and never negative
        #[test]
        fn prop_days_in_low_stock_non_negative(offset_hours in -1000i64..1000) {
            let p = product(50, 50);
            let since = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
            let r = BranchProduct { low_stock_since: Some(since), ..record(true) };
            let level = StockLevel::new(&r, &p, BranchType::Retail, &[]);

            let days = level.days_in_low_stock(since + Duration::hours(offset_hours));
            prop_assert!(days >= 0);
            prop_assert_eq!(days, (offset_hours / 24).max(0));
        }

        /// Expiry status only ever gets worse as the date approaches
        #[test]
        fn prop_expiry_status_monotonic(days in -400i64..400) {
            let rank = |s: ExpiryStatus| match s {
                ExpiryStatus::Expired => 0,
                ExpiryStatus::Critical => 1,
                ExpiryStatus::Warning => 2,
                ExpiryStatus::Good => 3,
            };
            prop_assert!(rank(ExpiryStatus::from_days(days)) <= rank(ExpiryStatus::from_days(days + 1)));
        }
    }
}
