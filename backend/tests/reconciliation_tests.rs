//! Inventory reconciliation tests
//!
//! Tests for the submission planner including:
//! - Consistency rule: selling_area == beginning + deliver + transfer - pull_out - offtake
//! - Approval decision: every line consistent, or nothing touches stock
//! - Unknown product lookup failing in submission order
//! - Summary counters over frozen prices

use std::collections::HashMap;

use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    clamp_page, is_consistent, plan_report, InvReportItemInput, Pagination, PriceSnapshot,
    ReconciliationError, ReportStatus,
};

fn line(product_id: i32, counts: [i32; 6]) -> InvReportItemInput {
    let [beginning, deliver, transfer, pull_out, offtake, selling_area] = counts;
    InvReportItemInput {
        product_id,
        beginning,
        deliver,
        transfer,
        pull_out,
        offtake,
        selling_area,
        batches: vec![],
    }
}

fn catalog(ids: impl IntoIterator<Item = i32>) -> HashMap<i32, PriceSnapshot> {
    ids.into_iter()
        .map(|id| {
            (
                id,
                PriceSnapshot {
                    cost: Decimal::new(i64::from(id) * 100, 2),
                    srp: Decimal::new(i64::from(id) * 150, 2),
                },
            )
        })
        .collect()
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Worked example: 10 + 5 + 0 - 2 - 3 = 10
    #[test]
    fn test_matching_count_approves_and_sets_stock() {
        let items = vec![line(7, [10, 5, 0, 2, 3, 10])];
        let plan = plan_report(&items, &catalog([7])).unwrap();

        assert_eq!(plan.status, ReportStatus::Approved);
        assert_eq!(plan.stock_updates.len(), 1);
        assert_eq!(plan.stock_updates[0].product_id, 7);
        assert_eq!(plan.stock_updates[0].quantity, 10);
    }

    /// Same submission with one unit too many in the selling area
    #[test]
    fn test_mismatched_count_stays_pending() {
        let items = vec![line(7, [10, 5, 0, 2, 3, 11])];
        let plan = plan_report(&items, &catalog([7])).unwrap();

        assert_eq!(plan.status, ReportStatus::Pending);
        assert!(plan.stock_updates.is_empty());
    }

    #[test]
    fn test_duplicate_product_last_line_wins() {
        let items = vec![line(7, [10, 0, 0, 0, 0, 10]), line(7, [4, 0, 0, 0, 1, 3])];
        let plan = plan_report(&items, &catalog([7])).unwrap();

        let final_stock: HashMap<i32, i32> = plan
            .stock_updates
            .iter()
            .map(|u| (u.product_id, u.quantity))
            .collect();
        assert_eq!(final_stock[&7], 3);
    }

    #[test]
    fn test_missing_product_fails_whole_submission() {
        let items = vec![line(7, [1, 0, 0, 0, 0, 1]), line(8, [1, 0, 0, 0, 0, 1])];
        assert_eq!(
            plan_report(&items, &catalog([7])).unwrap_err(),
            ReconciliationError::UnknownProduct(8)
        );
    }

    #[test]
    fn test_large_offtake_value_is_exact() {
        let items = vec![line(5, [2_000_000, 0, 0, 0, 2_000_000, 0]); 3];
        let prices = HashMap::from([(
            5,
            PriceSnapshot {
                cost: Decimal::new(5_000_000_000, 2),
                srp: Decimal::new(9_999_999_900, 2),
            },
        )]);
        let plan = plan_report(&items, &prices).unwrap();

        assert_eq!(plan.status, ReportStatus::Approved);
        // 3 * 2,000,000 * 99,999,999.00
        assert_eq!(
            plan.summary.total_offtake_value,
            Decimal::new(59_999_999_400_000_000, 2)
        );
        assert!(plan.summary.total_offtake_value > Decimal::from(1_000_000_000_000i64));
    }

    /// Three reports on one branch, newest first
    #[test]
    fn test_pagination_window_over_three_reports() {
        let reports = [3, 2, 1];
        let page = |skip, limit| {
            let (skip, limit) = Pagination { skip, limit }.window();
            reports
                .iter()
                .skip(skip as usize)
                .take(limit as usize)
                .copied()
                .collect::<Vec<_>>()
        };

        assert_eq!(page(0, 1), vec![3]);
        assert_eq!(page(2, 1), vec![1]);
        assert_eq!(page(-4, 100), vec![3, 2, 1]);
        assert_eq!(Pagination { skip: 0, limit: 5000 }.window(), (0, 5000));
    }
}

// ============================================================================
// Property Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    /// Movement counts whose expected selling area is never negative
    fn consistent_counts_strategy() -> impl Strategy<Value = [i32; 6]> {
        (0..500i32, 0..500i32, 0..500i32, 0..1500i32, 0..1500i32).prop_map(
            |(beginning, deliver, transfer, pull_out, offtake)| {
                let inflow = beginning + deliver + transfer;
                let pull_out = pull_out.min(inflow);
                let offtake = offtake.min(inflow - pull_out);
                let selling_area = inflow - pull_out - offtake;
                [beginning, deliver, transfer, pull_out, offtake, selling_area]
            },
        )
    }

    fn consistent_items_strategy() -> impl Strategy<Value = Vec<InvReportItemInput>> {
        prop::collection::vec((1..20i32, consistent_counts_strategy()), 1..15)
            .prop_map(|lines| lines.into_iter().map(|(id, c)| line(id, c)).collect())
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// All lines consistent: approved, and stock follows each line in order
        #[test]
        fn prop_consistent_submission_is_approved(items in consistent_items_strategy()) {
            let plan = plan_report(&items, &catalog(1..20)).unwrap();

            prop_assert_eq!(plan.status, ReportStatus::Approved);
            prop_assert_eq!(plan.stock_updates.len(), items.len());
            for (update, item) in plan.stock_updates.iter().zip(&items) {
                prop_assert_eq!(update.product_id, item.product_id);
                prop_assert_eq!(update.quantity, item.selling_area);
            }
        }

        /// One mismatched line blocks every stock update
        #[test]
        fn prop_any_mismatch_leaves_stock_untouched(
            items in consistent_items_strategy(),
            index in any::<prop::sample::Index>(),
            delta in prop_oneof![-50i32..-1, 1i32..50],
        ) {
            let mut items = items;
            let i = index.index(items.len());
            items[i].selling_area = (items[i].selling_area + delta).max(0);
            prop_assume!(!is_consistent(&items[i]));

            let plan = plan_report(&items, &catalog(1..20)).unwrap();

            prop_assert_eq!(plan.status, ReportStatus::Pending);
            prop_assert!(plan.stock_updates.is_empty());
            prop_assert!(plan.inconsistent_lines().count() >= 1);
        }

        /// The first unknown id in submission order is the one reported
        #[test]
        fn prop_first_unknown_product_is_reported(
            items in consistent_items_strategy(),
            index in any::<prop::sample::Index>(),
            unknown in 100..200i32,
        ) {
            let mut items = items;
            let i = index.index(items.len());
            items[i].product_id = unknown;
            items.push(line(unknown + 1000, [0, 0, 0, 0, 0, 0]));

            let err = plan_report(&items, &catalog(1..20)).unwrap_err();
            prop_assert_eq!(err, ReconciliationError::UnknownProduct(unknown));
        }

        /// Summary counts lines with movement and totals offtake at frozen SRP
        #[test]
        fn prop_summary_matches_lines(items in consistent_items_strategy()) {
            let prices = catalog(1..20);
            let plan = plan_report(&items, &prices).unwrap();
            let summary = plan.summary;

            prop_assert_eq!(summary.items_count as usize, items.len());
            prop_assert_eq!(
                summary.products_with_delivery as usize,
                items.iter().filter(|i| i.deliver > 0).count()
            );
            prop_assert_eq!(
                summary.products_with_offtake as usize,
                items.iter().filter(|i| i.offtake > 0).count()
            );

            let expected_total: Decimal = items
                .iter()
                .map(|i| Decimal::from(i.offtake) * prices[&i.product_id].srp)
                .sum();
            prop_assert_eq!(summary.total_offtake_value, expected_total);
        }

        /// Every planned line carries the catalog price it was resolved against
        #[test]
        fn prop_lines_freeze_catalog_prices(items in consistent_items_strategy()) {
            let prices = catalog(1..20);
            let plan = plan_report(&items, &prices).unwrap();

            for planned in &plan.lines {
                prop_assert_eq!(planned.snapshot, prices[&planned.input.product_id]);
            }
        }

        /// Clamping only lifts negatives to zero; any other limit is kept
        #[test]
        fn prop_clamped_window_keeps_requested_limit(skip in any::<i64>(), limit in any::<i64>()) {
            let (clamped_skip, clamped_limit) = clamp_page(skip, limit);
            prop_assert_eq!(clamped_skip, skip.max(0));
            prop_assert_eq!(clamped_limit, limit.max(0));
        }
    }
}
