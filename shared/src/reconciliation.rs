//! Inventory reconciliation rules
//!
//! A submitted count is checked line by line against the expected stock flow
//! `beginning + deliver + transfer - pull_out - offtake`. Only a submission in
//! which every line matches may touch branch stock; a single mismatch leaves
//! the report pending and stock unchanged.
//!
//! Everything here is pure. The backend resolves prices, hands them to
//! [`plan_report`], and persists the resulting [`ReportPlan`] inside one
//! transaction.

use std::collections::HashMap;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::models::{InvReportItemInput, Product, ReportStatus};

/// Errors that abort a submission before anything is written
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReconciliationError {
    #[error("Product with id {0} not found")]
    UnknownProduct(i32),
}

/// Cost and SRP frozen into a report line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PriceSnapshot {
    pub cost: Decimal,
    pub srp: Decimal,
}

impl From<&Product> for PriceSnapshot {
    fn from(product: &Product) -> Self {
        Self {
            cost: product.cost,
            srp: product.srp,
        }
    }
}

/// Selling-area quantity implied by the line's movements.
///
/// Computed in 64-bit so that no combination of `i32` inputs can overflow.
pub fn expected_selling_area(line: &InvReportItemInput) -> i64 {
    expected_from_counts(
        line.beginning,
        line.deliver,
        line.transfer,
        line.pull_out,
        line.offtake,
    )
}

/// `beginning + deliver + transfer - pull_out - offtake`
pub fn expected_from_counts(
    beginning: i32,
    deliver: i32,
    transfer: i32,
    pull_out: i32,
    offtake: i32,
) -> i64 {
    i64::from(beginning) + i64::from(deliver) + i64::from(transfer)
        - i64::from(pull_out)
        - i64::from(offtake)
}

/// Exact equality; there is no tolerance
pub fn is_consistent(line: &InvReportItemInput) -> bool {
    i64::from(line.selling_area) == expected_selling_area(line)
}

/// A line with its frozen prices and check result
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedLine<'a> {
    pub input: &'a InvReportItemInput,
    pub snapshot: PriceSnapshot,
    pub expected_selling_area: i64,
    pub consistent: bool,
}

/// Stock quantity to write for a product at the report's branch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StockUpdate {
    pub product_id: i32,
    pub quantity: i32,
}

/// Counters stored on the report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ReportSummary {
    pub items_count: i32,
    pub products_with_delivery: i32,
    pub products_with_transfer: i32,
    pub products_with_pullout: i32,
    pub products_with_offtake: i32,
    /// Sum of `offtake * srp` over the frozen prices
    pub total_offtake_value: Decimal,
}

impl ReportSummary {
    fn add(&mut self, line: &InvReportItemInput, snapshot: &PriceSnapshot) {
        self.items_count += 1;
        self.products_with_delivery += i32::from(line.deliver > 0);
        self.products_with_transfer += i32::from(line.transfer > 0);
        self.products_with_pullout += i32::from(line.pull_out > 0);
        self.products_with_offtake += i32::from(line.offtake > 0);
        self.total_offtake_value += Decimal::from(line.offtake) * snapshot.srp;
    }
}

/// Everything the backend needs to persist a submission
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPlan<'a> {
    pub status: ReportStatus,
    pub lines: Vec<PlannedLine<'a>>,
    pub summary: ReportSummary,
    /// Empty unless the report is approved; in submission order
    pub stock_updates: Vec<StockUpdate>,
}

impl<'a> ReportPlan<'a> {
    pub fn inconsistent_lines(&self) -> impl Iterator<Item = &PlannedLine<'a>> {
        self.lines.iter().filter(|l| !l.consistent)
    }
}

/// Build the persistence plan for a submission.
///
/// Fails on the first line (in submission order) whose product is missing
/// from `catalog`.
pub fn plan_report<'a>(
    items: &'a [InvReportItemInput],
    catalog: &HashMap<i32, PriceSnapshot>,
) -> Result<ReportPlan<'a>, ReconciliationError> {
    let mut lines = Vec::with_capacity(items.len());
    let mut summary = ReportSummary::default();

    for item in items {
        let snapshot = *catalog
            .get(&item.product_id)
            .ok_or(ReconciliationError::UnknownProduct(item.product_id))?;

        summary.add(item, &snapshot);
        lines.push(PlannedLine {
            input: item,
            snapshot,
            expected_selling_area: expected_selling_area(item),
            consistent: is_consistent(item),
        });
    }

    let all_consistent = lines.iter().all(|l| l.consistent);
    let (status, stock_updates) = if all_consistent {
        let updates = lines
            .iter()
            .map(|l| StockUpdate {
                product_id: l.input.product_id,
                quantity: l.input.selling_area,
            })
            .collect();
        (ReportStatus::Approved, updates)
    } else {
        (ReportStatus::Pending, Vec::new())
    };

    Ok(ReportPlan {
        status,
        lines,
        summary,
        stock_updates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

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

    fn catalog() -> HashMap<i32, PriceSnapshot> {
        HashMap::from([
            (
                7,
                PriceSnapshot {
                    cost: Decimal::new(1000, 2),
                    srp: Decimal::new(1500, 2),
                },
            ),
            (
                8,
                PriceSnapshot {
                    cost: Decimal::new(200, 2),
                    srp: Decimal::new(350, 2),
                },
            ),
        ])
    }

    #[test]
    fn matching_line_approves() {
        let items = vec![line(7, [10, 5, 0, 2, 3, 10])];
        let plan = plan_report(&items, &catalog()).unwrap();

        assert_eq!(plan.status, ReportStatus::Approved);
        assert_eq!(
            plan.stock_updates,
            vec![StockUpdate {
                product_id: 7,
                quantity: 10
            }]
        );
    }

    #[test]
    fn off_by_one_leaves_report_pending() {
        let items = vec![line(7, [10, 5, 0, 2, 3, 11])];
        let plan = plan_report(&items, &catalog()).unwrap();

        assert_eq!(plan.status, ReportStatus::Pending);
        assert!(plan.stock_updates.is_empty());
        assert_eq!(plan.inconsistent_lines().count(), 1);
        assert_eq!(plan.lines[0].expected_selling_area, 10);
    }

    #[test]
    fn one_bad_line_blocks_every_update() {
        let items = vec![line(7, [10, 5, 0, 2, 3, 10]), line(8, [4, 0, 0, 0, 1, 2])];
        let plan = plan_report(&items, &catalog()).unwrap();

        assert_eq!(plan.status, ReportStatus::Pending);
        assert!(plan.stock_updates.is_empty());
        assert!(plan.lines[0].consistent);
        assert!(!plan.lines[1].consistent);
    }

    #[test]
    fn unknown_product_is_reported_in_submission_order() {
        let items = vec![
            line(7, [1, 0, 0, 0, 0, 1]),
            line(99, [1, 0, 0, 0, 0, 1]),
            line(42, [1, 0, 0, 0, 0, 1]),
        ];
        let err = plan_report(&items, &catalog()).unwrap_err();
        assert_eq!(err, ReconciliationError::UnknownProduct(99));
        assert_eq!(err.to_string(), "Product with id 99 not found");
    }

    #[test]
    fn summary_uses_frozen_srp() {
        let items = vec![line(7, [10, 5, 0, 2, 3, 10]), line(8, [6, 0, 4, 0, 0, 10])];
        let plan = plan_report(&items, &catalog()).unwrap();

        assert_eq!(
            plan.summary,
            ReportSummary {
                items_count: 2,
                products_with_delivery: 1,
                products_with_transfer: 1,
                products_with_pullout: 1,
                products_with_offtake: 1,
                total_offtake_value: Decimal::new(4500, 2),
            }
        );
    }

    #[test]
    fn empty_submission_is_trivially_approved() {
        let plan = plan_report(&[], &catalog()).unwrap();
        assert_eq!(plan.status, ReportStatus::Approved);
        assert_eq!(plan.summary.items_count, 0);
        assert!(plan.stock_updates.is_empty());
    }

    #[test]
    fn extreme_counts_do_not_overflow() {
        let item = line(7, [i32::MAX, i32::MAX, i32::MAX, 0, 0, i32::MAX]);
        assert_eq!(expected_selling_area(&item), 3 * i64::from(i32::MAX));
        assert!(!is_consistent(&item));
    }
}
