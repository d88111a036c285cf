//! Inventory reconciliation report models

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Outcome of a submission, fixed at creation time
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "report_status", rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// At least one line failed the count check; stock left untouched
    Pending,
    /// Every line matched; stock committed
    Approved,
}

impl ReportStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Approved => "approved",
        }
    }
}

/// Kind of stock movement a report batch documents
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(
    feature = "sqlx",
    sqlx(type_name = "report_batch_type", rename_all = "snake_case")
)]
#[serde(rename_all = "snake_case")]
pub enum BatchType {
    Delivery,
    Transfer,
    PullOut,
}

/// One reconciliation submission for a branch
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InvReport {
    pub id: i32,
    pub branch_id: i32,
    pub created_at: DateTime<Utc>,
    pub last_edit: Option<DateTime<Utc>>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: ReportStatus,
    pub viewed_by: Option<i32>,
    pub is_viewed: bool,
    pub items_count: i32,
    pub products_with_delivery: i32,
    pub products_with_transfer: i32,
    pub products_with_pullout: i32,
    pub products_with_offtake: i32,
    pub total_offtake_value: Decimal,
}

/// One product's line within a report, with prices frozen at submission
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InvReportItem {
    pub id: i32,
    pub invreport_id: i32,
    pub product_id: i32,
    pub beginning: i32,
    pub deliver: i32,
    pub transfer: i32,
    pub pull_out: i32,
    pub offtake: i32,
    pub selling_area: i32,
    pub current_cost: Decimal,
    pub current_srp: Decimal,
}

impl InvReportItem {
    /// Money value of the counted selling-area stock at the frozen cost
    pub fn peso_value(&self) -> Decimal {
        Decimal::from(self.selling_area) * self.current_cost
    }
}

/// Audit detail of a delivery, transfer or pull-out attached to a line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct InvReportBatch {
    pub id: i32,
    pub invreport_item_id: i32,
    pub quantity: i32,
    pub expiration_date: NaiveDate,
    pub batch_type: BatchType,
    pub created_at: DateTime<Utc>,
}

/// Batches of one movement type
pub fn batches_of_type(
    batches: &[InvReportBatch],
    batch_type: BatchType,
) -> impl Iterator<Item = &InvReportBatch> {
    batches.iter().filter(move |b| b.batch_type == batch_type)
}

/// Per-type quantity sums over a line's batches
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BatchTotals {
    pub deliver: i64,
    pub transfer: i64,
    pub pull_out: i64,
}

impl BatchTotals {
    pub fn from_batches(batches: &[InvReportBatch]) -> Self {
        let sum = |t: BatchType| -> i64 {
            batches_of_type(batches, t).map(|b| i64::from(b.quantity)).sum()
        };
        Self {
            deliver: sum(BatchType::Delivery),
            transfer: sum(BatchType::Transfer),
            pull_out: sum(BatchType::PullOut),
        }
    }
}

// ============================================================================
// Submission input
// ============================================================================

/// A physical count submission for one branch
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_period"))]
pub struct CreateInvReportInput {
    pub branch_id: i32,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[validate]
    pub items: Vec<InvReportItemInput>,
}

fn validate_period(input: &CreateInvReportInput) -> Result<(), ValidationError> {
    match (input.start_date, input.end_date) {
        (Some(start), Some(end)) if start > end => {
            let mut err = ValidationError::new("period");
            err.message = Some("start_date must not be after end_date".into());
            Err(err)
        }
        _ => Ok(()),
    }
}

/// One counted line of a submission
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Eq)]
pub struct InvReportItemInput {
    pub product_id: i32,
    #[validate(range(min = 0))]
    pub beginning: i32,
    #[validate(range(min = 0))]
    pub deliver: i32,
    #[validate(range(min = 0))]
    pub transfer: i32,
    #[validate(range(min = 0))]
    pub pull_out: i32,
    #[validate(range(min = 0))]
    pub offtake: i32,
    #[validate(range(min = 0))]
    pub selling_area: i32,
    #[serde(default)]
    #[validate]
    pub batches: Vec<InvReportBatchInput>,
}

/// Batch detail supplied with a line
#[derive(Debug, Clone, Serialize, Deserialize, Validate, PartialEq, Eq)]
pub struct InvReportBatchInput {
    #[validate(range(min = 0))]
    pub quantity: i32,
    pub expiration_date: NaiveDate,
    pub batch_type: BatchType,
}

// ============================================================================
// Response shapes
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvReportBatchResponse {
    pub id: i32,
    pub quantity: i32,
    pub expiration_date: NaiveDate,
    pub batch_type: BatchType,
}

impl From<&InvReportBatch> for InvReportBatchResponse {
    fn from(batch: &InvReportBatch) -> Self {
        Self {
            id: batch.id,
            quantity: batch.quantity,
            expiration_date: batch.expiration_date,
            batch_type: batch.batch_type,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvReportItemResponse {
    pub id: i32,
    pub product_id: i32,
    pub beginning: i32,
    pub deliver: i32,
    pub transfer: i32,
    pub pull_out: i32,
    pub offtake: i32,
    pub selling_area: i32,
    pub current_cost: Decimal,
    pub current_srp: Decimal,
    pub peso_value: Decimal,
    pub batch_totals: BatchTotals,
    pub batches: Vec<InvReportBatchResponse>,
}

impl InvReportItemResponse {
    pub fn new(item: &InvReportItem, batches: &[InvReportBatch]) -> Self {
        Self {
            id: item.id,
            product_id: item.product_id,
            beginning: item.beginning,
            deliver: item.deliver,
            transfer: item.transfer,
            pull_out: item.pull_out,
            offtake: item.offtake,
            selling_area: item.selling_area,
            current_cost: item.current_cost,
            current_srp: item.current_srp,
            peso_value: item.peso_value(),
            batch_totals: BatchTotals::from_batches(batches),
            batches: batches.iter().map(InvReportBatchResponse::from).collect(),
        }
    }
}

/// A report with its lines, as returned by every report endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvReportResponse {
    pub id: i32,
    pub branch_id: i32,
    pub date_created: NaiveDate,
    pub last_edit: Option<NaiveDate>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub status: ReportStatus,
    pub is_viewed: bool,
    pub viewed_by: Option<i32>,
    pub items_count: i32,
    pub products_with_delivery: i32,
    pub products_with_transfer: i32,
    pub products_with_pullout: i32,
    pub products_with_offtake: i32,
    pub total_offtake_value: Decimal,
    pub items: Vec<InvReportItemResponse>,
}

impl InvReportResponse {
    pub fn new(report: &InvReport, items: Vec<InvReportItemResponse>) -> Self {
        Self {
            id: report.id,
            branch_id: report.branch_id,
            date_created: report.created_at.date_naive(),
            last_edit: report.last_edit.map(|d| d.date_naive()),
            start_date: report.start_date,
            end_date: report.end_date,
            status: report.status,
            is_viewed: report.is_viewed,
            viewed_by: report.viewed_by,
            items_count: report.items_count,
            products_with_delivery: report.products_with_delivery,
            products_with_transfer: report.products_with_transfer,
            products_with_pullout: report.products_with_pullout,
            products_with_offtake: report.products_with_offtake,
            total_offtake_value: report.total_offtake_value,
            items,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn batch(id: i32, quantity: i32, batch_type: BatchType) -> InvReportBatch {
        InvReportBatch {
            id,
            invreport_item_id: 1,
            quantity,
            expiration_date: NaiveDate::from_ymd_opt(2025, 12, 31).unwrap(),
            batch_type,
            created_at: Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(),
        }
    }

    #[test]
    fn batch_totals_group_by_type() {
        let batches = vec![
            batch(1, 5, BatchType::Delivery),
            batch(2, 7, BatchType::Delivery),
            batch(3, 2, BatchType::PullOut),
        ];
        let totals = BatchTotals::from_batches(&batches);
        assert_eq!(
            totals,
            BatchTotals {
                deliver: 12,
                transfer: 0,
                pull_out: 2
            }
        );
        assert_eq!(batches_of_type(&batches, BatchType::Delivery).count(), 2);
        assert_eq!(batches_of_type(&batches, BatchType::Transfer).count(), 0);
    }

    #[test]
    fn pull_out_wire_name() {
        let json = serde_json::to_string(&BatchType::PullOut).unwrap();
        assert_eq!(json, "\"pull_out\"");
    }

    #[test]
    fn item_peso_value_uses_frozen_cost() {
        let item = InvReportItem {
            id: 1,
            invreport_id: 1,
            product_id: 7,
            beginning: 10,
            deliver: 5,
            transfer: 0,
            pull_out: 2,
            offtake: 3,
            selling_area: 10,
            current_cost: Decimal::new(325, 2),
            current_srp: Decimal::new(500, 2),
        };
        assert_eq!(item.peso_value(), Decimal::new(3250, 2));
    }

    #[test]
    fn negative_count_fails_validation() {
        let input: CreateInvReportInput = serde_json::from_str(
            r#"{"branch_id": 1, "items": [{"product_id": 7, "beginning": 10, "deliver": -1,
                "transfer": 0, "pull_out": 0, "offtake": 0, "selling_area": 9}]}"#,
        )
        .unwrap();
        assert!(input.validate().is_err());
    }

    #[test]
    fn inverted_period_fails_validation() {
        let input = CreateInvReportInput {
            branch_id: 1,
            start_date: Some(Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap()),
            end_date: Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()),
            items: vec![],
        };
        assert!(input.validate().is_err());
    }

    #[test]
    fn batches_default_to_empty() {
        let item: InvReportItemInput = serde_json::from_str(
            r#"{"product_id": 7, "beginning": 10, "deliver": 5, "transfer": 0,
                "pull_out": 2, "offtake": 3, "selling_area": 10}"#,
        )
        .unwrap();
        assert!(item.batches.is_empty());
        assert!(item.validate().is_ok());
    }
}
