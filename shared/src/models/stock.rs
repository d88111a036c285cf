//! Branch stock, product batches and low-stock tracking

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{BranchType, Product};

/// Stock record for one (product, branch) pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct BranchProduct {
    pub product_id: i32,
    pub branch_id: i32,
    pub quantity: i32,
    pub is_available: bool,
    /// Start of the current continuous low-stock condition
    pub low_stock_since: Option<DateTime<Utc>>,
}

/// A dated lot of stock for a (product, branch) pair
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ProductBatch {
    pub id: i32,
    pub branch_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub expiration_date: NaiveDate,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

/// Expiry bucket of a batch
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExpiryStatus {
    /// 0 days or fewer left
    Expired,
    /// 30 days or fewer
    Critical,
    /// 90 days or fewer
    Warning,
    Good,
}

impl ExpiryStatus {
    pub fn from_days(days_until_expiry: i64) -> Self {
        match days_until_expiry {
            d if d <= 0 => ExpiryStatus::Expired,
            d if d <= 30 => ExpiryStatus::Critical,
            d if d <= 90 => ExpiryStatus::Warning,
            _ => ExpiryStatus::Good,
        }
    }
}

impl ProductBatch {
    pub fn days_until_expiry(&self, today: NaiveDate) -> i64 {
        (self.expiration_date - today).num_days()
    }

    pub fn expiry_status(&self, today: NaiveDate) -> ExpiryStatus {
        ExpiryStatus::from_days(self.days_until_expiry(today))
    }
}

/// Read-only view over a stock record and everything its derived values need.
///
/// All methods are pure; persisting a low-stock transition goes through
/// [`evaluate_and_update`].
#[derive(Debug, Clone, Copy)]
pub struct StockLevel<'a> {
    pub record: &'a BranchProduct,
    pub product: &'a Product,
    pub branch_type: BranchType,
    pub batches: &'a [ProductBatch],
}

impl<'a> StockLevel<'a> {
    pub fn new(
        record: &'a BranchProduct,
        product: &'a Product,
        branch_type: BranchType,
        batches: &'a [ProductBatch],
    ) -> Self {
        Self {
            record,
            product,
            branch_type,
            batches,
        }
    }

    /// Money value of on-hand stock at catalog cost
    pub fn peso_value(&self) -> Decimal {
        Decimal::from(self.record.quantity) * self.product.cost
    }

    /// Nearest expiration among active batches
    pub fn current_expiration_date(&self) -> Option<NaiveDate> {
        active_batches(self.batches).map(|b| b.expiration_date).min()
    }

    pub fn active_quantity(&self) -> i64 {
        active_batches(self.batches).map(|b| i64::from(b.quantity)).sum()
    }

    pub fn threshold(&self) -> i32 {
        self.product.threshold_for(self.branch_type)
    }

    /// Unavailable records are never low-stock. The boundary is inclusive.
    pub fn is_low_stock(&self) -> bool {
        self.record.is_available && self.active_quantity() <= i64::from(self.threshold())
    }

    pub fn days_in_low_stock(&self, now: DateTime<Utc>) -> i64 {
        days_in_low_stock(self.record.low_stock_since, now)
    }
}

fn active_batches(batches: &[ProductBatch]) -> impl Iterator<Item = &ProductBatch> {
    batches.iter().filter(|b| b.is_active)
}

/// Whole days elapsed since `since`, never negative
pub fn days_in_low_stock(since: Option<DateTime<Utc>>, now: DateTime<Utc>) -> i64 {
    since.map_or(0, |since| (now - since).num_days().max(0))
}

/// Result of evaluating a stock record's low-stock state
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LowStockTransition {
    /// Record became low-stock at the given moment
    Entered { at: DateTime<Utc> },
    /// Record recovered; carries the moment it had been low since
    Cleared { since: DateTime<Utc> },
}

/// Evaluate the low-stock state of `record` and update `low_stock_since` when
/// it crossed the threshold.
///
/// Returns `None` when nothing changed, so repeated calls while the quantity
/// stays on one side of the threshold are no-ops. Unavailable records are
/// skipped entirely and keep whatever timestamp they carry.
pub fn evaluate_and_update(
    record: &mut BranchProduct,
    product: &Product,
    branch_type: BranchType,
    batches: &[ProductBatch],
    now: DateTime<Utc>,
) -> Option<LowStockTransition> {
    if !record.is_available {
        return None;
    }

    let is_low = StockLevel::new(record, product, branch_type, batches).is_low_stock();

    match (is_low, record.low_stock_since) {
        (true, None) => {
            record.low_stock_since = Some(now);
            Some(LowStockTransition::Entered { at: now })
        }
        (false, Some(since)) => {
            record.low_stock_since = None;
            Some(LowStockTransition::Cleared { since })
        }
        _ => None,
    }
}

/// Partial update of a stock record
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct BranchProductPatch {
    #[validate(range(min = 0))]
    pub quantity: Option<i32>,
    pub is_available: Option<bool>,
}

impl BranchProductPatch {
    pub fn apply(&self, record: &mut BranchProduct) {
        if let Some(quantity) = self.quantity {
            record.quantity = quantity;
        }
        if let Some(is_available) = self.is_available {
            record.is_available = is_available;
        }
    }
}

/// Input for adding a batch to a stock record
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBatchInput {
    #[validate(range(min = 0))]
    pub quantity: i32,
    pub expiration_date: NaiveDate,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

fn default_true() -> bool {
    true
}
