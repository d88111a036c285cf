//! Product catalog models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::BranchType;
use crate::validation::validate_non_negative_amount;

/// Threshold applied when a product is created without one
pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 50;

/// A catalog entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: i32,
    pub name: String,
    pub cost: Decimal,
    /// Suggested retail price
    pub srp: Decimal,
    pub retail_low_stock_threshold: i32,
    pub wholesale_low_stock_threshold: i32,
    pub is_retail_available: bool,
    pub is_wholesale_available: bool,
    pub image_url: Option<String>,
}

impl Product {
    /// Low-stock threshold for the given sales channel
    pub fn threshold_for(&self, branch_type: BranchType) -> i32 {
        match branch_type {
            BranchType::Wholesale => self.wholesale_low_stock_threshold,
            BranchType::Retail => self.retail_low_stock_threshold,
        }
    }
}

/// Input for creating a product
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateProductInput {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(custom = "validate_non_negative_amount")]
    pub cost: Decimal,
    #[validate(custom = "validate_non_negative_amount")]
    pub srp: Decimal,
    #[serde(default = "default_threshold")]
    #[validate(range(min = 1))]
    pub retail_low_stock_threshold: i32,
    #[serde(default = "default_threshold")]
    #[validate(range(min = 1))]
    pub wholesale_low_stock_threshold: i32,
    #[serde(default = "default_true")]
    pub is_retail_available: bool,
    #[serde(default)]
    pub is_wholesale_available: bool,
    pub image_url: Option<String>,
}

fn default_threshold() -> i32 {
    DEFAULT_LOW_STOCK_THRESHOLD
}

fn default_true() -> bool {
    true
}

/// Partial update of a product; each present field is applied on its own
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct ProductPatch {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(custom = "validate_non_negative_amount")]
    pub cost: Option<Decimal>,
    #[validate(custom = "validate_non_negative_amount")]
    pub srp: Option<Decimal>,
    #[validate(range(min = 1))]
    pub retail_low_stock_threshold: Option<i32>,
    #[validate(range(min = 1))]
    pub wholesale_low_stock_threshold: Option<i32>,
    pub is_retail_available: Option<bool>,
    pub is_wholesale_available: Option<bool>,
    pub image_url: Option<String>,
}

impl ProductPatch {
    /// Apply the patch and report whether cost or SRP actually changed
    pub fn apply(&self, product: &mut Product) -> bool {
        let mut price_changed = false;

        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(cost) = self.cost {
            price_changed |= product.cost != cost;
            product.cost = cost;
        }
        if let Some(srp) = self.srp {
            price_changed |= product.srp != srp;
            product.srp = srp;
        }
        if let Some(threshold) = self.retail_low_stock_threshold {
            product.retail_low_stock_threshold = threshold;
        }
        if let Some(threshold) = self.wholesale_low_stock_threshold {
            product.wholesale_low_stock_threshold = threshold;
        }
        if let Some(flag) = self.is_retail_available {
            product.is_retail_available = flag;
        }
        if let Some(flag) = self.is_wholesale_available {
            product.is_wholesale_available = flag;
        }
        if let Some(url) = &self.image_url {
            product.image_url = Some(url.clone());
        }

        price_changed
    }
}

/// A recorded cost/SRP pair for a product
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PriceHistory {
    pub id: i32,
    pub product_id: i32,
    pub date: DateTime<Utc>,
    pub cost: Decimal,
    pub srp: Decimal,
}
