//! Branch stock service
//!
//! Stock records, product batches, expiry queries and low-stock transitions.
//! Reads compute derived fields in memory through [`StockLevel`]; the only
//! write to `low_stock_since` is [`StockService::evaluate_low_stock`], which
//! runs under a row lock in its own transaction.

use std::collections::HashMap;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{PgConnection, PgPool};
use validator::Validate;

use crate::error::{AppError, AppResult};
use crate::services::product::PRODUCT_COLUMNS;
use shared::models::{
    evaluate_and_update, Branch, BranchProduct, BranchProductPatch, BranchType, CreateBatchInput,
    ExpiryStatus, LowStockTransition, Product, ProductBatch, StockLevel,
};
use shared::types::Pagination;

const RECORD_COLUMNS: &str = "product_id, branch_id, quantity, is_available, low_stock_since";
const BATCH_COLUMNS: &str =
    "id, branch_id, product_id, quantity, expiration_date, is_active, created_at";

/// Stock service
#[derive(Clone)]
pub struct StockService {
    db: PgPool,
}

/// Filters for listing stock records
#[derive(Debug, Default, Clone, Deserialize)]
pub struct StockFilter {
    pub branch_id: Option<i32>,
    pub product_id: Option<i32>,
}

/// Stock record with its derived quantities
#[derive(Debug, Serialize)]
pub struct BranchProductView {
    pub product_id: i32,
    pub branch_id: i32,
    pub product_name: String,
    pub branch_name: String,
    pub branch_type: BranchType,
    pub quantity: i32,
    pub is_available: bool,
    pub peso_value: Decimal,
    pub current_expiration_date: Option<NaiveDate>,
    pub active_quantity: i64,
    pub low_stock_threshold: i32,
    pub is_low_stock: bool,
    pub low_stock_since: Option<DateTime<Utc>>,
    pub days_in_low_stock: i64,
}

impl BranchProductView {
    fn new(level: &StockLevel<'_>, branch: &Branch, now: DateTime<Utc>) -> Self {
        Self {
            product_id: level.record.product_id,
            branch_id: level.record.branch_id,
            product_name: level.product.name.clone(),
            branch_name: branch.branch_name.clone(),
            branch_type: level.branch_type,
            quantity: level.record.quantity,
            is_available: level.record.is_available,
            peso_value: level.peso_value(),
            current_expiration_date: level.current_expiration_date(),
            active_quantity: level.active_quantity(),
            low_stock_threshold: level.threshold(),
            is_low_stock: level.is_low_stock(),
            low_stock_since: level.record.low_stock_since,
            days_in_low_stock: level.days_in_low_stock(now),
        }
    }
}

/// Batch with expiry information relative to today
#[derive(Debug, Serialize)]
pub struct BatchView {
    #[serde(flatten)]
    pub batch: ProductBatch,
    pub days_until_expiry: i64,
    pub expiry_status: ExpiryStatus,
}

impl BatchView {
    fn new(batch: ProductBatch, today: NaiveDate) -> Self {
        Self {
            days_until_expiry: batch.days_until_expiry(today),
            expiry_status: batch.expiry_status(today),
            batch,
        }
    }
}

/// Active batch expiring soon, with names for display
#[derive(Debug, Serialize, sqlx::FromRow)]
pub struct ExpiringBatchRow {
    pub id: i32,
    pub branch_id: i32,
    pub product_id: i32,
    pub quantity: i32,
    pub expiration_date: NaiveDate,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub product_name: String,
    pub branch_name: String,
}

#[derive(Debug, Serialize)]
pub struct ExpiringBatch {
    #[serde(flatten)]
    pub row: ExpiringBatchRow,
    pub days_until_expiry: i64,
    pub expiry_status: ExpiryStatus,
}

/// A low-stock transition applied to a stock record
#[derive(Debug, Clone, Serialize)]
pub struct AppliedTransition {
    pub product_id: i32,
    pub branch_id: i32,
    pub transition: LowStockTransition,
}

/// Outcome of a sweep over every stock record
#[derive(Debug, Default, Serialize)]
pub struct SweepReport {
    pub evaluated: usize,
    pub transitions: Vec<AppliedTransition>,
}

async fn lock_record(
    conn: &mut PgConnection,
    product_id: i32,
    branch_id: i32,
) -> AppResult<BranchProduct> {
    sqlx::query_as::<_, BranchProduct>(&format!(
        "SELECT {RECORD_COLUMNS} FROM branch_products \
         WHERE product_id = $1 AND branch_id = $2 FOR UPDATE"
    ))
    .bind(product_id)
    .bind(branch_id)
    .fetch_optional(conn)
    .await?
    .ok_or_else(|| AppError::NotFound("Branch product".into()))
}

async fn batches_for(
    conn: &mut PgConnection,
    product_id: i32,
    branch_id: i32,
) -> AppResult<Vec<ProductBatch>> {
    let batches = sqlx::query_as::<_, ProductBatch>(&format!(
        "SELECT {BATCH_COLUMNS} FROM product_batches \
         WHERE product_id = $1 AND branch_id = $2 ORDER BY expiration_date, id"
    ))
    .bind(product_id)
    .bind(branch_id)
    .fetch_all(conn)
    .await?;
    Ok(batches)
}

impl StockService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// List stock records with derived fields
    pub async fn list_branch_products(
        &self,
        filter: StockFilter,
        page: Pagination,
    ) -> AppResult<Vec<BranchProductView>> {
        let (skip, limit) = page.window();
        let records = sqlx::query_as::<_, BranchProduct>(&format!(
            r#"
            SELECT {RECORD_COLUMNS} FROM branch_products
            WHERE ($1::int IS NULL OR branch_id = $1)
              AND ($2::int IS NULL OR product_id = $2)
            ORDER BY branch_id, product_id
            OFFSET $3 LIMIT $4
            "#
        ))
        .bind(filter.branch_id)
        .bind(filter.product_id)
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;

        self.describe(records, Utc::now()).await
    }

    /// Records that are currently low-stock
    pub async fn list_low_stock(&self, branch_id: Option<i32>) -> AppResult<Vec<BranchProductView>> {
        let records = sqlx::query_as::<_, BranchProduct>(&format!(
            r#"
            SELECT {RECORD_COLUMNS} FROM branch_products
            WHERE is_available AND ($1::int IS NULL OR branch_id = $1)
            ORDER BY branch_id, product_id
            "#
        ))
        .bind(branch_id)
        .fetch_all(&self.db)
        .await?;

        let views = self.describe(records, Utc::now()).await?;
        Ok(views.into_iter().filter(|v| v.is_low_stock).collect())
    }

    /// Attach product, branch and batch data to records
    async fn describe(
        &self,
        records: Vec<BranchProduct>,
        now: DateTime<Utc>,
    ) -> AppResult<Vec<BranchProductView>> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let product_ids: Vec<i32> = records.iter().map(|r| r.product_id).collect();
        let branch_ids: Vec<i32> = records.iter().map(|r| r.branch_id).collect();

        let products: HashMap<i32, Product> = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(&product_ids)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();

        let branches: HashMap<i32, Branch> = sqlx::query_as::<_, Branch>(
            "SELECT id, branch_name, location, is_active, branch_type FROM branches WHERE id = ANY($1)",
        )
        .bind(&branch_ids)
        .fetch_all(&self.db)
        .await?
        .into_iter()
        .map(|b| (b.id, b))
        .collect();

        let mut batches: HashMap<(i32, i32), Vec<ProductBatch>> = HashMap::new();
        let rows = sqlx::query_as::<_, ProductBatch>(&format!(
            r#"
            SELECT {BATCH_COLUMNS} FROM product_batches
            WHERE (product_id, branch_id) IN (SELECT * FROM UNNEST($1::int[], $2::int[]))
            "#
        ))
        .bind(&product_ids)
        .bind(&branch_ids)
        .fetch_all(&self.db)
        .await?;
        for batch in rows {
            batches
                .entry((batch.product_id, batch.branch_id))
                .or_default()
                .push(batch);
        }

        let mut views = Vec::with_capacity(records.len());
        for record in &records {
            // Both sides are FK-protected; a miss means a concurrent delete
            let (Some(product), Some(branch)) =
                (products.get(&record.product_id), branches.get(&record.branch_id))
            else {
                continue;
            };
            let record_batches = batches
                .get(&(record.product_id, record.branch_id))
                .map(Vec::as_slice)
                .unwrap_or_default();
            let level = StockLevel::new(record, product, branch.branch_type, record_batches);
            views.push(BranchProductView::new(&level, branch, now));
        }
        Ok(views)
    }

    /// Patch quantity and availability of a stock record
    pub async fn update_branch_product(
        &self,
        branch_id: i32,
        product_id: i32,
        patch: BranchProductPatch,
    ) -> AppResult<BranchProduct> {
        patch.validate()?;

        let mut tx = self.db.begin().await?;
        let mut record = lock_record(&mut tx, product_id, branch_id).await?;
        patch.apply(&mut record);

        sqlx::query(
            "UPDATE branch_products SET quantity = $3, is_available = $4 \
             WHERE product_id = $1 AND branch_id = $2",
        )
        .bind(product_id)
        .bind(branch_id)
        .bind(record.quantity)
        .bind(record.is_available)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        if patch.is_available.is_some() {
            if let Some(applied) = self.evaluate_low_stock(product_id, branch_id).await? {
                record.low_stock_since = match applied.transition {
                    LowStockTransition::Entered { at } => Some(at),
                    LowStockTransition::Cleared { .. } => None,
                };
            }
        }

        Ok(record)
    }

    pub async fn delete_branch_product(&self, branch_id: i32, product_id: i32) -> AppResult<()> {
        let result =
            sqlx::query("DELETE FROM branch_products WHERE product_id = $1 AND branch_id = $2")
                .bind(product_id)
                .bind(branch_id)
                .execute(&self.db)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Branch product".into()));
        }
        Ok(())
    }

    pub async fn list_batches(&self, branch_id: i32, product_id: i32) -> AppResult<Vec<BatchView>> {
        let mut conn = self.db.acquire().await?;

        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM branch_products WHERE product_id = $1 AND branch_id = $2)",
        )
        .bind(product_id)
        .bind(branch_id)
        .fetch_one(&mut *conn)
        .await?;
        if !exists {
            return Err(AppError::NotFound("Branch product".into()));
        }

        let today = Utc::now().date_naive();
        let batches = batches_for(&mut conn, product_id, branch_id).await?;
        Ok(batches
            .into_iter()
            .map(|b| BatchView::new(b, today))
            .collect())
    }

    /// Add a dated batch to a stock record and re-evaluate its low-stock state
    pub async fn add_batch(
        &self,
        branch_id: i32,
        product_id: i32,
        input: CreateBatchInput,
    ) -> AppResult<BatchView> {
        input.validate()?;

        let mut tx = self.db.begin().await?;
        lock_record(&mut tx, product_id, branch_id).await?;

        let batch = sqlx::query_as::<_, ProductBatch>(&format!(
            r#"
            INSERT INTO product_batches (branch_id, product_id, quantity, expiration_date, is_active)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {BATCH_COLUMNS}
            "#
        ))
        .bind(branch_id)
        .bind(product_id)
        .bind(input.quantity)
        .bind(input.expiration_date)
        .bind(input.is_active)
        .fetch_one(&mut *tx)
        .await?;
        tx.commit().await?;

        self.evaluate_low_stock(product_id, branch_id).await?;

        Ok(BatchView::new(batch, Utc::now().date_naive()))
    }

    /// Active batches expiring within `days` from today, soonest first
    pub async fn expiring_batches(
        &self,
        branch_id: Option<i32>,
        days: i64,
    ) -> AppResult<Vec<ExpiringBatch>> {
        let today = Utc::now().date_naive();
        let horizon = today + Duration::days(days.max(0));

        let rows = sqlx::query_as::<_, ExpiringBatchRow>(
            r#"
            SELECT pb.id, pb.branch_id, pb.product_id, pb.quantity, pb.expiration_date,
                   pb.is_active, pb.created_at, p.name AS product_name, b.branch_name
            FROM product_batches pb
            JOIN products p ON p.id = pb.product_id
            JOIN branches b ON b.id = pb.branch_id
            WHERE pb.is_active
              AND pb.expiration_date <= $1
              AND ($2::int IS NULL OR pb.branch_id = $2)
            ORDER BY pb.expiration_date, pb.id
            "#,
        )
        .bind(horizon)
        .bind(branch_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let days_until_expiry = (row.expiration_date - today).num_days();
                ExpiringBatch {
                    row,
                    days_until_expiry,
                    expiry_status: ExpiryStatus::from_days(days_until_expiry),
                }
            })
            .collect())
    }

    /// Evaluate one stock record's low-stock state under a row lock and
    /// persist the transition, if any
    pub async fn evaluate_low_stock(
        &self,
        product_id: i32,
        branch_id: i32,
    ) -> AppResult<Option<AppliedTransition>> {
        let mut tx = self.db.begin().await?;
        let mut record = lock_record(&mut tx, product_id, branch_id).await?;

        let product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(product_id)
        .fetch_one(&mut *tx)
        .await?;
        let branch_type =
            sqlx::query_scalar::<_, BranchType>("SELECT branch_type FROM branches WHERE id = $1")
                .bind(branch_id)
                .fetch_one(&mut *tx)
                .await?;
        let batches = batches_for(&mut tx, product_id, branch_id).await?;

        let transition =
            evaluate_and_update(&mut record, &product, branch_type, &batches, Utc::now());

        let Some(transition) = transition else {
            tx.commit().await?;
            return Ok(None);
        };

        sqlx::query(
            "UPDATE branch_products SET low_stock_since = $3 \
             WHERE product_id = $1 AND branch_id = $2",
        )
        .bind(product_id)
        .bind(branch_id)
        .bind(record.low_stock_since)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        match transition {
            LowStockTransition::Entered { at } => {
                tracing::info!(product_id, branch_id, %at, "stock record entered low stock")
            }
            LowStockTransition::Cleared { since } => {
                tracing::info!(product_id, branch_id, %since, "stock record left low stock")
            }
        }

        Ok(Some(AppliedTransition {
            product_id,
            branch_id,
            transition,
        }))
    }

    /// Evaluate every stock record, each in its own transaction
    pub async fn sweep_low_stock(&self) -> AppResult<SweepReport> {
        let keys = sqlx::query_as::<_, (i32, i32)>(
            "SELECT product_id, branch_id FROM branch_products ORDER BY branch_id, product_id",
        )
        .fetch_all(&self.db)
        .await?;

        let mut report = SweepReport::default();
        for (product_id, branch_id) in keys {
            match self.evaluate_low_stock(product_id, branch_id).await {
                Ok(applied) => {
                    report.evaluated += 1;
                    report.transitions.extend(applied);
                }
                // Deleted between listing and locking
                Err(AppError::NotFound(_)) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(report)
    }
}
