//! Product catalog service

use sqlx::PgPool;
use validator::Validate;

use crate::error::{AppError, AppResult};
use shared::models::{CreateProductInput, PriceHistory, Product, ProductPatch};
use shared::types::Pagination;

pub(crate) const PRODUCT_COLUMNS: &str = "id, name, cost, srp, retail_low_stock_threshold, \
     wholesale_low_stock_threshold, is_retail_available, is_wholesale_available, image_url";

/// Product service
#[derive(Clone)]
pub struct ProductService {
    db: PgPool,
}

impl ProductService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a product, record its opening price, and seed an unavailable,
    /// empty stock row in every active branch
    pub async fn create_product(&self, input: CreateProductInput) -> AppResult<Product> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let product = sqlx::query_as::<_, Product>(&format!(
            r#"
            INSERT INTO products (
                name, cost, srp, retail_low_stock_threshold, wholesale_low_stock_threshold,
                is_retail_available, is_wholesale_available, image_url
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(&input.name)
        .bind(input.cost)
        .bind(input.srp)
        .bind(input.retail_low_stock_threshold)
        .bind(input.wholesale_low_stock_threshold)
        .bind(input.is_retail_available)
        .bind(input.is_wholesale_available)
        .bind(&input.image_url)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO price_history (product_id, cost, srp) VALUES ($1, $2, $3)")
            .bind(product.id)
            .bind(product.cost)
            .bind(product.srp)
            .execute(&mut *tx)
            .await?;

        let seeded = sqlx::query(
            r#"
            INSERT INTO branch_products (product_id, branch_id, quantity, is_available)
            SELECT $1, id, 0, FALSE FROM branches WHERE is_active
            ON CONFLICT (product_id, branch_id) DO NOTHING
            "#,
        )
        .bind(product.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        tracing::info!(product_id = product.id, seeded_stock_rows = seeded, "product created");
        Ok(product)
    }

    pub async fn list_products(&self, page: Pagination) -> AppResult<Vec<Product>> {
        let (skip, limit) = page.window();
        let products = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY id OFFSET $1 LIMIT $2"
        ))
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(products)
    }

    pub async fn get_product(&self, product_id: i32) -> AppResult<Product> {
        sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(product_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".into()))
    }

    /// Apply a partial update, appending to price history when cost or SRP changed
    pub async fn update_product(&self, product_id: i32, patch: ProductPatch) -> AppResult<Product> {
        patch.validate()?;

        let mut tx = self.db.begin().await?;

        let mut product = sqlx::query_as::<_, Product>(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 FOR UPDATE"
        ))
        .bind(product_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Product".into()))?;

        let price_changed = patch.apply(&mut product);

        sqlx::query(
            r#"
            UPDATE products SET
                name = $2, cost = $3, srp = $4,
                retail_low_stock_threshold = $5, wholesale_low_stock_threshold = $6,
                is_retail_available = $7, is_wholesale_available = $8, image_url = $9
            WHERE id = $1
            "#,
        )
        .bind(product.id)
        .bind(&product.name)
        .bind(product.cost)
        .bind(product.srp)
        .bind(product.retail_low_stock_threshold)
        .bind(product.wholesale_low_stock_threshold)
        .bind(product.is_retail_available)
        .bind(product.is_wholesale_available)
        .bind(&product.image_url)
        .execute(&mut *tx)
        .await?;

        if price_changed {
            sqlx::query("INSERT INTO price_history (product_id, cost, srp) VALUES ($1, $2, $3)")
                .bind(product.id)
                .bind(product.cost)
                .bind(product.srp)
                .execute(&mut *tx)
                .await?;
            tracing::info!(product_id = product.id, cost = %product.cost, srp = %product.srp, "price changed");
        }

        tx.commit().await?;
        Ok(product)
    }

    /// Delete a product together with its stock rows and batches.
    ///
    /// Refused with a conflict while any report line references it.
    pub async fn delete_product(&self, product_id: i32) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let referenced = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM invreport_items WHERE product_id = $1)",
        )
        .bind(product_id)
        .fetch_one(&mut *tx)
        .await?;

        if referenced {
            return Err(AppError::Conflict(format!(
                "Product with id {} is referenced by inventory reports",
                product_id
            )));
        }

        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(product_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Product".into()));
        }

        tx.commit().await?;

        tracing::info!(product_id, "product deleted");
        Ok(())
    }

    /// Price history, newest first
    pub async fn price_history(&self, product_id: i32) -> AppResult<Vec<PriceHistory>> {
        // 404 on unknown product rather than an empty list
        self.get_product(product_id).await?;

        let history = sqlx::query_as::<_, PriceHistory>(
            r#"
            SELECT id, product_id, date, cost, srp
            FROM price_history
            WHERE product_id = $1
            ORDER BY date DESC, id DESC
            "#,
        )
        .bind(product_id)
        .fetch_all(&self.db)
        .await?;
        Ok(history)
    }
}
