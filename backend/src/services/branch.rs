//! Branch service

use sqlx::{PgExecutor, PgPool};
use validator::Validate;

use crate::error::{AppError, AppResult};
use shared::models::{Branch, BranchPatch, CreateBranchInput};
use shared::types::Pagination;

const BRANCH_COLUMNS: &str = "id, branch_name, location, is_active, branch_type";

/// Branch service
#[derive(Clone)]
pub struct BranchService {
    db: PgPool,
}

/// Load a branch through any executor, 404 when absent
pub async fn fetch_branch<'e>(executor: impl PgExecutor<'e>, branch_id: i32) -> AppResult<Branch> {
    sqlx::query_as::<_, Branch>(&format!(
        "SELECT {BRANCH_COLUMNS} FROM branches WHERE id = $1"
    ))
    .bind(branch_id)
    .fetch_optional(executor)
    .await?
    .ok_or_else(|| AppError::NotFound("Branch".into()))
}

impl BranchService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Create a branch and seed an unavailable, empty stock row for every product
    pub async fn create_branch(&self, input: CreateBranchInput) -> AppResult<Branch> {
        input.validate()?;

        let mut tx = self.db.begin().await?;

        let branch = sqlx::query_as::<_, Branch>(&format!(
            r#"
            INSERT INTO branches (branch_name, location, is_active, branch_type)
            VALUES ($1, $2, $3, $4)
            RETURNING {BRANCH_COLUMNS}
            "#
        ))
        .bind(&input.branch_name)
        .bind(&input.location)
        .bind(input.is_active)
        .bind(input.branch_type)
        .fetch_one(&mut *tx)
        .await?;

        let seeded = sqlx::query(
            r#"
            INSERT INTO branch_products (product_id, branch_id, quantity, is_available)
            SELECT id, $1, 0, FALSE FROM products
            ON CONFLICT (product_id, branch_id) DO NOTHING
            "#,
        )
        .bind(branch.id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        tracing::info!(
            branch_id = branch.id,
            branch_type = branch.branch_type.as_str(),
            seeded_stock_rows = seeded,
            "branch created"
        );
        Ok(branch)
    }

    pub async fn list_branches(&self, page: Pagination) -> AppResult<Vec<Branch>> {
        let (skip, limit) = page.window();
        let branches = sqlx::query_as::<_, Branch>(&format!(
            "SELECT {BRANCH_COLUMNS} FROM branches ORDER BY id OFFSET $1 LIMIT $2"
        ))
        .bind(skip)
        .bind(limit)
        .fetch_all(&self.db)
        .await?;
        Ok(branches)
    }

    pub async fn get_branch(&self, branch_id: i32) -> AppResult<Branch> {
        fetch_branch(&self.db, branch_id).await
    }

    /// Apply a partial update
    pub async fn update_branch(&self, branch_id: i32, patch: BranchPatch) -> AppResult<Branch> {
        patch.validate()?;

        let mut tx = self.db.begin().await?;

        let mut branch = sqlx::query_as::<_, Branch>(&format!(
            "SELECT {BRANCH_COLUMNS} FROM branches WHERE id = $1 FOR UPDATE"
        ))
        .bind(branch_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Branch".into()))?;

        patch.apply(&mut branch);

        sqlx::query(
            "UPDATE branches SET branch_name = $2, location = $3, is_active = $4 WHERE id = $1",
        )
        .bind(branch.id)
        .bind(&branch.branch_name)
        .bind(&branch.location)
        .bind(branch.is_active)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(branch)
    }
}
