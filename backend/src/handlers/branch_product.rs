//! HTTP handlers for branch stock, batches and low-stock tracking

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::extract::{Json, Path, Query};
use crate::middleware::{require_branch_access, require_role, AuthUser, CurrentUser};
use crate::services::stock::{
    BatchView, BranchProductView, ExpiringBatch, StockFilter, SweepReport,
};
use crate::services::StockService;
use crate::AppState;
use shared::models::{BranchProduct, BranchProductPatch, CreateBatchInput, UserRole};
use shared::types::Pagination;

const STOCK_ROLES: &[UserRole] = &[UserRole::Admin, UserRole::Pharmacist];

#[derive(Debug, Deserialize)]
pub struct BranchQuery {
    pub branch_id: Option<i32>,
}

#[derive(Debug, Deserialize)]
pub struct ExpiringQuery {
    pub branch_id: Option<i32>,
    #[serde(default = "default_expiry_days")]
    pub days: i64,
}

fn default_expiry_days() -> i64 {
    90
}

/// Branch a query is limited to: whatever an admin asked for, otherwise the
/// caller's own branch
fn scoped_branch(user: &AuthUser, requested: Option<i32>) -> AppResult<Option<i32>> {
    if user.is_admin() {
        return Ok(requested);
    }
    user.branch_id
        .map(Some)
        .ok_or(AppError::InsufficientPermissions)
}

pub async fn list_branch_products(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(filter): Query<StockFilter>,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Vec<BranchProductView>>> {
    require_role(&current_user.0, STOCK_ROLES)?;

    let filter = StockFilter {
        branch_id: scoped_branch(&current_user.0, filter.branch_id)?,
        ..filter
    };

    let service = StockService::new(state.db);
    Ok(Json(service.list_branch_products(filter, page).await?))
}

pub async fn update_branch_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((branch_id, product_id)): Path<(i32, i32)>,
    Json(patch): Json<BranchProductPatch>,
) -> AppResult<Json<BranchProduct>> {
    require_role(&current_user.0, STOCK_ROLES)?;
    require_branch_access(&current_user.0, branch_id)?;

    let service = StockService::new(state.db);
    let record = service
        .update_branch_product(branch_id, product_id, patch)
        .await?;
    Ok(Json(record))
}

pub async fn delete_branch_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((branch_id, product_id)): Path<(i32, i32)>,
) -> AppResult<StatusCode> {
    require_role(&current_user.0, &[UserRole::Admin])?;

    let service = StockService::new(state.db);
    service.delete_branch_product(branch_id, product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_low_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<BranchQuery>,
) -> AppResult<Json<Vec<BranchProductView>>> {
    require_role(&current_user.0, STOCK_ROLES)?;

    let branch_id = scoped_branch(&current_user.0, query.branch_id)?;
    let service = StockService::new(state.db);
    Ok(Json(service.list_low_stock(branch_id).await?))
}

/// Run a low-stock sweep now and return the transitions it applied
pub async fn evaluate_low_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<SweepReport>> {
    require_role(&current_user.0, &[UserRole::Admin])?;

    let service = StockService::new(state.db);
    let report = service.sweep_low_stock().await?;
    tracing::info!(
        user = %current_user.0.username,
        evaluated = report.evaluated,
        transitions = report.transitions.len(),
        "manual low-stock sweep"
    );
    Ok(Json(report))
}

pub async fn list_batches(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((branch_id, product_id)): Path<(i32, i32)>,
) -> AppResult<Json<Vec<BatchView>>> {
    require_role(&current_user.0, STOCK_ROLES)?;
    require_branch_access(&current_user.0, branch_id)?;

    let service = StockService::new(state.db);
    Ok(Json(service.list_batches(branch_id, product_id).await?))
}

pub async fn add_batch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path((branch_id, product_id)): Path<(i32, i32)>,
    Json(input): Json<CreateBatchInput>,
) -> AppResult<(StatusCode, Json<BatchView>)> {
    require_role(&current_user.0, STOCK_ROLES)?;
    require_branch_access(&current_user.0, branch_id)?;

    let service = StockService::new(state.db);
    let batch = service.add_batch(branch_id, product_id, input).await?;
    Ok((StatusCode::CREATED, Json(batch)))
}

pub async fn list_expiring(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<ExpiringQuery>,
) -> AppResult<Json<Vec<ExpiringBatch>>> {
    require_role(&current_user.0, STOCK_ROLES)?;

    let branch_id = scoped_branch(&current_user.0, query.branch_id)?;
    let service = StockService::new(state.db);
    Ok(Json(service.expiring_batches(branch_id, query.days).await?))
}
