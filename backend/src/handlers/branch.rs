//! HTTP handlers for branch endpoints

use axum::{extract::State, http::StatusCode};

use crate::error::AppResult;
use crate::extract::{Json, Path, Query};
use crate::middleware::{require_role, CurrentUser};
use crate::services::BranchService;
use crate::AppState;
use shared::models::{Branch, BranchPatch, CreateBranchInput, UserRole};
use shared::types::Pagination;

pub async fn create_branch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateBranchInput>,
) -> AppResult<(StatusCode, Json<Branch>)> {
    require_role(&current_user.0, &[UserRole::Admin])?;

    let service = BranchService::new(state.db);
    let branch = service.create_branch(input).await?;
    Ok((StatusCode::CREATED, Json(branch)))
}

pub async fn list_branches(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Vec<Branch>>> {
    let service = BranchService::new(state.db);
    Ok(Json(service.list_branches(page).await?))
}

pub async fn get_branch(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(branch_id): Path<i32>,
) -> AppResult<Json<Branch>> {
    let service = BranchService::new(state.db);
    Ok(Json(service.get_branch(branch_id).await?))
}

pub async fn update_branch(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(branch_id): Path<i32>,
    Json(patch): Json<BranchPatch>,
) -> AppResult<Json<Branch>> {
    require_role(&current_user.0, &[UserRole::Admin])?;

    let service = BranchService::new(state.db);
    Ok(Json(service.update_branch(branch_id, patch).await?))
}
