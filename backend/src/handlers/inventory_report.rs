//! HTTP handlers for inventory reconciliation reports

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
};

use crate::error::AppResult;
use crate::extract::{Json, Path, Query};
use crate::middleware::{require_role, CurrentUser};
use crate::services::InventoryReportService;
use crate::AppState;
use shared::models::{CreateInvReportInput, InvReportResponse, UserRole};
use shared::types::Pagination;

const READ_ROLES: &[UserRole] = &[UserRole::Admin, UserRole::Pharmacist];

/// Submit a physical count; 201 whether the report is approved or pending
pub async fn create_report(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateInvReportInput>,
) -> AppResult<(StatusCode, Json<InvReportResponse>)> {
    require_role(&current_user.0, &[UserRole::Pharmacist])?;

    let service = InventoryReportService::new(state.db);
    let report = service.create_report(input).await?;
    Ok((StatusCode::CREATED, Json(report)))
}

pub async fn get_report(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(report_id): Path<i32>,
) -> AppResult<Json<InvReportResponse>> {
    require_role(&current_user.0, READ_ROLES)?;

    let service = InventoryReportService::new(state.db);
    Ok(Json(service.get_report(report_id).await?))
}

pub async fn list_reports(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Vec<InvReportResponse>>> {
    require_role(&current_user.0, READ_ROLES)?;

    let service = InventoryReportService::new(state.db);
    Ok(Json(service.list_reports(page).await?))
}

pub async fn list_branch_reports(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(branch_id): Path<i32>,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Vec<InvReportResponse>>> {
    require_role(&current_user.0, READ_ROLES)?;

    let service = InventoryReportService::new(state.db);
    Ok(Json(service.list_branch_reports(branch_id, page).await?))
}

pub async fn mark_viewed(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(report_id): Path<i32>,
) -> AppResult<Json<InvReportResponse>> {
    require_role(&current_user.0, &[UserRole::Admin])?;

    let service = InventoryReportService::new(state.db);
    let report = service
        .mark_viewed(report_id, current_user.0.user_id)
        .await?;
    Ok(Json(report))
}

/// Download one report's lines as CSV
pub async fn export_report(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(report_id): Path<i32>,
) -> AppResult<impl IntoResponse> {
    require_role(&current_user.0, READ_ROLES)?;

    let service = InventoryReportService::new(state.db);
    let (report, csv) = service.export_report_csv(report_id).await?;

    let disposition = format!(
        "attachment; filename=\"inventory_report_{}_{}.csv\"",
        report.id, report.date_created
    );
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        csv,
    ))
}
