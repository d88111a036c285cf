//! HTTP handlers for the product catalog

use axum::{extract::State, http::StatusCode};

use crate::error::AppResult;
use crate::extract::{Json, Path, Query};
use crate::middleware::{require_role, CurrentUser};
use crate::services::ProductService;
use crate::AppState;
use shared::models::{CreateProductInput, PriceHistory, Product, ProductPatch, UserRole};
use shared::types::Pagination;

pub async fn create_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateProductInput>,
) -> AppResult<(StatusCode, Json<Product>)> {
    require_role(&current_user.0, &[UserRole::Admin])?;

    let service = ProductService::new(state.db);
    let product = service.create_product(input).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn list_products(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Query(page): Query<Pagination>,
) -> AppResult<Json<Vec<Product>>> {
    let service = ProductService::new(state.db);
    Ok(Json(service.list_products(page).await?))
}

pub async fn get_product(
    State(state): State<AppState>,
    _current_user: CurrentUser,
    Path(product_id): Path<i32>,
) -> AppResult<Json<Product>> {
    let service = ProductService::new(state.db);
    Ok(Json(service.get_product(product_id).await?))
}

pub async fn update_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<i32>,
    Json(patch): Json<ProductPatch>,
) -> AppResult<Json<Product>> {
    require_role(&current_user.0, &[UserRole::Admin])?;

    let service = ProductService::new(state.db);
    Ok(Json(service.update_product(product_id, patch).await?))
}

pub async fn delete_product(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<i32>,
) -> AppResult<StatusCode> {
    require_role(&current_user.0, &[UserRole::Admin])?;

    let service = ProductService::new(state.db);
    service.delete_product(product_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_price_history(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(product_id): Path<i32>,
) -> AppResult<Json<Vec<PriceHistory>>> {
    require_role(&current_user.0, &[UserRole::Admin])?;

    let service = ProductService::new(state.db);
    Ok(Json(service.price_history(product_id).await?))
}
