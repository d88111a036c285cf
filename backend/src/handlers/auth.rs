//! Authentication handlers

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;

use crate::error::AppResult;
use crate::extract::Json;
use crate::middleware::{require_role, CurrentUser};
use crate::services::auth::{AuthService, TokenResponse};
use crate::AppState;
use shared::models::{CreateUserInput, User, UserRole};

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Exchange username and password for a bearer token
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<TokenResponse>> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let tokens = auth_service.login(&body.username, &body.password).await?;
    Ok(Json(tokens))
}

/// Create a user account (admin only)
pub async fn create_user(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<CreateUserInput>,
) -> AppResult<(StatusCode, Json<User>)> {
    require_role(&current_user.0, &[UserRole::Admin])?;

    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let user = auth_service.create_user(input).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// The caller's own account
pub async fn me(State(state): State<AppState>, current_user: CurrentUser) -> AppResult<Json<User>> {
    let auth_service = AuthService::new(state.db.clone(), &state.config);
    let user = auth_service.get_user(current_user.0.user_id).await?;
    Ok(Json(user))
}
