//! Authentication middleware
//!
//! JWT bearer authentication and role-based access control

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, errors::ErrorKind, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use shared::models::UserRole;

use crate::error::{AppError, ErrorDetail, ErrorResponse};
use crate::AppState;

/// Authenticated user information extracted from JWT
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
    pub role: UserRole,
    pub branch_id: Option<i32>,
}

impl AuthUser {
    pub fn has_role(&self, roles: &[UserRole]) -> bool {
        roles.contains(&self.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    /// Admins reach every branch; other users only their assigned one
    pub fn can_access_branch(&self, branch_id: i32) -> bool {
        self.is_admin() || self.branch_id == Some(branch_id)
    }
}

/// JWT claims structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Username
    pub sub: String,
    pub id: i32,
    pub role: UserRole,
    pub branch_id: Option<i32>,
    pub exp: i64,
    pub iat: i64,
}

impl From<Claims> for AuthUser {
    fn from(claims: Claims) -> Self {
        Self {
            user_id: claims.id,
            username: claims.sub,
            role: claims.role,
            branch_id: claims.branch_id,
        }
    }
}

/// Decode and validate a JWT token
pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| match e.kind() {
        ErrorKind::ExpiredSignature => AppError::TokenExpired,
        _ => AppError::InvalidToken,
    })
}

/// Authentication middleware that validates JWT tokens against the
/// configured secret and stores the caller in request extensions
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "));

    let Some(token) = token else {
        return AppError::Unauthorized("Missing or invalid Authorization header".into())
            .into_response();
    };

    let claims = match decode_token(token, &state.config.jwt.secret) {
        Ok(claims) => claims,
        Err(err) => return err.into_response(),
    };

    request.extensions_mut().insert(AuthUser::from(claims));

    next.run(request).await
}

/// Extractor for authenticated user
/// Use this in handlers to get the current user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<ErrorResponse>);

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| {
                let error = ErrorResponse {
                    error: ErrorDetail::new("UNAUTHORIZED", "Authentication required"),
                };
                (StatusCode::UNAUTHORIZED, Json(error))
            })
    }
}

/// Role guard for use at the top of handlers
pub fn require_role(user: &AuthUser, roles: &[UserRole]) -> Result<(), AppError> {
    if user.has_role(roles) {
        Ok(())
    } else {
        tracing::debug!(
            user = %user.username,
            role = %user.role,
            "role not permitted for this endpoint"
        );
        Err(AppError::InsufficientPermissions)
    }
}

/// Branch guard: pharmacists may only act on their own branch
pub fn require_branch_access(user: &AuthUser, branch_id: i32) -> Result<(), AppError> {
    if user.can_access_branch(branch_id) {
        Ok(())
    } else {
        Err(AppError::InsufficientPermissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: UserRole, branch_id: Option<i32>) -> AuthUser {
        AuthUser {
            user_id: 3,
            username: "pharm.north".into(),
            role,
            branch_id,
        }
    }

    #[test]
    fn role_guard_allows_listed_roles() {
        let pharmacist = user(UserRole::Pharmacist, Some(1));
        assert!(require_role(&pharmacist, &[UserRole::Admin, UserRole::Pharmacist]).is_ok());
        assert!(matches!(
            require_role(&pharmacist, &[UserRole::Admin]),
            Err(AppError::InsufficientPermissions)
        ));
    }

    #[test]
    fn wholesaler_cannot_submit_reports() {
        let wholesaler = user(UserRole::Wholesaler, Some(2));
        assert!(require_role(&wholesaler, &[UserRole::Pharmacist]).is_err());
    }

    #[test]
    fn branch_guard() {
        let pharmacist = user(UserRole::Pharmacist, Some(1));
        assert!(require_branch_access(&pharmacist, 1).is_ok());
        assert!(require_branch_access(&pharmacist, 2).is_err());

        let admin = user(UserRole::Admin, None);
        assert!(require_branch_access(&admin, 2).is_ok());
    }

    #[test]
    fn garbage_token_is_invalid() {
        assert!(matches!(
            decode_token("not-a-jwt", "secret"),
            Err(AppError::InvalidToken)
        ));
    }
}
