//! Authentication service for login, token issuing, and user accounts

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use sqlx::PgPool;
use validator::Validate;

use crate::config::Config;
use crate::error::{AppError, AppResult};
use crate::middleware::Claims;
use shared::models::{CreateUserInput, User, UserRole};
use shared::validation::validate_username;

/// Authentication service
#[derive(Clone)]
pub struct AuthService {
    db: PgPool,
    jwt_secret: String,
    access_token_expiry: i64,
}

/// Bearer token returned by login
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
}

/// User info from database
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    username: String,
    password_hash: String,
    role: UserRole,
    branch_id: Option<i32>,
}

const USER_COLUMNS: &str = "id, username, role, branch_id, has_changed_password, created_at";

/// Sign an access token for `user`
pub fn issue_token(
    user_id: i32,
    username: &str,
    role: UserRole,
    branch_id: Option<i32>,
    secret: &str,
    expiry_secs: i64,
) -> AppResult<String> {
    let now = Utc::now();
    let claims = Claims {
        sub: username.to_string(),
        id: user_id,
        role,
        branch_id,
        exp: (now + Duration::seconds(expiry_secs)).timestamp(),
        iat: now.timestamp(),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::Internal(format!("Token encoding failed: {}", e)))
}

impl AuthService {
    /// Create a new AuthService instance
    pub fn new(db: PgPool, config: &Config) -> Self {
        Self {
            db,
            jwt_secret: config.jwt.secret.clone(),
            access_token_expiry: config.jwt.access_token_expiry,
        }
    }

    /// Authenticate with username and password
    pub async fn login(&self, username: &str, password: &str) -> AppResult<TokenResponse> {
        let user = sqlx::query_as::<_, UserRow>(
            r#"
            SELECT id, username, password_hash, role, branch_id
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?
        .ok_or(AppError::InvalidCredentials)?;

        let valid = verify(password, &user.password_hash)
            .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))?;

        if !valid {
            return Err(AppError::InvalidCredentials);
        }

        let access_token = issue_token(
            user.id,
            &user.username,
            user.role,
            user.branch_id,
            &self.jwt_secret,
            self.access_token_expiry,
        )?;

        tracing::info!(user = %user.username, role = %user.role, "user logged in");

        Ok(TokenResponse {
            access_token,
            token_type: "bearer".to_string(),
            expires_in: self.access_token_expiry,
        })
    }

    /// Create a user account
    pub async fn create_user(&self, input: CreateUserInput) -> AppResult<User> {
        input.validate()?;
        validate_username(&input.username).map_err(|msg| AppError::Validation {
            field: "username".to_string(),
            message: msg.to_string(),
        })?;

        if let Some(branch_id) = input.branch_id {
            let exists =
                sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM branches WHERE id = $1)")
                    .bind(branch_id)
                    .fetch_one(&self.db)
                    .await?;
            if !exists {
                return Err(AppError::NotFound("Branch".into()));
            }
        }

        let password_hash = hash(&input.password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (username, password_hash, role, branch_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&input.username)
        .bind(&password_hash)
        .bind(input.role)
        .bind(input.branch_id)
        .fetch_one(&self.db)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::DuplicateEntry(_) => AppError::DuplicateEntry("username".into()),
            other => other,
        })?;

        tracing::info!(user = %user.username, role = %user.role, "user created");
        Ok(user)
    }

    /// Get a user by ID
    pub async fn get_user(&self, user_id: i32) -> AppResult<User> {
        sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
            .bind(user_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("User".into()))
    }

    /// Create the configured admin account unless the username is taken
    pub async fn ensure_admin(&self, username: &str, password: &str) -> AppResult<bool> {
        let password_hash = hash(password, DEFAULT_COST)
            .map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))?;

        let result = sqlx::query(
            r#"
            INSERT INTO users (username, password_hash, role)
            VALUES ($1, $2, 'admin')
            ON CONFLICT (username) DO NOTHING
            "#,
        )
        .bind(username)
        .bind(&password_hash)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::decode_token;

    #[test]
    fn token_round_trip_keeps_claims() {
        let token = issue_token(4, "pharm.north", UserRole::Pharmacist, Some(1), "s3cret", 60)
            .unwrap();
        let claims = decode_token(&token, "s3cret").unwrap();

        assert_eq!(claims.sub, "pharm.north");
        assert_eq!(claims.id, 4);
        assert_eq!(claims.role, UserRole::Pharmacist);
        assert_eq!(claims.branch_id, Some(1));
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token = issue_token(1, "admin", UserRole::Admin, None, "one", 60).unwrap();
        assert!(matches!(
            decode_token(&token, "two"),
            Err(AppError::InvalidToken)
        ));
    }

    #[test]
    fn expired_token_is_reported_as_expired() {
        // Past the default 60s leeway
        let token = issue_token(1, "admin", UserRole::Admin, None, "k", -600).unwrap();
        assert!(matches!(decode_token(&token, "k"), Err(AppError::TokenExpired)));
    }
}
