//! Error handling for the pharmacy inventory server
//!
//! Every error renders as `{"error": {"code", "message", "field"?}}`

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use shared::reconciliation::ReconciliationError;
use thiserror::Error;
use validator::{ValidationError, ValidationErrors, ValidationErrorsKind};

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication errors
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Body, query or path that could not be extracted at all
    #[error("Request rejected: {message}")]
    Rejected { status: StatusCode, message: String },

    #[error("Duplicate entry: {0}")]
    DuplicateEntry(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Renders as "{0} not found"
    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Reconciliation(#[from] ReconciliationError),

    // Database errors
    #[error("Database error: {0}")]
    DatabaseError(sqlx::Error),

    // Internal errors
    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Internal server error")]
    InternalError(#[from] anyhow::Error),
}

/// Error response structure
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl ErrorDetail {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            field: None,
        }
    }
}

// Postgres SQLSTATE codes
const FOREIGN_KEY_VIOLATION: &str = "23503";
const UNIQUE_VIOLATION: &str = "23505";

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            match db_err.code().as_deref() {
                Some(UNIQUE_VIOLATION) => {
                    return AppError::DuplicateEntry(
                        db_err.constraint().unwrap_or("record").to_string(),
                    );
                }
                Some(FOREIGN_KEY_VIOLATION) => {
                    return AppError::Conflict(format!(
                        "Operation violates a reference ({})",
                        db_err.constraint().unwrap_or("foreign key")
                    ));
                }
                _ => {}
            }
        }
        AppError::DatabaseError(err)
    }
}

macro_rules! impl_from_rejection {
    ($($rejection:ty),*) => {
        $(
            impl From<$rejection> for AppError {
                fn from(rejection: $rejection) -> Self {
                    AppError::Rejected {
                        status: rejection.status(),
                        message: rejection.body_text(),
                    }
                }
            }
        )*
    };
}

impl_from_rejection!(JsonRejection, QueryRejection, PathRejection);

const SCHEMA_KEY: &str = "__all__";

fn describe(error: &ValidationError, field: &str) -> String {
    if let Some(message) = &error.message {
        return message.to_string();
    }
    match (&*error.code, error.params.get("min").and_then(|v| v.as_f64())) {
        ("range", Some(min)) if min == 0.0 => format!("{} must not be negative", field),
        ("range", Some(min)) => format!("{} must be at least {}", field, min),
        _ => format!("{} is invalid", field),
    }
}

/// First failure in field-name order, descending into nested structs and
/// lists; list entries are visited by index and named like `items[0].beginning`
fn first_failure(errors: &ValidationErrors, path: &str) -> Option<(Option<String>, String)> {
    let mut entries: Vec<_> = errors.errors().iter().collect();
    entries.sort_by_key(|(name, _)| **name);

    entries.into_iter().find_map(|(name, kind)| {
        let field = match (*name, path.is_empty()) {
            (SCHEMA_KEY, _) => path.to_string(),
            (_, true) => name.to_string(),
            (_, false) => format!("{}.{}", path, name),
        };
        match kind {
            ValidationErrorsKind::Field(errs) => errs.first().map(|e| {
                let message = describe(e, &field);
                ((!field.is_empty()).then_some(field), message)
            }),
            ValidationErrorsKind::Struct(inner) => first_failure(inner, &field),
            ValidationErrorsKind::List(items) => items
                .iter()
                .find_map(|(index, inner)| first_failure(inner, &format!("{}[{}]", field, index))),
        }
    })
}

impl From<ValidationErrors> for AppError {
    fn from(errors: ValidationErrors) -> Self {
        match first_failure(&errors, "") {
            Some((Some(field), message)) => AppError::Validation { field, message },
            Some((None, message)) => AppError::ValidationError(message),
            None => AppError::ValidationError(errors.to_string()),
        }
    }
}

impl AppError {
    fn status_and_detail(&self) -> (StatusCode, ErrorDetail) {
        match self {
            AppError::InvalidCredentials => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("INVALID_CREDENTIALS", "Incorrect username or password"),
            ),
            AppError::TokenExpired => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("TOKEN_EXPIRED", "Token has expired"),
            ),
            AppError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("INVALID_TOKEN", "Invalid token"),
            ),
            AppError::InsufficientPermissions => (
                StatusCode::FORBIDDEN,
                ErrorDetail::new(
                    "INSUFFICIENT_PERMISSIONS",
                    "You do not have permission to perform this action",
                ),
            ),
            AppError::Unauthorized(message) => (
                StatusCode::UNAUTHORIZED,
                ErrorDetail::new("UNAUTHORIZED", message.clone()),
            ),
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    field: Some(field.clone()),
                    ..ErrorDetail::new("VALIDATION_ERROR", message.clone())
                },
            ),
            AppError::ValidationError(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail::new("VALIDATION_ERROR", msg.clone()),
            ),
            AppError::Rejected { status, message } => (
                *status,
                ErrorDetail::new("INVALID_REQUEST", message.clone()),
            ),
            AppError::DuplicateEntry(field) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    field: Some(field.clone()),
                    ..ErrorDetail::new(
                        "DUPLICATE_ENTRY",
                        format!("A record with this {} already exists", field),
                    )
                },
            ),
            AppError::Conflict(msg) => (
                StatusCode::CONFLICT,
                ErrorDetail::new("CONFLICT", msg.clone()),
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail::new("NOT_FOUND", format!("{} not found", resource)),
            ),
            AppError::Reconciliation(err) => match err {
                ReconciliationError::UnknownProduct(_) => (
                    StatusCode::NOT_FOUND,
                    ErrorDetail::new("NOT_FOUND", err.to_string()),
                ),
            },
            AppError::DatabaseError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("DATABASE_ERROR", "A database error occurred"),
            ),
            AppError::Internal(_) | AppError::InternalError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail::new("INTERNAL_ERROR", "An internal server error occurred"),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, error_detail) = self.status_and_detail();

        // Log the error for debugging
        if status.is_server_error() {
            tracing::error!("Error: {:?}", self);
        } else {
            tracing::warn!("Request rejected: {}", self);
        }

        (status, Json(ErrorResponse { error: error_detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
