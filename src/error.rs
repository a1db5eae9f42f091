//! Domain error types for the test plan manager.
//!
//! Uses thiserror for ergonomic error handling with automatic Display implementations.

use actix_web::{HttpResponse, ResponseError};
use sea_orm::{DbErr, SqlErr};
use std::fmt;

/// Application-level errors.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed or missing required input
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Referenced entity does not exist
    #[error("{0} not found")]
    NotFound(String),

    /// Uniqueness violation or an operation the entity's state forbids
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Result submission against a closed test run
    #[error("Test run {0} is closed")]
    RunClosed(String),

    /// Public submission with an unknown, revoked or expired invite token
    #[error("Invalid or expired invite token")]
    InvalidToken,

    /// Every freshly drawn code collided with an existing one
    #[error("Could not allocate a unique code for {scope} after {attempts} attempts")]
    CodeGenerationExhausted { scope: String, attempts: u32 },

    /// Authentication failed
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Transient backing-store failure, safe to retry
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// Non-transient database failure
    #[error("Database error: {0}")]
    Database(String),
}

impl AppError {
    /// Stable machine-readable error code used in response bodies and bulk item errors.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Conflict(_) => "CONFLICT",
            AppError::RunClosed(_) => "RUN_CLOSED",
            AppError::InvalidToken => "INVALID_TOKEN",
            AppError::CodeGenerationExhausted { .. } => "CODE_GENERATION_EXHAUSTED",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::StoreUnavailable(_) => "STORE_UNAVAILABLE",
            AppError::Database(_) => "DATABASE_ERROR",
        }
    }

    /// Whether a caller may blindly retry the failed operation.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::StoreUnavailable(_))
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        use actix_web::http::StatusCode;

        let (status, response_message) = match self {
            AppError::Database(err_str) => {
                tracing::error!("Database error: {}", err_str);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An internal database error occurred".to_string(),
                )
            }
            AppError::StoreUnavailable(err_str) => {
                tracing::warn!("Store unavailable: {}", err_str);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "The data store is temporarily unavailable, retry later".to_string(),
                )
            }
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            AppError::Conflict(_) | AppError::CodeGenerationExhausted { .. } => {
                (StatusCode::CONFLICT, self.to_string())
            }
            AppError::RunClosed(_) => (StatusCode::CONFLICT, self.to_string()),
            AppError::InvalidToken => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
        };

        HttpResponse::build(status).json(ErrorResponse {
            error: self.code().to_string(),
            message: response_message,
        })
    }
}

/// Error response body matching OpenAPI schema.
#[derive(Debug, serde::Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error, self.message)
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;

/// True when the store rejected a write because of a unique index.
pub fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

// Conversion implementations for common error types

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Validation(format!("JSON parsing error: {}", err))
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        if is_unique_violation(&err) {
            return AppError::Conflict(err.to_string());
        }
        match err {
            DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => {
                AppError::StoreUnavailable(err.to_string())
            }
            other => AppError::Database(other.to_string()),
        }
    }
}

impl From<uuid::Error> for AppError {
    fn from(err: uuid::Error) -> Self {
        AppError::Validation(format!("Invalid UUID: {}", err))
    }
}
