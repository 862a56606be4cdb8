//! Error handling for the Retail POS Back Office
//!
//! One taxonomy for the whole inventory ledger. Input errors and business
//! rejections are surfaced to the caller and never retried; only
//! `ConcurrencyConflict` is safely retryable, and the services retry it
//! internally by redoing the full allocate-and-commit sequence.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation error: {message}")]
    Validation { field: String, message: String },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Duplicate batch number: {0}")]
    DuplicateBatchNumber(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Conflict: {message}")]
    Conflict { resource: String, message: String },

    // Business rule rejections
    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        requested: Decimal,
        available: Decimal,
        shortfall: Decimal,
    },

    #[error("Insufficient quantity in batch {batch_id}: requested {requested}, remaining {remaining}")]
    InsufficientBatchQuantity {
        batch_id: Uuid,
        requested: Decimal,
        remaining: Decimal,
    },

    // Lock timeout / serialization failure; the only retryable class
    #[error("Concurrency conflict: {0}")]
    ConcurrencyConflict(String),

    // Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    // Internal errors
    #[error("Internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// Whether retrying the whole operation can succeed without any
    /// external change (more stock, different input).
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::ConcurrencyConflict(_))
    }
}

/// Error response structure
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shortfall: Option<Decimal>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match &self {
            AppError::Validation { field, message } => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "VALIDATION_ERROR".to_string(),
                    message: message.clone(),
                    field: Some(field.clone()),
                    shortfall: None,
                },
            ),
            AppError::InvalidInput(msg) => (
                StatusCode::BAD_REQUEST,
                ErrorDetail {
                    code: "INVALID_INPUT".to_string(),
                    message: msg.clone(),
                    field: None,
                    shortfall: None,
                },
            ),
            AppError::DuplicateBatchNumber(number) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "DUPLICATE_BATCH_NUMBER".to_string(),
                    message: format!("A batch with number {} already exists", number),
                    field: Some("batch_number".to_string()),
                    shortfall: None,
                },
            ),
            AppError::NotFound(resource) => (
                StatusCode::NOT_FOUND,
                ErrorDetail {
                    code: "NOT_FOUND".to_string(),
                    message: format!("{} not found", resource),
                    field: None,
                    shortfall: None,
                },
            ),
            AppError::Conflict { resource, message } => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "CONFLICT".to_string(),
                    message: message.clone(),
                    field: Some(resource.clone()),
                    shortfall: None,
                },
            ),
            AppError::InsufficientStock {
                requested,
                available,
                shortfall,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INSUFFICIENT_STOCK".to_string(),
                    message: format!(
                        "Not enough stock: requested {}, available {}",
                        requested, available
                    ),
                    field: None,
                    shortfall: Some(*shortfall),
                },
            ),
            AppError::InsufficientBatchQuantity {
                batch_id,
                requested,
                remaining,
            } => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorDetail {
                    code: "INSUFFICIENT_BATCH_QUANTITY".to_string(),
                    message: format!(
                        "Batch {} holds {} but {} was requested",
                        batch_id, remaining, requested
                    ),
                    field: None,
                    shortfall: Some(*requested - *remaining),
                },
            ),
            AppError::ConcurrencyConflict(msg) => (
                StatusCode::CONFLICT,
                ErrorDetail {
                    code: "CONCURRENCY_CONFLICT".to_string(),
                    message: msg.clone(),
                    field: None,
                    shortfall: None,
                },
            ),
            AppError::Database(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "DATABASE_ERROR".to_string(),
                    message: "A database error occurred".to_string(),
                    field: None,
                    shortfall: None,
                },
            ),
            AppError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorDetail {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred".to_string(),
                    field: None,
                    shortfall: None,
                },
            ),
        };

        // Log the error for debugging
        tracing::error!("Error: {:?}", self);

        (status, Json(ErrorResponse { error: detail })).into_response()
    }
}

/// Result type alias for handlers
pub type AppResult<T> = Result<T, AppError>;
