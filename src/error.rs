use axum::{http::StatusCode, response::{IntoResponse, Response}, Json};
use rust_decimal::Decimal;
use serde_json::json;

use crate::store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("unauthorized access")]
    Unauthorized,
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidState(String),
    /// No stock entry exists yet for the tenant and fuel type.
    #[error("{0}")]
    StockUnavailable(String),
    #[error("Insufficient stock. Available: {available}, requested: {requested}")]
    InsufficientStock { available: Decimal, requested: Decimal },
    #[error("Tank capacity exceeded. Total stock {total_stock} is above capacity {capacity}")]
    CapacityExceeded { total_stock: Decimal, capacity: Decimal },
    #[error("{0}")]
    Contention(String),
    /// The stock chain no longer agrees with the sales recorded against it.
    #[error("ledger integrity violation: {0}")]
    Integrity(String),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        AppError::NotFound(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        AppError::Forbidden(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        AppError::Conflict(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        AppError::InvalidState(msg.into())
    }

    pub fn integrity(msg: impl Into<String>) -> Self {
        AppError::Integrity(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(_) | AppError::Integrity(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) | AppError::StockUnavailable(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_)
            | AppError::Conflict(_)
            | AppError::InvalidState(_)
            | AppError::InsufficientStock { .. }
            | AppError::CapacityExceeded { .. } => StatusCode::BAD_REQUEST,
            AppError::Contention(_) => StatusCode::CONFLICT,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Database(_) => "database_error",
            AppError::Unauthorized => "unauthorized",
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Validation(_) => "invalid_argument",
            AppError::Conflict(_) => "conflict",
            AppError::InvalidState(_) => "invalid_state",
            AppError::StockUnavailable(_) => "stock_unavailable",
            AppError::InsufficientStock { .. } => "insufficient_stock",
            AppError::CapacityExceeded { .. } => "capacity_exceeded",
            AppError::Contention(_) => "contention",
            AppError::Integrity(_) => "integrity_violation",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error_message = match &self {
            AppError::Database(e) => {
                tracing::error!(error = %e, "Database error");
                "Database error occurred".to_string()
            }
            AppError::Integrity(msg) => {
                tracing::error!(%msg, "Request aborted");
                "Ledger integrity violation, the request was not applied".to_string()
            }
            other => other.to_string(),
        };

        let body = Json(json!({
            "error": error_message,
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Database(e) => AppError::Database(e),
            StoreError::Duplicate(msg) => AppError::Conflict(msg),
            StoreError::Missing(what) => AppError::NotFound(format!("{what} not found")),
            StoreError::VersionConflict { entry_id } => AppError::Contention(format!(
                "Stock entry {entry_id} was modified concurrently, please retry"
            )),
        }
    }
}
