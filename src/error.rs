use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::domain::models::entrant::EntrantStatus;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Waiting list is empty")]
    EmptyPool,
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Entrant is already on the waiting list")]
    AlreadyOnList,
    #[error("Waiting list is full")]
    WaitingListFull,
    #[error("Event capacity exceeded")]
    CapacityExceeded,
    #[error("Invalid state transition: {from} -> {to}")]
    InvalidStateTransition { from: EntrantStatus, to: EntrantStatus },
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Internal server error")]
    Internal,
    #[error("Internal server error: {0}")]
    InternalWithMsg(String),
}

impl AppError {
    /// Recoverable conditions the caller is expected to handle and message.
    pub fn is_business(&self) -> bool {
        !matches!(
            self,
            AppError::Database(_) | AppError::Internal | AppError::InternalWithMsg(_)
        )
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::EmptyPool => "EMPTY_POOL",
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::AlreadyOnList => "ALREADY_ON_LIST",
            AppError::WaitingListFull => "WAITING_LIST_FULL",
            AppError::CapacityExceeded => "CAPACITY_EXCEEDED",
            AppError::InvalidStateTransition { .. } => "INVALID_STATE_TRANSITION",
            AppError::Validation(_) => "VALIDATION",
            AppError::Database(_) => "DATABASE",
            AppError::Internal | AppError::InternalWithMsg(_) => "INTERNAL",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            AppError::Database(e) => {
                if let Some(db_err) = e.as_database_error() {
                    let code = db_err.code().unwrap_or_default();

                    // 2067 = SQLite Unique Constraint
                    if code == "2067" {
                        return (
                            StatusCode::CONFLICT,
                            Json(json!({ "error": "Resource already exists (duplicate entry)", "code": "CONFLICT" }))
                        ).into_response();
                    }
                }

                error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            AppError::EmptyPool
            | AppError::AlreadyOnList
            | AppError::WaitingListFull
            | AppError::CapacityExceeded
            | AppError::InvalidStateTransition { .. } => (StatusCode::CONFLICT, self.to_string()),
            AppError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string()),
            AppError::InternalWithMsg(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal error".to_string())
            }
        };

        let body = Json(json!({
            "error": message,
            "code": self.code(),
        }));

        (status, body).into_response()
    }
}
