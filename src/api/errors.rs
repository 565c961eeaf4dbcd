use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;

use crate::models::ModelError;

/// Failure of an API request, rendered as `{ "error", "message" }`
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Model(#[from] ModelError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("invoice has no product at index {0}")]
    ProductIndex(usize),

    #[error(transparent)]
    Database(#[from] anyhow::Error),
}

impl ApiError {
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound(what.into())
    }

    fn is_unique_violation(&self) -> bool {
        let ApiError::Database(err) = self else {
            return false;
        };
        match err.downcast_ref::<sqlx::Error>() {
            Some(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Model(_) => (StatusCode::BAD_REQUEST, "validation_error"),
            ApiError::NotFound(_) | ApiError::ProductIndex(_) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            ApiError::Database(_) if self.is_unique_violation() => {
                (StatusCode::CONFLICT, "conflict")
            }
            ApiError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "database_error"),
        }
    }

    /// Text sent to the caller. Database details only go to the log.
    fn public_message(&self) -> String {
        match self {
            ApiError::Database(_) if self.is_unique_violation() => {
                "a record with the same unique value already exists".to_string()
            }
            ApiError::Database(_) => "the database could not complete the request".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::warn!(error = %self, code, "request rejected");
        }
        json_error(status, code, self.public_message())
    }
}

pub fn json_error(status: StatusCode, code: &'static str, message: impl Into<String>) -> Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}
