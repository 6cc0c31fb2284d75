use std::fmt::Display;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};
use tracing::error;

use crate::repositories::StoreError;
use crate::services::IdentityError;

pub type ApiResult<T = Value> = Result<Json<T>, ApiError>;

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
}

impl ApiError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: message.into(),
        }
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::UNAUTHORIZED,
            message: message.into(),
        }
    }

    /// Logs the cause. Debug builds also return it to the caller.
    pub fn internal(context: &str, err: impl Display) -> Self {
        error!("{}: {}", context, err);

        let message = if cfg!(debug_assertions) {
            format!("{}: {}", context, err)
        } else {
            "Internal server error".to_string()
        };

        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "error": self.message }))).into_response()
    }
}

impl From<StatusCode> for ApiError {
    fn from(status: StatusCode) -> Self {
        Self {
            status,
            message: status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { .. } => Self {
                status: StatusCode::CONFLICT,
                message: "Recipe already added to this event".to_string(),
            },
            StoreError::Database(err) => Self::internal("Database error", err),
        }
    }
}

impl From<IdentityError> for ApiError {
    fn from(err: IdentityError) -> Self {
        match err {
            IdentityError::Rejected => Self::unauthorized("Invalid or expired token"),
            IdentityError::Unavailable(_) => Self {
                status: StatusCode::SERVICE_UNAVAILABLE,
                message: "Authentication service unavailable".to_string(),
            },
        }
    }
}
