use axum::{Json, http::StatusCode, response::IntoResponse};
use serde::Serialize;
use sqlx::Error as SqlxError;
use thiserror::Error as ThisError;

use crate::types::auth::LoginRejection;

#[derive(Debug, ThisError)]
pub enum AuthError {
    /// The pool could not be created, was shut down, or no connection freed up in time.
    #[error("Connection pool unavailable: {0}")]
    PoolUnavailable(String),

    #[error("No active credential matches `{0}`")]
    NotFound(String),

    #[error("Invalid administrative key")]
    Unauthorized,

    #[error("invalid credentials")]
    InvalidCredentials,

    #[error("Storage failure: {0}")]
    StorageFailure(#[from] SqlxError),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Infrastructure errors a caller may retry after backing off.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AuthError::PoolUnavailable(_))
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> axum::response::Response {
        let (status, error_body) = match self {
            AuthError::InvalidCredentials => {
                return (StatusCode::UNAUTHORIZED, Json(LoginRejection::default())).into_response();
            }
            AuthError::PoolUnavailable(_) => {
                let status = StatusCode::SERVICE_UNAVAILABLE;
                let body = ApiErrorBody {
                    code: "SERVICE_UNAVAILABLE".to_string(),
                    message: "The service is temporarily unavailable.".to_string(),
                };
                (status, body)
            }
            AuthError::NotFound(_) => {
                let status = StatusCode::NOT_FOUND;
                let body = ApiErrorBody {
                    code: "NOT_FOUND".to_string(),
                    message: "User not found.".to_string(),
                };
                (status, body)
            }
            AuthError::Unauthorized => {
                let status = StatusCode::UNAUTHORIZED;
                let body = ApiErrorBody {
                    code: "UNAUTHORIZED".to_string(),
                    message: "Invalid administrative key.".to_string(),
                };
                (status, body)
            }
            AuthError::InvalidRequest(reason) => {
                let status = StatusCode::BAD_REQUEST;
                let body = ApiErrorBody {
                    code: "INVALID_REQUEST".to_string(),
                    message: reason,
                };
                (status, body)
            }
            AuthError::StorageFailure(_) | AuthError::Internal(_) => {
                let status = StatusCode::INTERNAL_SERVER_ERROR;
                let body = ApiErrorBody {
                    code: "INTERNAL_ERROR".to_string(),
                    message: "An internal server error occurred.".to_string(),
                };
                (status, body)
            }
        };
        (status, Json(ApiErrorResponse { error: error_body })).into_response()
    }
}

/// Standardized API error response body
#[derive(Serialize)]
pub struct ApiErrorBody {
    pub code: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorBody,
}
