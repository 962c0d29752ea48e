use axum::{
    Json,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::db::models::ClientInfo;
use crate::types::auth::{
    BulkResetRequest, BulkResetResponse, LoginRequest, LoginResponse, UpdatePasswordRequest,
    UpdatePasswordResponse,
};
use crate::{AuthError, router::AuthState};

/// POST /login
pub async fn login_handler(
    State(state): State<AuthState>,
    client: ClientInfo,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AuthError> {
    let subject = state
        .service
        .login(&req.username, &req.password, &client)
        .await?;
    Ok(Json(subject.into()))
}

/// PUT /login/update-password
pub async fn update_password_handler(
    State(state): State<AuthState>,
    Json(req): Json<UpdatePasswordRequest>,
) -> Result<Json<UpdatePasswordResponse>, AuthError> {
    let user_id = state
        .service
        .update_password(&req.identifier, &req.new_password)
        .await?;
    Ok(Json(UpdatePasswordResponse {
        success: true,
        user_id,
        message: "password updated".to_string(),
    }))
}

/// PUT /login/reset-all-passwords
pub async fn reset_all_passwords_handler(
    State(state): State<AuthState>,
    Json(req): Json<BulkResetRequest>,
) -> Result<Json<BulkResetResponse>, AuthError> {
    let count = state
        .service
        .bulk_reset_passwords(&req.admin_key, &req.new_password)
        .await?;
    Ok(Json(BulkResetResponse {
        success: true,
        count,
        message: format!("{count} passwords reset"),
    }))
}

/// GET /health -> pool occupancy; 503 unless the pool is up.
pub async fn health_handler(State(state): State<AuthState>) -> Response {
    let status = state.service.pool().status().await;
    let code = if status.state == "ready" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(status)).into_response()
}
