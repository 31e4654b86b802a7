use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;

use super::register::validate_password;
use super::ApiError;
use crate::inbound::http::middleware::AuthenticatedUser;
use crate::inbound::http::router::AppState;

pub async fn forgot_password(
    State(state): State<AppState>,
    Json(body): Json<ForgotPasswordRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .password_reset_service
        .request_reset(&body.email)
        .await
        .map_err(ApiError::from)
        .map(|_| StatusCode::OK)
}

pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<ResetPasswordRequest>,
) -> Result<StatusCode, ApiError> {
    validate_password(&body.new_password)?;

    state
        .password_reset_service
        .reset_password(&body.token, &body.new_password)
        .await
        .map_err(ApiError::from)
        .map(|_| StatusCode::OK)
}

pub async fn change_password(
    State(state): State<AppState>,
    Extension(authenticated): Extension<AuthenticatedUser>,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<StatusCode, ApiError> {
    validate_password(&body.new_password)?;

    state
        .password_reset_service
        .change_password(
            &authenticated.user_id,
            &body.old_password,
            &body.new_password,
        )
        .await
        .map_err(ApiError::from)
        .map(|_| StatusCode::OK)
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ForgotPasswordRequest {
    email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    token: String,
    new_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    old_password: String,
    new_password: String,
}
