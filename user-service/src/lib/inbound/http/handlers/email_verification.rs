use axum::extract::Query;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use crate::inbound::http::router::AppState;

pub async fn verify_email(
    State(state): State<AppState>,
    Query(query): Query<VerifyEmailQuery>,
) -> Result<StatusCode, ApiError> {
    state
        .email_verification_service
        .verify(&query.token)
        .await
        .map_err(ApiError::from)
        .map(|_| StatusCode::OK)
}

pub async fn resend_verification_email(
    State(state): State<AppState>,
    Json(body): Json<ResendVerificationRequest>,
) -> Result<StatusCode, ApiError> {
    state
        .email_verification_service
        .resend(&body.email)
        .await
        .map_err(ApiError::from)
        .map(|_| StatusCode::OK)
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VerifyEmailQuery {
    token: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResendVerificationRequest {
    email: String,
}
