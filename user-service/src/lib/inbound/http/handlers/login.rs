use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::register::UserData;
use super::ApiError;
use super::ApiSuccess;
use crate::domain::user::models::AuthenticatedUser;
use crate::inbound::http::router::AppState;

pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> Result<ApiSuccess<AuthenticatedUserData>, ApiError> {
    state
        .auth_service
        .login(&body.email, &body.password)
        .await
        .map_err(ApiError::from)
        .map(|ref authenticated| ApiSuccess::new(StatusCode::OK, authenticated.into()))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequest {
    email: String,
    password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatedUserData {
    pub user: UserData,
    pub access_token: String,
    pub refresh_token: String,
}

impl From<&AuthenticatedUser> for AuthenticatedUserData {
    fn from(authenticated: &AuthenticatedUser) -> Self {
        Self {
            user: (&authenticated.user).into(),
            access_token: authenticated.access_token.clone(),
            refresh_token: authenticated.refresh_token.clone(),
        }
    }
}
