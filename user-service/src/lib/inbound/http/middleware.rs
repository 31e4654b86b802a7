use std::net::SocketAddr;

use auth::TokenKind;
use axum::extract::ConnectInfo;
use axum::extract::Request;
use axum::extract::State;
use axum::http::{self};
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;

use crate::domain::user::models::UserId;
use crate::inbound::http::handlers::ApiError;
use crate::inbound::http::router::AppState;
use crate::outbound::rate_limit::RateLimitError;
use crate::outbound::rate_limit::RateLimitPolicy;

/// Extension type to store authenticated user ID in request extensions
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// Middleware that validates access JWTs and adds the user ID to request
/// extensions.
pub async fn authenticate(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let header = req
        .headers()
        .get(http::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| ApiError::InvalidToken.into_response())?;

    let user_id = state
        .token_service
        .validate(header, TokenKind::Access)
        .map_err(|e| {
            tracing::warn!("Access token validation failed: {}", e);
            ApiError::InvalidToken.into_response()
        })?;

    req.extensions_mut().insert(AuthenticatedUser {
        user_id: UserId(user_id),
    });

    Ok(next.run(req).await)
}

/// State for a per-route rate-limit gate: the shared app state plus the
/// policy this particular route group enforces.
#[derive(Clone)]
pub struct RateLimitGate {
    pub state: AppState,
    pub policy: RateLimitPolicy,
}

/// Middleware counting each request against its (path, client IP) window
/// before the handler runs.
pub async fn ip_rate_limit(
    State(gate): State<RateLimitGate>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    let client_ip = gate
        .state
        .ip_resolver
        .resolve(peer.ip(), req.headers())
        .map_err(|e| {
            tracing::warn!("Client IP resolution failed: {}", e);
            ApiError::ValidationError("Could not determine client address".to_string())
                .into_response()
        })?;

    gate.state
        .rate_limiter
        .check(req.uri().path(), client_ip, gate.policy)
        .await
        .map_err(|e| match e {
            RateLimitError::Limited {
                retry_after_seconds,
            } => ApiError::RateLimitExceeded {
                retry_after_seconds,
            }
            .into_response(),
            RateLimitError::Store(msg) => ApiError::InternalServerError(msg).into_response(),
        })?;

    Ok(next.run(req).await)
}
