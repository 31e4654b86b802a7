use std::sync::Arc;
use std::time::Duration;

use auth::TokenService;
use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::email_verification::resend_verification_email;
use super::handlers::email_verification::verify_email;
use super::handlers::login::login;
use super::handlers::password_reset::change_password;
use super::handlers::password_reset::forgot_password;
use super::handlers::password_reset::reset_password;
use super::handlers::refresh::logout;
use super::handlers::refresh::refresh;
use super::handlers::register::register;
use super::middleware::authenticate as auth_middleware;
use super::middleware::ip_rate_limit;
use super::middleware::RateLimitGate;
use crate::domain::user::email_verification::EmailVerificationService;
use crate::domain::user::password_reset::PasswordResetService;
use crate::domain::user::service::AuthService;
use crate::inbound::http::client_ip::IpResolver;
use crate::outbound::events::KafkaEventProducer;
use crate::outbound::rate_limit::IpRateLimiter;
use crate::outbound::rate_limit::RateLimitPolicy;
use crate::outbound::rate_limit::RedisCounterStore;
use crate::outbound::repositories::PostgresEmailVerificationTokenRepository;
use crate::outbound::repositories::PostgresPasswordResetTokenRepository;
use crate::outbound::repositories::PostgresRefreshTokenStore;
use crate::outbound::repositories::PostgresUserRepository;

pub type AuthServiceImpl = AuthService<
    PostgresUserRepository,
    PostgresRefreshTokenStore,
    PostgresEmailVerificationTokenRepository,
    KafkaEventProducer,
>;

pub type PasswordResetServiceImpl = PasswordResetService<
    PostgresUserRepository,
    PostgresRefreshTokenStore,
    PostgresPasswordResetTokenRepository,
    KafkaEventProducer,
>;

pub type EmailVerificationServiceImpl = EmailVerificationService<
    PostgresUserRepository,
    PostgresEmailVerificationTokenRepository,
    KafkaEventProducer,
>;

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<AuthServiceImpl>,
    pub password_reset_service: Arc<PasswordResetServiceImpl>,
    pub email_verification_service: Arc<EmailVerificationServiceImpl>,
    pub token_service: Arc<TokenService>,
    pub rate_limiter: Arc<IpRateLimiter<RedisCounterStore>>,
    pub ip_resolver: Arc<IpResolver>,
}

/// Requests per hour a single client IP may make against each of the
/// abuse-prone endpoints (register, login, forgot-password, resend).
const SENSITIVE_ENDPOINT_LIMIT: u32 = 10;

pub fn create_router(state: AppState) -> Router {
    // Endpoints that mint accounts, probe credentials, or trigger
    // outbound email get a per-IP budget; the rest stay open.
    let limited_routes = Router::new()
        .route("/api/v1/auth/register", post(register))
        .route("/api/v1/auth/login", post(login))
        .route("/api/v1/auth/forgot-password", post(forgot_password))
        .route(
            "/api/v1/auth/resend-verification-email",
            post(resend_verification_email),
        )
        .route_layer(middleware::from_fn_with_state(
            RateLimitGate {
                state: state.clone(),
                policy: RateLimitPolicy::per_hour(SENSITIVE_ENDPOINT_LIMIT),
            },
            ip_rate_limit,
        ));

    let open_routes = Router::new()
        .route("/api/v1/auth/refresh", post(refresh))
        .route("/api/v1/auth/logout", post(logout))
        .route("/api/v1/auth/reset-password", post(reset_password))
        .route("/api/v1/auth/verify-email", get(verify_email));

    let protected_routes = Router::new()
        .route("/api/v1/auth/change-password", post(change_password))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .merge(limited_routes)
        .merge(open_routes)
        .merge(protected_routes)
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
