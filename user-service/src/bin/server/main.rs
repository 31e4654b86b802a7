use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use auth::PasswordHasher;
use auth::TokenService;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use user_service::config::Config;
use user_service::domain::user::email_verification::EmailVerificationService;
use user_service::domain::user::password_reset::PasswordResetService;
use user_service::domain::user::service::AuthService;
use user_service::inbound::http::client_ip::IpResolver;
use user_service::inbound::http::router::create_router;
use user_service::inbound::http::router::AppState;
use user_service::outbound::events::KafkaEventProducer;
use user_service::outbound::rate_limit::IpRateLimiter;
use user_service::outbound::rate_limit::RedisCounterStore;
use user_service::outbound::repositories::PostgresEmailVerificationTokenRepository;
use user_service::outbound::repositories::PostgresPasswordResetTokenRepository;
use user_service::outbound::repositories::PostgresRefreshTokenStore;
use user_service::outbound::repositories::PostgresUserRepository;

const SWEEP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "user_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "user-service",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        kafka_brokers = %config.kafka.brokers,
        kafka_topic = %config.kafka.topic,
        rate_limiting = config.rate_limit.apply_limit,
        "Configuration loaded"
    );

    let pg_pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.database.url)
        .await?;
    tracing::info!(
        max_connections = 5,
        database = "postgresql",
        "Database connection pool created"
    );

    sqlx::migrate!("./migrations").run(&pg_pool).await?;
    tracing::info!(database = "postgresql", "Database migrations completed");

    let token_service = Arc::new(TokenService::new(
        config.jwt.secret.as_bytes(),
        config.jwt.access_expiration_minutes,
        config.jwt.refresh_expiration_days,
    ));

    let user_repository = Arc::new(PostgresUserRepository::new(pg_pool.clone()));
    let refresh_token_store = Arc::new(PostgresRefreshTokenStore::new(pg_pool.clone()));
    let reset_token_repository = Arc::new(PostgresPasswordResetTokenRepository::new(
        pg_pool.clone(),
    ));
    let verification_token_repository =
        Arc::new(PostgresEmailVerificationTokenRepository::new(pg_pool));
    let event_producer = Arc::new(KafkaEventProducer::new(&config)?);

    let verification_validity = chrono::Duration::hours(config.email_verification.expiry_hours);
    let auth_service = Arc::new(AuthService::new(
        Arc::clone(&user_repository),
        Arc::clone(&refresh_token_store),
        Arc::clone(&verification_token_repository),
        Arc::clone(&event_producer),
        PasswordHasher::new(),
        Arc::clone(&token_service),
        verification_validity,
    ));

    let password_reset_service = Arc::new(PasswordResetService::new(
        Arc::clone(&user_repository),
        Arc::clone(&refresh_token_store),
        Arc::clone(&reset_token_repository),
        Arc::clone(&event_producer),
        PasswordHasher::new(),
        chrono::Duration::minutes(config.password_reset.expiry_minutes),
    ));

    let email_verification_service = Arc::new(EmailVerificationService::new(
        Arc::clone(&user_repository),
        Arc::clone(&verification_token_repository),
        Arc::clone(&event_producer),
        verification_validity,
    ));

    let counter_store = Arc::new(RedisCounterStore::connect(&config.redis.url).await?);
    let rate_limiter = Arc::new(IpRateLimiter::new(
        counter_store,
        config.rate_limit.apply_limit,
    ));
    let ip_resolver = Arc::new(IpResolver::new(
        &config.rate_limit.trusted_proxies,
        config.rate_limit.require_proxy,
    )?);

    spawn_token_sweeper(
        Arc::clone(&password_reset_service),
        Arc::clone(&email_verification_service),
    );

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let http_application = create_router(AppState {
        auth_service,
        password_reset_service,
        email_verification_service,
        token_service,
        rate_limiter,
        ip_resolver,
    });

    // ConnectInfo gives the middleware the peer address for IP limiting
    axum::serve(
        http_listener,
        http_application.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}

/// Recurring cleanup of expired one-time tokens. Failures are logged and
/// the loop keeps going; expiry is enforced at verification time anyway.
fn spawn_token_sweeper(
    password_reset_service: Arc<user_service::inbound::http::router::PasswordResetServiceImpl>,
    email_verification_service: Arc<
        user_service::inbound::http::router::EmailVerificationServiceImpl,
    >,
) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        // First tick fires immediately; catch up on anything that expired
        // while the service was down
        loop {
            interval.tick().await;

            if let Err(e) = password_reset_service.sweep_expired().await {
                tracing::error!(error = %e, "Password reset token sweep failed");
            }
            if let Err(e) = email_verification_service.sweep_expired().await {
                tracing::error!(error = %e, "Email verification token sweep failed");
            }
        }
    });
}
