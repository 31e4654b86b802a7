pub mod one_time_token;
pub mod refresh_token;
pub mod user;

pub use one_time_token::PostgresEmailVerificationTokenRepository;
pub use one_time_token::PostgresPasswordResetTokenRepository;
pub use refresh_token::PostgresRefreshTokenStore;
pub use user::PostgresUserRepository;
