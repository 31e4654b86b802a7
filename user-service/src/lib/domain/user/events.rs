use chrono::DateTime;
use chrono::Utc;
use uuid::Uuid;

use crate::domain::user::models::User;

/// Domain event published when a new user registers.
///
/// Carries the freshly issued email-verification token so the
/// notification consumer can build the verification link.
#[derive(Debug, Clone)]
pub struct UserCreatedEvent {
    pub event_id: String,
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub verification_token: String,
    pub occurred_at: DateTime<Utc>,
}

impl UserCreatedEvent {
    pub fn new(user: &User, verification_token: &str) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            user_id: user.id.to_string(),
            username: user.username.as_str().to_string(),
            email: user.email.as_str().to_string(),
            verification_token: verification_token.to_string(),
            occurred_at: Utc::now(),
        }
    }
}

/// Domain event published when a user's email address is verified.
#[derive(Debug, Clone)]
pub struct UserVerifiedEvent {
    pub event_id: String,
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub occurred_at: DateTime<Utc>,
}

impl UserVerifiedEvent {
    pub fn new(user: &User) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            user_id: user.id.to_string(),
            username: user.username.as_str().to_string(),
            email: user.email.as_str().to_string(),
            occurred_at: Utc::now(),
        }
    }
}

/// Domain event published when a user asks for the verification email
/// to be sent again.
#[derive(Debug, Clone)]
pub struct ResendVerificationRequestedEvent {
    pub event_id: String,
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub verification_token: String,
    pub occurred_at: DateTime<Utc>,
}

impl ResendVerificationRequestedEvent {
    pub fn new(user: &User, verification_token: &str) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            user_id: user.id.to_string(),
            username: user.username.as_str().to_string(),
            email: user.email.as_str().to_string(),
            verification_token: verification_token.to_string(),
            occurred_at: Utc::now(),
        }
    }
}

/// Domain event published when a password reset is requested.
#[derive(Debug, Clone)]
pub struct ResetPasswordRequestedEvent {
    pub event_id: String,
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub reset_token: String,
    pub expires_in_minutes: i64,
    pub occurred_at: DateTime<Utc>,
}

impl ResetPasswordRequestedEvent {
    pub fn new(user: &User, reset_token: &str, expires_in_minutes: i64) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            user_id: user.id.to_string(),
            username: user.username.as_str().to_string(),
            email: user.email.as_str().to_string(),
            reset_token: reset_token.to_string(),
            expires_in_minutes,
            occurred_at: Utc::now(),
        }
    }
}
