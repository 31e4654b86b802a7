use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;

use crate::domain::user::events::ResendVerificationRequestedEvent;
use crate::domain::user::events::ResetPasswordRequestedEvent;
use crate::domain::user::events::UserCreatedEvent;
use crate::domain::user::events::UserVerifiedEvent;
use crate::domain::user::models::OneTimeToken;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::user::errors::AuthError;
use crate::user::errors::EventPublisherError;
use crate::user::models::Username;

/// Persistence operations for the user aggregate.
#[async_trait]
pub trait UserRepository: Send + Sync + 'static {
    /// Persist a new user.
    ///
    /// # Errors
    /// * `UserAlreadyExists` - Username or email is already taken
    /// * `DatabaseError` - Database operation failed
    async fn create(&self, user: User) -> Result<User, AuthError>;

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AuthError>;

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;

    async fn find_by_username(&self, username: &Username) -> Result<Option<User>, AuthError>;

    /// Look up a user matching either the email or the username.
    ///
    /// Used by registration to detect duplicates in one round trip.
    async fn find_by_email_or_username(
        &self,
        email: &str,
        username: &str,
    ) -> Result<Option<User>, AuthError>;

    /// Replace the stored password hash and bump `updated_at`.
    ///
    /// # Errors
    /// * `UserNotFound` - No user with this ID
    /// * `DatabaseError` - Database operation failed
    async fn update_password(&self, id: &UserId, password_hash: &str) -> Result<(), AuthError>;

    /// Mark the user's email address as verified.
    ///
    /// # Errors
    /// * `UserNotFound` - No user with this ID
    /// * `DatabaseError` - Database operation failed
    async fn set_email_verified(&self, id: &UserId) -> Result<(), AuthError>;
}

/// Durable store of refresh-token hashes, one row per active session.
///
/// Raw tokens never reach this store; callers hash them first.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync + 'static {
    /// Persist a new refresh-token hash for a user.
    async fn store(
        &self,
        user_id: &UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<(), AuthError>;

    /// Atomically consume `old_hash` and persist `new_hash`.
    ///
    /// The conditional delete of the unexpired `(user_id, old_hash)` row
    /// and the insert of the new row must happen in one transaction, so
    /// that two concurrent refreshes with the same token produce exactly
    /// one success.
    ///
    /// # Returns
    /// `true` when the old token was found and rotated, `false` when no
    /// matching unexpired record existed (rotation rolled back).
    async fn rotate(
        &self,
        user_id: &UserId,
        old_hash: &str,
        new_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<bool, AuthError>;

    /// Delete a single refresh-token record. Missing records are ignored,
    /// making logout idempotent.
    async fn revoke(&self, user_id: &UserId, token_hash: &str) -> Result<(), AuthError>;

    /// Delete every refresh-token record for a user.
    ///
    /// Invoked on password change and password reset to force re-login
    /// everywhere.
    async fn revoke_all(&self, user_id: &UserId) -> Result<(), AuthError>;
}

/// Store of single-use expiring tokens (password reset, email
/// verification — one implementation per backing table).
#[async_trait]
pub trait OneTimeTokenRepository: Send + Sync + 'static {
    /// Mark all active tokens for the user as used and insert a fresh one,
    /// in a single transaction. On failure nothing is applied and the
    /// whole operation can be retried.
    async fn replace_active(
        &self,
        user_id: &UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<OneTimeToken, AuthError>;

    async fn find_by_token(&self, token: &str) -> Result<Option<OneTimeToken>, AuthError>;

    /// Set `used_at` on a token row.
    async fn mark_used(&self, id: i64) -> Result<(), AuthError>;

    /// Delete rows past their expiry. Storage hygiene only; expiry is
    /// enforced by timestamp comparison at verification time regardless.
    ///
    /// # Returns
    /// Number of rows deleted
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError>;
}

/// Event publishing for user domain events.
///
/// Delivery is best-effort: callers log publish failures and never
/// propagate them.
#[async_trait]
pub trait EventPublisher: Send + Sync + 'static {
    async fn publish_user_created(
        &self,
        event: &UserCreatedEvent,
    ) -> Result<(), EventPublisherError>;

    async fn publish_user_verified(
        &self,
        event: &UserVerifiedEvent,
    ) -> Result<(), EventPublisherError>;

    async fn publish_resend_verification_requested(
        &self,
        event: &ResendVerificationRequestedEvent,
    ) -> Result<(), EventPublisherError>;

    async fn publish_reset_password_requested(
        &self,
        event: &ResetPasswordRequestedEvent,
    ) -> Result<(), EventPublisherError>;
}
