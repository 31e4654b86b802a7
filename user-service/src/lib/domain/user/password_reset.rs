use std::sync::Arc;

use auth::PasswordHasher;
use chrono::Duration;
use chrono::Utc;

use crate::domain::user::events::ResetPasswordRequestedEvent;
use crate::domain::user::models::UserId;
use crate::user::errors::AuthError;
use crate::user::errors::TokenRejection;
use crate::user::ports::EventPublisher;
use crate::user::ports::OneTimeTokenRepository;
use crate::user::ports::RefreshTokenStore;
use crate::user::ports::UserRepository;

/// Password reset and password change flows.
///
/// Reset tokens are single-use, expiring, and superseded by newer
/// requests. Any successful password change revokes every refresh token
/// for the user, forcing re-login everywhere.
pub struct PasswordResetService<UR, RT, PR, EP>
where
    UR: UserRepository,
    RT: RefreshTokenStore,
    PR: OneTimeTokenRepository,
    EP: EventPublisher,
{
    users: Arc<UR>,
    refresh_tokens: Arc<RT>,
    reset_tokens: Arc<PR>,
    event_publisher: Arc<EP>,
    password_hasher: PasswordHasher,
    reset_validity: Duration,
}

impl<UR, RT, PR, EP> PasswordResetService<UR, RT, PR, EP>
where
    UR: UserRepository,
    RT: RefreshTokenStore,
    PR: OneTimeTokenRepository,
    EP: EventPublisher,
{
    pub fn new(
        users: Arc<UR>,
        refresh_tokens: Arc<RT>,
        reset_tokens: Arc<PR>,
        event_publisher: Arc<EP>,
        password_hasher: PasswordHasher,
        reset_validity: Duration,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            reset_tokens,
            event_publisher,
            password_hasher,
            reset_validity,
        }
    }

    /// Start a password reset for the given email address.
    ///
    /// Unknown email addresses return success with no observable state
    /// change: the API must not reveal whether an email is registered.
    /// For known users, prior active tokens are invalidated and a new one
    /// is created in a single transaction, then a
    /// `ResetPasswordRequested` event is published best-effort.
    ///
    /// # Errors
    /// * `DatabaseError` - Store operation failed
    pub async fn request_reset(&self, email: &str) -> Result<(), AuthError> {
        let Some(user) = self.users.find_by_email(email.trim()).await? else {
            tracing::debug!("Password reset requested for unregistered email");
            return Ok(());
        };

        let expires_at = Utc::now() + self.reset_validity;
        let token = self
            .reset_tokens
            .replace_active(&user.id, &auth::generate_secure_token(), expires_at)
            .await?;

        let event =
            ResetPasswordRequestedEvent::new(&user, &token.token, self.reset_validity.num_minutes());
        if let Err(e) = self
            .event_publisher
            .publish_reset_password_requested(&event)
            .await
        {
            tracing::error!(
                user_id = %user.id,
                error = %e,
                "Failed to publish ResetPasswordRequested event"
            );
        }

        Ok(())
    }

    /// Complete a password reset with a previously issued token.
    ///
    /// Unknown, already-used, and expired tokens each surface a distinct
    /// internal reason; the API layer collapses them into one generic
    /// code. A `SamePassword` failure does not consume the token.
    ///
    /// # Errors
    /// * `InvalidToken` - Token unknown, used, or expired
    /// * `UserNotFound` - Token owner no longer exists
    /// * `SamePassword` - New password matches the current one
    /// * `PasswordHashFailure` - Hashing failed
    /// * `DatabaseError` - Store operation failed
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<(), AuthError> {
        let record = self
            .reset_tokens
            .find_by_token(token)
            .await?
            .ok_or(AuthError::InvalidToken(TokenRejection::NotFound))?;

        if record.is_used() {
            tracing::warn!(user_id = %record.user_id, "Reset token presented twice");
            return Err(AuthError::InvalidToken(TokenRejection::AlreadyUsed));
        }
        if record.is_expired(Utc::now()) {
            return Err(AuthError::InvalidToken(TokenRejection::Expired));
        }

        let user = self
            .users
            .find_by_id(&record.user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if self
            .password_hasher
            .verify(new_password, &user.password_hash)?
        {
            return Err(AuthError::SamePassword);
        }

        let new_hash = self.password_hasher.hash(new_password)?;
        self.users.update_password(&user.id, &new_hash).await?;
        self.reset_tokens.mark_used(record.id).await?;

        // Every open session dies with the old password.
        self.refresh_tokens.revoke_all(&user.id).await?;

        Ok(())
    }

    /// Change the password of a logged-in user.
    ///
    /// # Errors
    /// * `UserNotFound` - No user with this ID
    /// * `IncorrectOldPassword` - Old password does not match
    /// * `SamePassword` - New password matches the current one
    /// * `PasswordHashFailure` - Hashing failed
    /// * `DatabaseError` - Store operation failed
    pub async fn change_password(
        &self,
        user_id: &UserId,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !self
            .password_hasher
            .verify(old_password, &user.password_hash)?
        {
            return Err(AuthError::IncorrectOldPassword);
        }
        if self
            .password_hasher
            .verify(new_password, &user.password_hash)?
        {
            return Err(AuthError::SamePassword);
        }

        self.refresh_tokens.revoke_all(&user.id).await?;

        let new_hash = self.password_hasher.hash(new_password)?;
        self.users.update_password(&user.id, &new_hash).await?;

        Ok(())
    }

    /// Delete reset tokens past their expiry. Run on a daily schedule;
    /// purely storage hygiene, since expiry is checked at verification
    /// time anyway.
    pub async fn sweep_expired(&self) -> Result<u64, AuthError> {
        let deleted = self.reset_tokens.delete_expired(Utc::now()).await?;
        if deleted > 0 {
            tracing::info!(deleted, "Swept expired password reset tokens");
        }
        Ok(deleted)
    }
}
