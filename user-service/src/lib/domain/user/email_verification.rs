use std::sync::Arc;

use chrono::Duration;
use chrono::Utc;

use crate::domain::user::events::ResendVerificationRequestedEvent;
use crate::domain::user::events::UserVerifiedEvent;
use crate::domain::user::models::OneTimeToken;
use crate::user::errors::AuthError;
use crate::user::errors::TokenRejection;
use crate::user::ports::EventPublisher;
use crate::user::ports::OneTimeTokenRepository;
use crate::user::ports::UserRepository;

/// Email verification token lifecycle.
///
/// Tokens follow the same shape as password-reset tokens: single-use,
/// expiring, superseded by newer issues for the same user.
pub struct EmailVerificationService<UR, VR, EP>
where
    UR: UserRepository,
    VR: OneTimeTokenRepository,
    EP: EventPublisher,
{
    users: Arc<UR>,
    verification_tokens: Arc<VR>,
    event_publisher: Arc<EP>,
    verification_validity: Duration,
}

impl<UR, VR, EP> EmailVerificationService<UR, VR, EP>
where
    UR: UserRepository,
    VR: OneTimeTokenRepository,
    EP: EventPublisher,
{
    pub fn new(
        users: Arc<UR>,
        verification_tokens: Arc<VR>,
        event_publisher: Arc<EP>,
        verification_validity: Duration,
    ) -> Self {
        Self {
            users,
            verification_tokens,
            event_publisher,
            verification_validity,
        }
    }

    /// Issue a fresh verification token for a registered email address,
    /// invalidating any prior active ones in the same transaction.
    ///
    /// # Errors
    /// * `UserNotFound` - No user with this email
    /// * `DatabaseError` - Store operation failed
    pub async fn issue(&self, email: &str) -> Result<OneTimeToken, AuthError> {
        let user = self
            .users
            .find_by_email(email.trim())
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let expires_at = Utc::now() + self.verification_validity;
        let token = self
            .verification_tokens
            .replace_active(&user.id, &auth::generate_secure_token(), expires_at)
            .await?;

        Ok(token)
    }

    /// Re-send a verification email. Unknown addresses return success
    /// with no state change so the endpoint cannot be used to probe for
    /// registered emails.
    ///
    /// # Errors
    /// * `DatabaseError` - Store operation failed
    pub async fn resend(&self, email: &str) -> Result<(), AuthError> {
        let token = match self.issue(email).await {
            Ok(token) => token,
            Err(AuthError::UserNotFound) => {
                tracing::debug!("Verification resend requested for unregistered email");
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        // issue() just confirmed the user exists
        let user = self
            .users
            .find_by_email(email.trim())
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let event = ResendVerificationRequestedEvent::new(&user, &token.token);
        if let Err(e) = self
            .event_publisher
            .publish_resend_verification_requested(&event)
            .await
        {
            tracing::error!(
                user_id = %user.id,
                error = %e,
                "Failed to publish ResendVerificationRequested event"
            );
        }

        Ok(())
    }

    /// Verify an email address with a previously issued token, marking
    /// it used and flipping the user's verified flag.
    ///
    /// # Errors
    /// * `InvalidToken` - Token unknown, used, or expired
    /// * `UserNotFound` - Token owner no longer exists
    /// * `DatabaseError` - Store operation failed
    pub async fn verify(&self, token: &str) -> Result<(), AuthError> {
        let record = self
            .verification_tokens
            .find_by_token(token)
            .await?
            .ok_or(AuthError::InvalidToken(TokenRejection::NotFound))?;

        if record.is_used() {
            tracing::warn!(user_id = %record.user_id, "Verification token presented twice");
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

        self.verification_tokens.mark_used(record.id).await?;
        self.users.set_email_verified(&user.id).await?;

        let event = UserVerifiedEvent::new(&user);
        if let Err(e) = self.event_publisher.publish_user_verified(&event).await {
            tracing::error!(
                user_id = %user.id,
                error = %e,
                "Failed to publish UserVerified event"
            );
        }

        Ok(())
    }

    /// Delete verification tokens past their expiry.
    pub async fn sweep_expired(&self) -> Result<u64, AuthError> {
        let deleted = self.verification_tokens.delete_expired(Utc::now()).await?;
        if deleted > 0 {
            tracing::info!(deleted, "Swept expired email verification tokens");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use mockall::predicate::*;

    use super::*;
    use crate::domain::user::mocks::user_with_password;
    use crate::domain::user::mocks::MockEvents;
    use crate::domain::user::mocks::MockTokenRepo;
    use crate::domain::user::mocks::MockUserRepo;
    use crate::domain::user::models::UserId;

    fn service(
        users: MockUserRepo,
        verification_tokens: MockTokenRepo,
        events: MockEvents,
    ) -> EmailVerificationService<MockUserRepo, MockTokenRepo, MockEvents> {
        EmailVerificationService::new(
            Arc::new(users),
            Arc::new(verification_tokens),
            Arc::new(events),
            Duration::hours(24),
        )
    }

    fn live_token(user_id: UserId) -> OneTimeToken {
        OneTimeToken {
            id: 11,
            token: auth::generate_secure_token(),
            user_id,
            expires_at: Utc::now() + Duration::hours(24),
            created_at: Utc::now(),
            used_at: None,
        }
    }

    #[tokio::test]
    async fn test_issue_unknown_email_fails() {
        let mut users = MockUserRepo::new();
        let verification_tokens = MockTokenRepo::new();
        let events = MockEvents::new();

        users.expect_find_by_email().returning(|_| Ok(None));

        let service = service(users, verification_tokens, events);
        let result = service.issue("nobody@example.com").await;

        assert!(matches!(result, Err(AuthError::UserNotFound)));
    }

    #[tokio::test]
    async fn test_issue_replaces_active_tokens() {
        let mut users = MockUserRepo::new();
        let mut verification_tokens = MockTokenRepo::new();
        let events = MockEvents::new();

        let user = user_with_password("Passw0rd!");
        let user_id = user.id;
        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));
        verification_tokens
            .expect_replace_active()
            .withf(move |id, token, _| *id == user_id && token.len() >= 32)
            .times(1)
            .returning(|user_id, token, expires_at| {
                Ok(OneTimeToken {
                    id: 1,
                    token: token.to_string(),
                    user_id: *user_id,
                    expires_at,
                    created_at: Utc::now(),
                    used_at: None,
                })
            });

        let service = service(users, verification_tokens, events);
        let token = service.issue("test@example.com").await.unwrap();

        assert_eq!(token.user_id, user_id);
        assert!(token.used_at.is_none());
    }

    #[tokio::test]
    async fn test_resend_unknown_email_is_silent_noop() {
        let mut users = MockUserRepo::new();
        let mut verification_tokens = MockTokenRepo::new();
        let mut events = MockEvents::new();

        users.expect_find_by_email().returning(|_| Ok(None));
        verification_tokens.expect_replace_active().times(0);
        events.expect_publish_resend_verification_requested().times(0);

        let service = service(users, verification_tokens, events);
        assert!(service.resend("nobody@example.com").await.is_ok());
    }

    #[tokio::test]
    async fn test_resend_publishes_event() {
        let mut users = MockUserRepo::new();
        let mut verification_tokens = MockTokenRepo::new();
        let mut events = MockEvents::new();

        let user = user_with_password("Passw0rd!");
        users
            .expect_find_by_email()
            .returning(move |_| Ok(Some(user.clone())));
        verification_tokens
            .expect_replace_active()
            .returning(|user_id, token, expires_at| {
                Ok(OneTimeToken {
                    id: 1,
                    token: token.to_string(),
                    user_id: *user_id,
                    expires_at,
                    created_at: Utc::now(),
                    used_at: None,
                })
            });
        events
            .expect_publish_resend_verification_requested()
            .withf(|event| !event.verification_token.is_empty())
            .times(1)
            .returning(|_| Ok(()));

        let service = service(users, verification_tokens, events);
        assert!(service.resend("test@example.com").await.is_ok());
    }

    #[tokio::test]
    async fn test_verify_success_sets_flag_and_publishes() {
        let mut users = MockUserRepo::new();
        let mut verification_tokens = MockTokenRepo::new();
        let mut events = MockEvents::new();

        let user = user_with_password("Passw0rd!");
        let user_id = user.id;
        let token = live_token(user_id);
        let raw_token = token.token.clone();

        verification_tokens
            .expect_find_by_token()
            .with(eq(raw_token.clone()))
            .returning(move |_| Ok(Some(token.clone())));
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(user.clone())));
        verification_tokens
            .expect_mark_used()
            .with(eq(11i64))
            .times(1)
            .returning(|_| Ok(()));
        users
            .expect_set_email_verified()
            .withf(move |id| *id == user_id)
            .times(1)
            .returning(|_| Ok(()));
        events
            .expect_publish_user_verified()
            .times(1)
            .returning(|_| Ok(()));

        let service = service(users, verification_tokens, events);
        assert!(service.verify(&raw_token).await.is_ok());
    }

    #[tokio::test]
    async fn test_verify_used_token_rejected() {
        let mut users = MockUserRepo::new();
        let mut verification_tokens = MockTokenRepo::new();
        let events = MockEvents::new();

        let mut token = live_token(UserId::new());
        token.used_at = Some(Utc::now());
        verification_tokens
            .expect_find_by_token()
            .returning(move |_| Ok(Some(token.clone())));
        users.expect_set_email_verified().times(0);

        let service = service(users, verification_tokens, events);
        let result = service.verify("whatever").await;

        assert!(matches!(
            result,
            Err(AuthError::InvalidToken(TokenRejection::AlreadyUsed))
        ));
    }

    #[tokio::test]
    async fn test_verify_expired_token_rejected() {
        let users = MockUserRepo::new();
        let mut verification_tokens = MockTokenRepo::new();
        let events = MockEvents::new();

        let mut token = live_token(UserId::new());
        token.expires_at = Utc::now() - Duration::minutes(1);
        verification_tokens
            .expect_find_by_token()
            .returning(move |_| Ok(Some(token.clone())));

        let service = service(users, verification_tokens, events);
        let result = service.verify("whatever").await;

        assert!(matches!(
            result,
            Err(AuthError::InvalidToken(TokenRejection::Expired))
        ));
    }

    #[tokio::test]
    async fn test_verify_unknown_token_rejected() {
        let users = MockUserRepo::new();
        let mut verification_tokens = MockTokenRepo::new();
        let events = MockEvents::new();

        verification_tokens
            .expect_find_by_token()
            .returning(|_| Ok(None));

        let service = service(users, verification_tokens, events);
        let result = service.verify("unknown").await;

        assert!(matches!(
            result,
            Err(AuthError::InvalidToken(TokenRejection::NotFound))
        ));
    }

    #[tokio::test]
    async fn test_sweep_expired_reports_count() {
        let users = MockUserRepo::new();
        let mut verification_tokens = MockTokenRepo::new();
        let events = MockEvents::new();

        verification_tokens
            .expect_delete_expired()
            .times(1)
            .returning(|_| Ok(5));

        let service = service(users, verification_tokens, events);
        assert_eq!(service.sweep_expired().await.unwrap(), 5);
    }
}
