//! Shared mockall mocks for the domain ports, used by the service tests.

use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use mockall::mock;

use crate::domain::user::events::ResendVerificationRequestedEvent;
use crate::domain::user::events::ResetPasswordRequestedEvent;
use crate::domain::user::events::UserCreatedEvent;
use crate::domain::user::events::UserVerifiedEvent;
use crate::domain::user::models::OneTimeToken;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::domain::user::models::Username;
use crate::domain::user::ports::EventPublisher;
use crate::domain::user::ports::OneTimeTokenRepository;
use crate::domain::user::ports::RefreshTokenStore;
use crate::domain::user::ports::UserRepository;
use crate::user::errors::AuthError;
use crate::user::errors::EventPublisherError;

mock! {
    pub UserRepo {}

    #[async_trait]
    impl UserRepository for UserRepo {
        async fn create(&self, user: User) -> Result<User, AuthError>;
        async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, AuthError>;
        async fn find_by_email(&self, email: &str) -> Result<Option<User>, AuthError>;
        async fn find_by_username(&self, username: &Username) -> Result<Option<User>, AuthError>;
        async fn find_by_email_or_username(
            &self,
            email: &str,
            username: &str,
        ) -> Result<Option<User>, AuthError>;
        async fn update_password(&self, id: &UserId, password_hash: &str) -> Result<(), AuthError>;
        async fn set_email_verified(&self, id: &UserId) -> Result<(), AuthError>;
    }
}

mock! {
    pub RefreshTokens {}

    #[async_trait]
    impl RefreshTokenStore for RefreshTokens {
        async fn store(
            &self,
            user_id: &UserId,
            token_hash: &str,
            expires_at: DateTime<Utc>,
        ) -> Result<(), AuthError>;
        async fn rotate(
            &self,
            user_id: &UserId,
            old_hash: &str,
            new_hash: &str,
            expires_at: DateTime<Utc>,
        ) -> Result<bool, AuthError>;
        async fn revoke(&self, user_id: &UserId, token_hash: &str) -> Result<(), AuthError>;
        async fn revoke_all(&self, user_id: &UserId) -> Result<(), AuthError>;
    }
}

mock! {
    pub TokenRepo {}

    #[async_trait]
    impl OneTimeTokenRepository for TokenRepo {
        async fn replace_active(
            &self,
            user_id: &UserId,
            token: &str,
            expires_at: DateTime<Utc>,
        ) -> Result<OneTimeToken, AuthError>;
        async fn find_by_token(&self, token: &str) -> Result<Option<OneTimeToken>, AuthError>;
        async fn mark_used(&self, id: i64) -> Result<(), AuthError>;
        async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError>;
    }
}

mock! {
    pub Events {}

    #[async_trait]
    impl EventPublisher for Events {
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
}

/// Build a user with a real Argon2 hash of `password`, cheap parameters.
pub fn user_with_password(password: &str) -> User {
    let hasher = auth::PasswordHasher::with_params(8192, 1, 1).unwrap();
    let now = Utc::now();
    User {
        id: UserId::new(),
        username: Username::new("testuser".to_string()).unwrap(),
        email: crate::user::models::EmailAddress::new("test@example.com".to_string()).unwrap(),
        password_hash: hasher.hash(password).unwrap(),
        email_verified: false,
        created_at: now,
        updated_at: now,
    }
}
