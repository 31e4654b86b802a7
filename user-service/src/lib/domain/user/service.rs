use std::sync::Arc;

use auth::PasswordHasher;
use auth::TokenError;
use auth::TokenKind;
use auth::TokenService;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use chrono::Duration;
use chrono::Utc;
use sha2::Digest;
use sha2::Sha256;

use crate::domain::user::events::UserCreatedEvent;
use crate::domain::user::models::AuthenticatedUser;
use crate::domain::user::models::RegisterUserCommand;
use crate::domain::user::models::User;
use crate::domain::user::models::UserId;
use crate::user::errors::AuthError;
use crate::user::errors::TokenRejection;
use crate::user::ports::EventPublisher;
use crate::user::ports::OneTimeTokenRepository;
use crate::user::ports::RefreshTokenStore;
use crate::user::ports::UserRepository;

/// Hash a raw refresh token for storage: SHA-256, standard Base64.
///
/// Refresh tokens are reusable bearer credentials with a multi-day
/// validity window, so only their hash is ever persisted.
pub fn hash_token(raw_token: &str) -> String {
    let digest = Sha256::digest(raw_token.as_bytes());
    BASE64_STANDARD.encode(digest)
}

/// Map a session-token rejection into the domain error, keeping the
/// internal reason for logging. Encoding failures are infrastructure
/// problems, not token rejections.
fn token_rejection(err: TokenError) -> AuthError {
    match err {
        TokenError::Expired => AuthError::InvalidToken(TokenRejection::Expired),
        TokenError::InvalidSignature => AuthError::InvalidToken(TokenRejection::BadSignature),
        TokenError::Malformed(_) => AuthError::InvalidToken(TokenRejection::Malformed),
        TokenError::WrongType { .. } => AuthError::InvalidToken(TokenRejection::WrongKind),
        TokenError::EncodingFailed(msg) => AuthError::Unknown(msg),
    }
}

/// Authentication orchestrator: registration, login, session refresh,
/// and logout.
pub struct AuthService<UR, RT, VT, EP>
where
    UR: UserRepository,
    RT: RefreshTokenStore,
    VT: OneTimeTokenRepository,
    EP: EventPublisher,
{
    users: Arc<UR>,
    refresh_tokens: Arc<RT>,
    verification_tokens: Arc<VT>,
    event_publisher: Arc<EP>,
    password_hasher: PasswordHasher,
    token_service: Arc<TokenService>,
    verification_validity: Duration,
}

impl<UR, RT, VT, EP> AuthService<UR, RT, VT, EP>
where
    UR: UserRepository,
    RT: RefreshTokenStore,
    VT: OneTimeTokenRepository,
    EP: EventPublisher,
{
    /// Create a new auth service with injected dependencies.
    ///
    /// # Arguments
    /// * `users` - User persistence implementation
    /// * `refresh_tokens` - Refresh-token hash store
    /// * `verification_tokens` - Email-verification token store
    /// * `event_publisher` - Domain event publishing implementation
    /// * `password_hasher` - Password hashing with configured cost
    /// * `token_service` - Session token issuing/validation
    /// * `verification_validity` - Lifetime of issued verification tokens
    pub fn new(
        users: Arc<UR>,
        refresh_tokens: Arc<RT>,
        verification_tokens: Arc<VT>,
        event_publisher: Arc<EP>,
        password_hasher: PasswordHasher,
        token_service: Arc<TokenService>,
        verification_validity: Duration,
    ) -> Self {
        Self {
            users,
            refresh_tokens,
            verification_tokens,
            event_publisher,
            password_hasher,
            token_service,
            verification_validity,
        }
    }

    /// Register a new user.
    ///
    /// Checks for an existing user with the same email or username,
    /// hashes the password, persists the user, issues an
    /// email-verification token, and publishes `UserCreated` (best
    /// effort).
    ///
    /// # Errors
    /// * `UserAlreadyExists` - Email or username is taken
    /// * `PasswordHashFailure` - Hashing failed
    /// * `DatabaseError` - Store operation failed
    pub async fn register(&self, command: RegisterUserCommand) -> Result<User, AuthError> {
        let existing = self
            .users
            .find_by_email_or_username(command.email.as_str(), command.username.as_str())
            .await?;
        if existing.is_some() {
            return Err(AuthError::UserAlreadyExists);
        }

        let password_hash = self.password_hasher.hash(&command.password)?;

        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            username: command.username,
            email: command.email,
            password_hash,
            email_verified: false,
            created_at: now,
            updated_at: now,
        };

        let created_user = self.users.create(user).await?;

        let verification_token = self
            .verification_tokens
            .replace_active(
                &created_user.id,
                &auth::generate_secure_token(),
                now + self.verification_validity,
            )
            .await?;

        let event = UserCreatedEvent::new(&created_user, &verification_token.token);
        if let Err(e) = self.event_publisher.publish_user_created(&event).await {
            tracing::error!(
                user_id = %created_user.id,
                error = %e,
                "Failed to publish UserCreated event"
            );
        }

        Ok(created_user)
    }

    /// Verify credentials and issue a new session token pair.
    ///
    /// Unknown email and wrong password are indistinguishable to the
    /// caller; both fail with `InvalidCredentials`.
    ///
    /// # Errors
    /// * `InvalidCredentials` - Email unknown or password mismatch
    /// * `PasswordHashFailure` - Stored hash could not be checked
    /// * `DatabaseError` - Store operation failed
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthenticatedUser, AuthError> {
        let user = self
            .users
            .find_by_email(email.trim())
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        if !self.password_hasher.verify(password, &user.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        self.issue_session(user).await
    }

    /// Rotate a refresh token: consume the presented one, issue a new
    /// access+refresh pair.
    ///
    /// Proceeds only when the token validates as a refresh-type JWT. The
    /// store rotation is atomic per `(user, token hash)`: of two
    /// concurrent refreshes with the same token exactly one succeeds.
    /// The old token is dead even if this response is never delivered;
    /// a dropped response forces re-login rather than allowing replay.
    ///
    /// # Errors
    /// * `InvalidToken` - Signature/expiry/type rejected, or no live store record
    /// * `UserNotFound` - Token subject no longer exists
    /// * `DatabaseError` - Store operation failed
    pub async fn refresh(&self, refresh_token: &str) -> Result<AuthenticatedUser, AuthError> {
        let user_id = self
            .token_service
            .validate(refresh_token, TokenKind::Refresh)
            .map_err(token_rejection)?;

        let user = self
            .users
            .find_by_id(&UserId(user_id))
            .await?
            .ok_or(AuthError::UserNotFound)?;

        let new_access = self
            .token_service
            .issue_access(user.id.0)
            .map_err(token_rejection)?;
        let new_refresh = self
            .token_service
            .issue_refresh(user.id.0)
            .map_err(token_rejection)?;

        let expires_at = Utc::now() + self.token_service.refresh_validity();
        let rotated = self
            .refresh_tokens
            .rotate(
                &user.id,
                &hash_token(refresh_token),
                &hash_token(&new_refresh),
                expires_at,
            )
            .await?;

        if !rotated {
            tracing::warn!(user_id = %user.id, "Refresh token has no live store record");
            return Err(AuthError::InvalidToken(TokenRejection::NotFound));
        }

        Ok(AuthenticatedUser {
            user,
            access_token: new_access,
            refresh_token: new_refresh,
        })
    }

    /// End the session belonging to a refresh token.
    ///
    /// Deleting an already-consumed token is a no-op, so logout is
    /// idempotent.
    ///
    /// # Errors
    /// * `InvalidToken` - Token signature/expiry rejected
    /// * `DatabaseError` - Store operation failed
    pub async fn logout(&self, refresh_token: &str) -> Result<(), AuthError> {
        let user_id = self
            .token_service
            .extract_user_id(refresh_token)
            .map_err(token_rejection)?;

        self.refresh_tokens
            .revoke(&UserId(user_id), &hash_token(refresh_token))
            .await
    }

    async fn issue_session(&self, user: User) -> Result<AuthenticatedUser, AuthError> {
        let access_token = self
            .token_service
            .issue_access(user.id.0)
            .map_err(token_rejection)?;
        let refresh_token = self
            .token_service
            .issue_refresh(user.id.0)
            .map_err(token_rejection)?;

        let expires_at = Utc::now() + self.token_service.refresh_validity();
        self.refresh_tokens
            .store(&user.id, &hash_token(&refresh_token), expires_at)
            .await?;

        Ok(AuthenticatedUser {
            user,
            access_token,
            refresh_token,
        })
    }
}
