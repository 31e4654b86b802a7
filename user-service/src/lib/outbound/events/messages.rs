use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::domain::user::events::ResendVerificationRequestedEvent;
use crate::domain::user::events::ResetPasswordRequestedEvent;
use crate::domain::user::events::UserCreatedEvent;
use crate::domain::user::events::UserVerifiedEvent;

/// Serializable envelope for all user-related events.
///
/// Infrastructure representation for event publishing (Kafka, etc.).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum UserEventMessage {
    UserCreated(UserCreatedMessage),
    UserVerified(UserVerifiedMessage),
    ResendVerificationRequested(ResendVerificationRequestedMessage),
    ResetPasswordRequested(ResetPasswordRequestedMessage),
}

/// Serializable message for UserCreated domain event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserCreatedMessage {
    pub event_id: String,
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub verification_token: String,
    pub occurred_at: DateTime<Utc>,
}

impl From<&UserCreatedEvent> for UserCreatedMessage {
    fn from(event: &UserCreatedEvent) -> Self {
        Self {
            event_id: event.event_id.clone(),
            user_id: event.user_id.clone(),
            username: event.username.clone(),
            email: event.email.clone(),
            verification_token: event.verification_token.clone(),
            occurred_at: event.occurred_at,
        }
    }
}

impl From<UserCreatedEvent> for UserEventMessage {
    fn from(event: UserCreatedEvent) -> Self {
        UserEventMessage::UserCreated(UserCreatedMessage::from(&event))
    }
}

/// Serializable message for UserVerified domain event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserVerifiedMessage {
    pub event_id: String,
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub occurred_at: DateTime<Utc>,
}

impl From<&UserVerifiedEvent> for UserVerifiedMessage {
    fn from(event: &UserVerifiedEvent) -> Self {
        Self {
            event_id: event.event_id.clone(),
            user_id: event.user_id.clone(),
            username: event.username.clone(),
            email: event.email.clone(),
            occurred_at: event.occurred_at,
        }
    }
}

impl From<UserVerifiedEvent> for UserEventMessage {
    fn from(event: UserVerifiedEvent) -> Self {
        UserEventMessage::UserVerified(UserVerifiedMessage::from(&event))
    }
}

/// Serializable message for ResendVerificationRequested domain event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResendVerificationRequestedMessage {
    pub event_id: String,
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub verification_token: String,
    pub occurred_at: DateTime<Utc>,
}

impl From<&ResendVerificationRequestedEvent> for ResendVerificationRequestedMessage {
    fn from(event: &ResendVerificationRequestedEvent) -> Self {
        Self {
            event_id: event.event_id.clone(),
            user_id: event.user_id.clone(),
            username: event.username.clone(),
            email: event.email.clone(),
            verification_token: event.verification_token.clone(),
            occurred_at: event.occurred_at,
        }
    }
}

impl From<ResendVerificationRequestedEvent> for UserEventMessage {
    fn from(event: ResendVerificationRequestedEvent) -> Self {
        UserEventMessage::ResendVerificationRequested(ResendVerificationRequestedMessage::from(
            &event,
        ))
    }
}

/// Serializable message for ResetPasswordRequested domain event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResetPasswordRequestedMessage {
    pub event_id: String,
    pub user_id: String,
    pub username: String,
    pub email: String,
    pub reset_token: String,
    pub expires_in_minutes: i64,
    pub occurred_at: DateTime<Utc>,
}

impl From<&ResetPasswordRequestedEvent> for ResetPasswordRequestedMessage {
    fn from(event: &ResetPasswordRequestedEvent) -> Self {
        Self {
            event_id: event.event_id.clone(),
            user_id: event.user_id.clone(),
            username: event.username.clone(),
            email: event.email.clone(),
            reset_token: event.reset_token.clone(),
            expires_in_minutes: event.expires_in_minutes,
            occurred_at: event.occurred_at,
        }
    }
}

impl From<ResetPasswordRequestedEvent> for UserEventMessage {
    fn from(event: ResetPasswordRequestedEvent) -> Self {
        UserEventMessage::ResetPasswordRequested(ResetPasswordRequestedMessage::from(&event))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::user::models::User;
    use crate::domain::user::models::UserId;
    use crate::user::models::EmailAddress;
    use crate::user::models::Username;

    fn user() -> User {
        User {
            id: UserId::new(),
            username: Username::new("alice".to_string()).unwrap(),
            email: EmailAddress::new("alice@example.com".to_string()).unwrap(),
            password_hash: "$argon2id$stub".to_string(),
            email_verified: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_created_message_is_tagged() {
        let event = UserCreatedEvent::new(&user(), "tok123");
        let message: UserEventMessage = event.into();

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["event_type"], "user_created");
        assert_eq!(json["verification_token"], "tok123");
    }

    #[test]
    fn test_reset_password_message_carries_expiry() {
        let event = ResetPasswordRequestedEvent::new(&user(), "tok456", 30);
        let message: UserEventMessage = event.into();

        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["event_type"], "reset_password_requested");
        assert_eq!(json["expires_in_minutes"], 30);
    }
}
