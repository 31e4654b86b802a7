use std::fmt;

use chrono::Duration;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// Kind of session token, carried in the `type` claim.
///
/// Access tokens authenticate API calls statelessly; refresh tokens are
/// additionally checked against the durable store so they can be revoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// Claims encoded into every session token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionClaims {
    /// Subject: user ID
    pub sub: Uuid,

    /// Token kind discriminator
    #[serde(rename = "type")]
    pub kind: TokenKind,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

impl SessionClaims {
    /// Build claims for a user with expiry relative to the current time.
    pub fn new(user_id: Uuid, kind: TokenKind, validity: Duration) -> Self {
        let now = Utc::now();
        Self {
            sub: user_id,
            kind,
            iat: now.timestamp(),
            exp: (now + validity).timestamp(),
        }
    }
}
