use chrono::Duration;
use jsonwebtoken::decode;
use jsonwebtoken::encode;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::Algorithm;
use jsonwebtoken::DecodingKey;
use jsonwebtoken::EncodingKey;
use jsonwebtoken::Header;
use jsonwebtoken::Validation;
use uuid::Uuid;

use super::claims::SessionClaims;
use super::claims::TokenKind;
use super::errors::TokenError;

/// Issues and validates signed session tokens.
///
/// Both token kinds are HS256-signed JWTs sharing one secret. Access
/// tokens are short-lived and checked statelessly on every request;
/// refresh tokens are longer-lived and must additionally have a live
/// record in the refresh-token store.
///
/// # Security Notes
/// - The secret should be at least 256 bits (32 bytes) for HS256
/// - Store secrets in environment variables or secure vaults, never in code
/// - The secret is injected here at construction; there is no global state
pub struct TokenService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    algorithm: Algorithm,
    access_validity: Duration,
    refresh_validity: Duration,
}

impl TokenService {
    /// Create a token service with the given signing secret and lifetimes.
    ///
    /// # Arguments
    /// * `secret` - Shared HMAC signing secret
    /// * `access_validity_minutes` - Access token lifetime in minutes
    /// * `refresh_validity_days` - Refresh token lifetime in days
    pub fn new(secret: &[u8], access_validity_minutes: i64, refresh_validity_days: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            algorithm: Algorithm::HS256,
            access_validity: Duration::minutes(access_validity_minutes),
            refresh_validity: Duration::days(refresh_validity_days),
        }
    }

    /// Lifetime of refresh tokens, used to compute store record expiry.
    pub fn refresh_validity(&self) -> Duration {
        self.refresh_validity
    }

    /// Issue a short-lived access token for a user.
    ///
    /// # Errors
    /// * `EncodingFailed` - Token encoding failed
    pub fn issue_access(&self, user_id: Uuid) -> Result<String, TokenError> {
        self.issue(user_id, TokenKind::Access, self.access_validity)
    }

    /// Issue a refresh token for a user.
    ///
    /// The caller is responsible for persisting the token's hash in the
    /// refresh-token store; the JWT alone is not sufficient for a refresh.
    ///
    /// # Errors
    /// * `EncodingFailed` - Token encoding failed
    pub fn issue_refresh(&self, user_id: Uuid) -> Result<String, TokenError> {
        self.issue(user_id, TokenKind::Refresh, self.refresh_validity)
    }

    /// Validate a token and return its subject.
    ///
    /// Accepts tokens with or without a `Bearer ` prefix.
    ///
    /// # Errors
    /// * `Expired` - Token expiry is in the past
    /// * `InvalidSignature` - Signature does not match the secret
    /// * `Malformed` - Token is not a parseable JWT
    /// * `WrongType` - `type` claim does not match `expected`
    pub fn validate(&self, token: &str, expected: TokenKind) -> Result<Uuid, TokenError> {
        let claims = self.decode(token)?;

        if claims.kind != expected {
            return Err(TokenError::WrongType {
                expected,
                actual: claims.kind,
            });
        }

        Ok(claims.sub)
    }

    /// Extract the user ID from a token without checking its kind.
    ///
    /// Signature and expiry are still verified; only the `type` claim
    /// check is skipped.
    ///
    /// # Errors
    /// * `Expired` / `InvalidSignature` / `Malformed` - as for `validate`
    pub fn extract_user_id(&self, token: &str) -> Result<Uuid, TokenError> {
        Ok(self.decode(token)?.sub)
    }

    fn issue(
        &self,
        user_id: Uuid,
        kind: TokenKind,
        validity: Duration,
    ) -> Result<String, TokenError> {
        let header = Header::new(self.algorithm);
        let claims = SessionClaims::new(user_id, kind, validity);

        encode(&header, &claims, &self.encoding_key)
            .map_err(|e| TokenError::EncodingFailed(e.to_string()))
    }

    fn decode(&self, token: &str) -> Result<SessionClaims, TokenError> {
        let raw_token = token.strip_prefix("Bearer ").unwrap_or(token);

        let validation = Validation::new(self.algorithm);

        let token_data =
            decode::<SessionClaims>(raw_token, &self.decoding_key, &validation).map_err(|e| {
                match e.kind() {
                    ErrorKind::ExpiredSignature => TokenError::Expired,
                    ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                    _ => TokenError::Malformed(e.to_string()),
                }
            })?;

        Ok(token_data.claims)
    }
}
