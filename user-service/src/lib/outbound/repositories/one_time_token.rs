use async_trait::async_trait;
use chrono::DateTime;
use chrono::Utc;
use sqlx::FromRow;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::user::models::OneTimeToken;
use crate::domain::user::models::UserId;
use crate::domain::user::ports::OneTimeTokenRepository;
use crate::user::errors::AuthError;

#[derive(FromRow)]
struct OneTimeTokenRow {
    id: i64,
    token: String,
    user_id: Uuid,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    used_at: Option<DateTime<Utc>>,
}

impl From<OneTimeTokenRow> for OneTimeToken {
    fn from(row: OneTimeTokenRow) -> Self {
        OneTimeToken {
            id: row.id,
            token: row.token,
            user_id: UserId(row.user_id),
            expires_at: row.expires_at,
            created_at: row.created_at,
            used_at: row.used_at,
        }
    }
}

/// Shared queries over the two one-time-token tables. The tables have
/// identical shape; only the name differs, fixed at construction so the
/// SQL never interpolates caller input.
struct OneTimeTokenQueries {
    pool: PgPool,
    table: &'static str,
}

impl OneTimeTokenQueries {
    async fn replace_active(
        &self,
        user_id: &UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<OneTimeToken, AuthError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        // Supersede-then-create must be atomic so a crash never leaves the
        // user with zero consumable tokens and no fresh one issued.
        sqlx::query(&format!(
            "UPDATE {} SET used_at = NOW() WHERE user_id = $1 AND used_at IS NULL",
            self.table
        ))
        .bind(user_id.0)
        .execute(&mut *tx)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        let row: OneTimeTokenRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO {} (token, user_id, expires_at)
            VALUES ($1, $2, $3)
            RETURNING id, token, user_id, expires_at, created_at, used_at
            "#,
            self.table
        ))
        .bind(token)
        .bind(user_id.0)
        .bind(expires_at)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        tx.commit()
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        Ok(row.into())
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<OneTimeToken>, AuthError> {
        let row: Option<OneTimeTokenRow> = sqlx::query_as(&format!(
            r#"
            SELECT id, token, user_id, expires_at, created_at, used_at
            FROM {}
            WHERE token = $1
            "#,
            self.table
        ))
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        Ok(row.map(OneTimeToken::from))
    }

    async fn mark_used(&self, id: i64) -> Result<(), AuthError> {
        sqlx::query(&format!(
            "UPDATE {} SET used_at = NOW() WHERE id = $1",
            self.table
        ))
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        Ok(())
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        let result = sqlx::query(&format!("DELETE FROM {} WHERE expires_at < $1", self.table))
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(|e| AuthError::DatabaseError(e.to_string()))?;

        Ok(result.rows_affected())
    }
}

pub struct PostgresPasswordResetTokenRepository {
    queries: OneTimeTokenQueries,
}

impl PostgresPasswordResetTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            queries: OneTimeTokenQueries {
                pool,
                table: "password_reset_tokens",
            },
        }
    }
}

#[async_trait]
impl OneTimeTokenRepository for PostgresPasswordResetTokenRepository {
    async fn replace_active(
        &self,
        user_id: &UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<OneTimeToken, AuthError> {
        self.queries.replace_active(user_id, token, expires_at).await
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<OneTimeToken>, AuthError> {
        self.queries.find_by_token(token).await
    }

    async fn mark_used(&self, id: i64) -> Result<(), AuthError> {
        self.queries.mark_used(id).await
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        self.queries.delete_expired(now).await
    }
}

pub struct PostgresEmailVerificationTokenRepository {
    queries: OneTimeTokenQueries,
}

impl PostgresEmailVerificationTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self {
            queries: OneTimeTokenQueries {
                pool,
                table: "email_verification_tokens",
            },
        }
    }
}

#[async_trait]
impl OneTimeTokenRepository for PostgresEmailVerificationTokenRepository {
    async fn replace_active(
        &self,
        user_id: &UserId,
        token: &str,
        expires_at: DateTime<Utc>,
    ) -> Result<OneTimeToken, AuthError> {
        self.queries.replace_active(user_id, token, expires_at).await
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<OneTimeToken>, AuthError> {
        self.queries.find_by_token(token).await
    }

    async fn mark_used(&self, id: i64) -> Result<(), AuthError> {
        self.queries.mark_used(id).await
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, AuthError> {
        self.queries.delete_expired(now).await
    }
}
