//! Refresh token repository for database operations

use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::RefreshToken;

/// Refresh token repository
#[derive(Clone)]
pub struct TokenRepository {
    pool: PgPool,
}

impl TokenRepository {
    /// Create a new token repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Store the refresh token for a user, replacing any previous one.
    ///
    /// The upsert is a single atomic statement keyed by `user_id`, so
    /// exactly one live token exists per user after this call.
    pub async fn save(&self, user_id: Uuid, refresh_token: &str) -> sqlx::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_tokens (user_id, token)
            VALUES ($1, $2)
            ON CONFLICT (user_id) DO UPDATE SET token = EXCLUDED.token
            "#,
        )
        .bind(user_id)
        .bind(refresh_token)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Look a refresh token up by its value
    pub async fn find(&self, refresh_token: &str) -> sqlx::Result<Option<RefreshToken>> {
        let row = sqlx::query(
            r#"
            SELECT user_id, token
            FROM user_tokens
            WHERE token = $1
            "#,
        )
        .bind(refresh_token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| RefreshToken {
            user_id: r.get("user_id"),
            token: r.get("token"),
        }))
    }

    /// Delete a refresh token by its value, returning the removed record.
    /// An absent token is not an error, which makes logout idempotent.
    pub async fn remove(&self, refresh_token: &str) -> sqlx::Result<Option<RefreshToken>> {
        let row = sqlx::query(
            r#"
            DELETE FROM user_tokens
            WHERE token = $1
            RETURNING user_id, token
            "#,
        )
        .bind(refresh_token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| RefreshToken {
            user_id: r.get("user_id"),
            token: r.get("token"),
        }))
    }
}
