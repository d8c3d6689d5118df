//! Refresh token model

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Persisted refresh token. At most one row exists per user; replacement is
/// an atomic upsert keyed by `user_id`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RefreshToken {
    pub user_id: Uuid,
    pub token: String,
}
