use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Server-side record backing one issued refresh token.
///
/// Only a bcrypt hash of the token is stored. The record id travels inside the token as its
/// `tid` claim so the record can be found without scanning hashes.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshTokenRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RefreshTokenRecord {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}
