//! Login and token lifecycle.
//!
//! Access tokens are short-lived and stateless. Refresh tokens are backed by a row in
//! `refresh_tokens` holding only a hash of the token, and are single-use: a successful refresh
//! deletes the presented record and stores its replacement in the same transaction.
//!
//! bcrypt work (checking the presented token, hashing the new one) runs before that transaction
//! opens, so the SQLite write lock is only held for the delete and the insert.

use crate::config::CoreConfig;
use crate::db::Db;
use crate::error::{CoreError, CoreResult};
use crate::models::{RefreshTokenRecord, Role, User};
use crate::password::{hash_token, verify_password, verify_token};
use crate::repositories::users::{find_by_id, find_row_by_email};
use crate::validation::validate_login;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::SqliteConnection;
use std::sync::Arc;
use uuid::Uuid;

/// Claims carried by an access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,
    pub email: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RefreshClaims {
    sub: Uuid,
    /// Id of the backing `refresh_tokens` row.
    tid: Uuid,
    iat: i64,
    exp: i64,
}

/// A signed pair whose refresh record has not been stored yet.
struct MintedPair {
    pair: TokenPair,
    token_id: Uuid,
    user_id: Uuid,
    token_hash: String,
    issued_at: DateTime<Utc>,
}

/// A presented refresh token that passed every check except single use.
#[derive(Debug)]
struct CheckedRefresh {
    record_id: Uuid,
    user: User,
}

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub access_expires_at: DateTime<Utc>,
    pub refresh_expires_at: DateTime<Utc>,
}

#[derive(Clone, Debug)]
pub struct AuthService {
    db: Db,
    cfg: Arc<CoreConfig>,
}

impl AuthService {
    pub fn new(db: Db, cfg: Arc<CoreConfig>) -> Self {
        Self { db, cfg }
    }

    /// Checks credentials and issues a token pair.
    ///
    /// An unknown email and a wrong password are indistinguishable to the caller.
    pub async fn login(&self, email: &str, password: &str) -> CoreResult<(User, TokenPair)> {
        validate_login(email, password)?;
        let email = email.trim().to_lowercase();

        let mut conn = self.db.pool().acquire().await?;
        let Some(row) = find_row_by_email(&mut conn, &email).await? else {
            tracing::info!("login rejected: unknown email");
            return Err(CoreError::InvalidCredentials);
        };
        let (user, password_hash) = row.into_parts();

        if !verify_password(password, &password_hash).await? {
            tracing::info!(user_id = %user.id, "login rejected: wrong password");
            return Err(CoreError::InvalidCredentials);
        }

        let minted = self.mint(&user).await?;
        let pair = store_minted(&mut conn, minted).await?;
        tracing::info!(user_id = %user.id, role = %user.role, "user logged in");
        Ok((user, pair))
    }

    /// Issues an access token and a persisted refresh token for `user`.
    pub async fn issue_token_pair(&self, user: &User) -> CoreResult<TokenPair> {
        let minted = self.mint(user).await?;
        let mut conn = self.db.pool().acquire().await?;
        store_minted(&mut conn, minted).await
    }

    /// Exchanges a refresh token for a new pair, consuming the presented one.
    ///
    /// Every failure (bad signature, expiry, unknown or already-used record, hash mismatch,
    /// deleted user) is reported as `InvalidOrExpiredRefreshToken`. Of several concurrent
    /// refreshes with the same token, at most one succeeds.
    pub async fn refresh(&self, presented: &str) -> CoreResult<(User, TokenPair)> {
        let checked = self.check_refresh(presented).await?;
        let minted = self.mint(&checked.user).await?;
        let pair = self.rotate(&checked, minted).await?;

        tracing::info!(user_id = %checked.user.id, "refresh token rotated");
        Ok((checked.user, pair))
    }

    /// Validates `presented` against its record without claiming it.
    async fn check_refresh(&self, presented: &str) -> CoreResult<CheckedRefresh> {
        let Some(claims) = self.decode_refresh(presented) else {
            return Err(CoreError::InvalidOrExpiredRefreshToken);
        };

        let mut conn = self.db.pool().acquire().await?;
        let record = sqlx::query_as::<_, RefreshTokenRecord>(
            "SELECT id, user_id, token_hash, expires_at, created_at
             FROM refresh_tokens WHERE id = ?",
        )
        .bind(claims.tid)
        .fetch_optional(&mut *conn)
        .await?;

        let record = match record {
            Some(record) if record.user_id == claims.sub && !record.is_expired(Utc::now()) => {
                record
            }
            _ => {
                tracing::warn!(user_id = %claims.sub, "refresh rejected: no live token record");
                return Err(CoreError::InvalidOrExpiredRefreshToken);
            }
        };

        if !verify_token(presented, &record.token_hash).await? {
            tracing::warn!(user_id = %claims.sub, "refresh rejected: hash mismatch");
            return Err(CoreError::InvalidOrExpiredRefreshToken);
        }

        let Some(user) = find_by_id(&mut conn, record.user_id).await? else {
            return Err(CoreError::InvalidOrExpiredRefreshToken);
        };

        Ok(CheckedRefresh {
            record_id: record.id,
            user,
        })
    }

    /// Consumes the checked record and stores its replacement. Only one rotation of a record
    /// can delete it; the others fail.
    async fn rotate(&self, checked: &CheckedRefresh, minted: MintedPair) -> CoreResult<TokenPair> {
        let mut tx = self.db.begin().await?;

        let consumed = sqlx::query(
            "DELETE FROM refresh_tokens WHERE id = ? AND user_id = ? AND expires_at > ?",
        )
        .bind(checked.record_id)
        .bind(checked.user.id)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?
        .rows_affected();
        if consumed != 1 {
            tracing::warn!(user_id = %checked.user.id, "refresh rejected: token already used");
            return Err(CoreError::InvalidOrExpiredRefreshToken);
        }

        let pair = store_minted(&mut tx, minted).await?;
        tx.commit().await?;
        Ok(pair)
    }

    /// Deletes the record behind `presented`, if any. Never fails on a bad token.
    pub async fn logout(&self, presented: Option<&str>) -> CoreResult<()> {
        let Some(claims) = presented.and_then(|token| self.decode_refresh(token)) else {
            return Ok(());
        };

        let deleted = sqlx::query("DELETE FROM refresh_tokens WHERE id = ? AND user_id = ?")
            .bind(claims.tid)
            .bind(claims.sub)
            .execute(self.db.pool())
            .await?
            .rows_affected();

        tracing::info!(user_id = %claims.sub, revoked = deleted, "user logged out");
        Ok(())
    }

    /// Verifies an access token's signature and expiry.
    pub fn verify_access_token(&self, token: &str) -> CoreResult<AccessClaims> {
        decode::<AccessClaims>(
            token,
            &DecodingKey::from_secret(self.cfg.jwt().access_secret()),
            &strict_validation(),
        )
        .map(|data| data.claims)
        .map_err(|err| match err.kind() {
            ErrorKind::ExpiredSignature => CoreError::AccessTokenExpired,
            _ => CoreError::InvalidAccessToken,
        })
    }

    /// Removes refresh records that can no longer be used.
    pub async fn purge_expired(&self) -> CoreResult<u64> {
        let purged = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at <= ?")
            .bind(Utc::now())
            .execute(self.db.pool())
            .await?
            .rows_affected();
        Ok(purged)
    }

    fn decode_refresh(&self, token: &str) -> Option<RefreshClaims> {
        decode::<RefreshClaims>(
            token,
            &DecodingKey::from_secret(self.cfg.jwt().refresh_secret()),
            &strict_validation(),
        )
        .map(|data| data.claims)
        .ok()
    }

    /// Signs a new pair for `user` and hashes its refresh token. Touches no table.
    async fn mint(&self, user: &User) -> CoreResult<MintedPair> {
        let jwt = self.cfg.jwt();
        let now = Utc::now();
        let access_expires_at = now + jwt.access_ttl();
        let refresh_expires_at = now + jwt.refresh_ttl();

        let access_token = encode(
            &Header::default(),
            &AccessClaims {
                sub: user.id,
                email: user.email.clone(),
                role: user.role,
                iat: now.timestamp(),
                exp: access_expires_at.timestamp(),
            },
            &EncodingKey::from_secret(jwt.access_secret()),
        )
        .map_err(CoreError::TokenSigning)?;

        let token_id = Uuid::new_v4();
        let refresh_token = encode(
            &Header::default(),
            &RefreshClaims {
                sub: user.id,
                tid: token_id,
                iat: now.timestamp(),
                exp: refresh_expires_at.timestamp(),
            },
            &EncodingKey::from_secret(jwt.refresh_secret()),
        )
        .map_err(CoreError::TokenSigning)?;

        let token_hash = hash_token(&refresh_token, self.cfg.bcrypt_cost()).await?;
        Ok(MintedPair {
            pair: TokenPair {
                access_token,
                refresh_token,
                access_expires_at,
                refresh_expires_at,
            },
            token_id,
            user_id: user.id,
            token_hash,
            issued_at: now,
        })
    }
}

async fn store_minted(conn: &mut SqliteConnection, minted: MintedPair) -> CoreResult<TokenPair> {
    sqlx::query(
        "INSERT INTO refresh_tokens (id, user_id, token_hash, expires_at, created_at)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(minted.token_id)
    .bind(minted.user_id)
    .bind(&minted.token_hash)
    .bind(minted.pair.refresh_expires_at)
    .bind(minted.issued_at)
    .execute(&mut *conn)
    .await?;
    Ok(minted.pair)
}

/// HS256 with `exp` enforced to the second.
fn strict_validation() -> Validation {
    let mut validation = Validation::default();
    validation.leeway = 0;
    validation
}
