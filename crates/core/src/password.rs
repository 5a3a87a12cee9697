//! Secret hashing.
//!
//! bcrypt is CPU-bound, so hashing and verification run on the blocking pool.

use crate::CoreResult;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use sha2::{Digest, Sha256};

/// Hashes a password with bcrypt at `cost`.
pub async fn hash_password(password: &str, cost: u32) -> CoreResult<String> {
    let password = password.to_owned();
    let hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost)).await??;
    Ok(hash)
}

/// Checks a password against a stored bcrypt hash.
pub async fn verify_password(password: &str, hash: &str) -> CoreResult<bool> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    let ok = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash)).await??;
    Ok(ok)
}

/// bcrypt only reads the first 72 bytes of its input and signed tokens are longer than that,
/// so tokens are reduced to a SHA-256 digest before hashing.
fn token_digest(token: &str) -> String {
    STANDARD.encode(Sha256::digest(token.as_bytes()))
}

/// Hashes a refresh token for storage.
pub async fn hash_token(token: &str, cost: u32) -> CoreResult<String> {
    hash_password(&token_digest(token), cost).await
}

/// Checks a refresh token against its stored hash.
pub async fn verify_token(token: &str, hash: &str) -> CoreResult<bool> {
    verify_password(&token_digest(token), hash).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_password_round_trip() {
        let hash = hash_password("secret1", 4).await.unwrap();
        assert_ne!(hash, "secret1");
        assert!(verify_password("secret1", &hash).await.unwrap());
        assert!(!verify_password("secret2", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn test_tokens_differing_after_72_bytes_do_not_collide() {
        let prefix = "a".repeat(100);
        let first = format!("{prefix}first");
        let second = format!("{prefix}second");

        let hash = hash_token(&first, 4).await.unwrap();
        assert!(verify_token(&first, &hash).await.unwrap());
        assert!(!verify_token(&second, &hash).await.unwrap());
    }
}
