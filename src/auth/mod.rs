//! Magic-link authentication.
//!
//! Issues single-use, time-limited login tokens bound to an email
//! address and verifies them against the user table. Issuing a new
//! token supersedes any still-unused token for the same email, so at
//! most one valid token exists per address at any time.

pub mod cleanup;

use chrono::{Duration, Utc};
use rand::Rng;

use crate::db::{DbPool, MagicLink, User, UserResponse};

/// Generate a random token: 32 bytes of CSPRNG output, hex-encoded
pub(crate) fn generate_token() -> String {
    let mut rng = rand::rng();
    let bytes: [u8; 32] = rng.random();
    hex::encode(bytes)
}

/// Tokens are exactly 64 lowercase-hex characters. Anything else is
/// treated as not found rather than an error.
fn is_well_formed(token: &str) -> bool {
    token.len() == 64
        && token
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

#[derive(Clone)]
pub struct MagicLinkService {
    db: DbPool,
    ttl_hours: i64,
}

impl MagicLinkService {
    pub fn new(db: DbPool, ttl_hours: i64) -> Self {
        Self { db, ttl_hours }
    }

    /// Issue a fresh login token for an email address.
    ///
    /// No existence check is made against the user table; tokens for
    /// unknown addresses are issued normally and simply fail to resolve
    /// a user at verification. Superseding the previous unused tokens
    /// and inserting the new one happen in one transaction.
    pub async fn issue(&self, email: &str) -> Result<String, sqlx::Error> {
        let email = email.trim().to_lowercase();
        let token = generate_token();
        let now = Utc::now();
        let expires_at = (now + Duration::hours(self.ttl_hours)).to_rfc3339();

        let mut tx = self.db.begin().await?;

        let superseded = sqlx::query("UPDATE magic_links SET used = 1 WHERE email = ? AND used = 0")
            .bind(&email)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO magic_links (id, email, token, expires_at, used, created_at) \
             VALUES (?, ?, ?, ?, 0, ?)",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(&email)
        .bind(&token)
        .bind(&expires_at)
        .bind(now.to_rfc3339())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            email = %email,
            superseded = superseded.rows_affected(),
            "Issued magic link"
        );

        Ok(token)
    }

    /// Verify a token and resolve the user it belongs to.
    ///
    /// Returns `None` for unknown, used, expired, or malformed tokens,
    /// and for valid tokens whose email matches no account. A valid
    /// token is marked used before the user lookup, so a token for a
    /// since-deleted account is still consumed and cannot be retried.
    pub async fn verify(&self, token: &str) -> Result<Option<UserResponse>, sqlx::Error> {
        if !is_well_formed(token) {
            return Ok(None);
        }

        // Conditional update is the single-use gate: zero rows affected
        // means the token was never issued, already used, or expired.
        let now = Utc::now().to_rfc3339();
        let claimed =
            sqlx::query("UPDATE magic_links SET used = 1 WHERE token = ? AND used = 0 AND expires_at > ?")
                .bind(token)
                .bind(&now)
                .execute(&self.db)
                .await?;

        if claimed.rows_affected() == 0 {
            return Ok(None);
        }

        let link: MagicLink = sqlx::query_as("SELECT * FROM magic_links WHERE token = ?")
            .bind(token)
            .fetch_one(&self.db)
            .await?;

        let user: Option<User> = sqlx::query_as("SELECT * FROM users WHERE email = ?")
            .bind(&link.email)
            .fetch_optional(&self.db)
            .await?;

        match user {
            Some(user) => {
                tracing::info!(email = %link.email, "Magic link verified");
                Ok(Some(UserResponse::from(user)))
            }
            None => {
                tracing::warn!(email = %link.email, "Magic link consumed for unknown account");
                Ok(None)
            }
        }
    }

    /// Delete all tokens past their expiry, used or not. Safe to run
    /// concurrently with issue/verify.
    pub async fn cleanup_expired(&self) -> Result<u64, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query("DELETE FROM magic_links WHERE expires_at < ?")
            .bind(&now)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    async fn insert_user(pool: &DbPool, email: &str) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO users (id, email, first_name, last_name, role, is_active, created_at, updated_at) \
             VALUES (?, ?, 'Test', 'User', 'user', 1, ?, ?)",
        )
        .bind(&id)
        .bind(email)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await
        .unwrap();
        id
    }

    #[test]
    fn test_token_shape() {
        let token = generate_token();
        assert_eq!(token.len(), 64);
        assert!(token
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')));
    }

    #[test]
    fn test_well_formed_rejects_garbage() {
        assert!(!is_well_formed(""));
        assert!(!is_well_formed("abc"));
        assert!(!is_well_formed(&"g".repeat(64)));
        assert!(!is_well_formed(&"A".repeat(64)));
        assert!(is_well_formed(&"a1".repeat(32)));
    }

    #[tokio::test]
    async fn test_token_never_contains_email() {
        let pool = db::test_pool().await;
        let service = MagicLinkService::new(pool, 24);
        let token = service.issue("abcdef@example.com").await.unwrap();
        assert_eq!(token.len(), 64);
        assert!(!token.contains("abcdef"));
    }

    #[tokio::test]
    async fn test_verify_resolves_user_once() {
        let pool = db::test_pool().await;
        let user_id = insert_user(&pool, "jane@example.com").await;
        let service = MagicLinkService::new(pool, 24);

        let token = service.issue("jane@example.com").await.unwrap();

        let user = service.verify(&token).await.unwrap().unwrap();
        assert_eq!(user.id, user_id);
        assert_eq!(user.email, "jane@example.com");

        // Single use: every subsequent verification fails
        assert!(service.verify(&token).await.unwrap().is_none());
        assert!(service.verify(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_issue_supersedes_previous_token() {
        let pool = db::test_pool().await;
        insert_user(&pool, "jane@example.com").await;
        let service = MagicLinkService::new(pool, 24);

        let first = service.issue("jane@example.com").await.unwrap();
        let second = service.issue("jane@example.com").await.unwrap();
        assert_ne!(first, second);

        assert!(service.verify(&first).await.unwrap().is_none());
        assert!(service.verify(&second).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_verify_unknown_token() {
        let pool = db::test_pool().await;
        let service = MagicLinkService::new(pool, 24);

        // Well-formed but never issued
        let phantom = "ab".repeat(32);
        assert!(service.verify(&phantom).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_verify_expired_token() {
        let pool = db::test_pool().await;
        insert_user(&pool, "jane@example.com").await;
        let service = MagicLinkService::new(pool.clone(), 24);

        let token = service.issue("jane@example.com").await.unwrap();

        // Backdate the expiry
        let past = (Utc::now() - Duration::hours(1)).to_rfc3339();
        sqlx::query("UPDATE magic_links SET expires_at = ? WHERE token = ?")
            .bind(&past)
            .bind(&token)
            .execute(&pool)
            .await
            .unwrap();

        let link: MagicLink = sqlx::query_as("SELECT * FROM magic_links WHERE token = ?")
            .bind(&token)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(link.is_expired());

        assert!(service.verify(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_verify_no_matching_user_still_consumes() {
        let pool = db::test_pool().await;
        let service = MagicLinkService::new(pool.clone(), 24);

        let token = service.issue("ghost@example.com").await.unwrap();
        assert!(service.verify(&token).await.unwrap().is_none());

        // The token was burned even though no user matched
        let link: MagicLink = sqlx::query_as("SELECT * FROM magic_links WHERE token = ?")
            .bind(&token)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(link.used);

        // Creating the user afterwards does not revive the token
        insert_user(&pool, "ghost@example.com").await;
        assert!(service.verify(&token).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_verify_malformed_tokens() {
        let pool = db::test_pool().await;
        let service = MagicLinkService::new(pool, 24);

        assert!(service.verify("").await.unwrap().is_none());
        assert!(service.verify("short").await.unwrap().is_none());
        assert!(service.verify(&"Z".repeat(64)).await.unwrap().is_none());
        assert!(service
            .verify("'; DROP TABLE magic_links; --")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_cleanup_deletes_expired_regardless_of_used() {
        let pool = db::test_pool().await;
        let service = MagicLinkService::new(pool.clone(), 24);

        let expired_unused = service.issue("a@example.com").await.unwrap();
        let expired_used = service.issue("b@example.com").await.unwrap();
        let live = service.issue("c@example.com").await.unwrap();

        let past = (Utc::now() - Duration::hours(1)).to_rfc3339();
        for token in [&expired_unused, &expired_used] {
            sqlx::query("UPDATE magic_links SET expires_at = ? WHERE token = ?")
                .bind(&past)
                .bind(token)
                .execute(&pool)
                .await
                .unwrap();
        }
        sqlx::query("UPDATE magic_links SET used = 1 WHERE token = ?")
            .bind(&expired_used)
            .execute(&pool)
            .await
            .unwrap();

        let deleted = service.cleanup_expired().await.unwrap();
        assert_eq!(deleted, 2);

        // Idempotent: a second sweep finds nothing
        assert_eq!(service.cleanup_expired().await.unwrap(), 0);

        let remaining: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM magic_links")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(remaining.0, 1);

        let link: MagicLink = sqlx::query_as("SELECT * FROM magic_links WHERE token = ?")
            .bind(&live)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert!(!link.used);
    }
}
