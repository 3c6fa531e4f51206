/// Opaque auth token model and database operations
///
/// One table backs all three token flows: refresh rotation, email
/// verification, and password reset. Rows store a SHA-256 hash of the
/// opaque secret; the plain secret is returned to the caller exactly once
/// at issue time and never persisted.
///
/// # Security
///
/// - **Storage**: SHA-256 hex of the secret, never the secret itself
/// - **Scoping**: lookups always filter by (kind, user_id, secret_hash),
///   so kinds and owners cannot collide
/// - **Replay**: [`AuthToken::consume`] revokes through a conditional
///   update, so concurrent callers presenting the same secret produce
///   exactly one winner
///
/// # Schema
///
/// ```sql
/// CREATE TYPE token_kind AS ENUM ('refresh', 'email_verify', 'password_reset');
///
/// CREATE TABLE auth_tokens (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     user_id BIGINT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     kind token_kind NOT NULL,
///     secret_hash VARCHAR(64) NOT NULL,
///     meta JSONB NOT NULL DEFAULT '{}'::jsonb,
///     expires_at TIMESTAMPTZ NOT NULL,
///     revoked_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Closed set of token purposes
///
/// Not user-supplied; every operation names its kind explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "token_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TokenKind {
    /// Long-lived rotating credential exchanged for a new access/refresh pair
    Refresh,

    /// Single-use email verification token
    EmailVerify,

    /// Single-use password reset token
    PasswordReset,
}

impl TokenKind {
    /// Gets the kind as its wire string
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Refresh => "refresh",
            TokenKind::EmailVerify => "email_verify",
            TokenKind::PasswordReset => "password_reset",
        }
    }
}

/// Stored auth token row
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AuthToken {
    /// Unique token ID
    pub id: Uuid,

    /// Owning user
    pub user_id: i64,

    /// Token purpose
    pub kind: TokenKind,

    /// SHA-256 hex of the opaque secret
    pub secret_hash: String,

    /// Free-form audit metadata (issuing IP, user agent, ...), opaque here
    pub meta: serde_json::Value,

    /// When the token stops being usable
    pub expires_at: DateTime<Utc>,

    /// Revocation instant (None while the token is live)
    pub revoked_at: Option<DateTime<Utc>>,

    /// When the token was issued
    pub created_at: DateTime<Utc>,
}

/// Input for persisting a freshly issued token
#[derive(Debug, Clone)]
pub struct NewAuthToken {
    /// Owning user
    pub user_id: i64,

    /// Token purpose
    pub kind: TokenKind,

    /// SHA-256 hex of the opaque secret
    pub secret_hash: String,

    /// Audit metadata
    pub meta: serde_json::Value,

    /// Expiry instant
    pub expires_at: DateTime<Utc>,

    /// Issue instant
    pub created_at: DateTime<Utc>,
}

impl AuthToken {
    /// A token is usable while it is unrevoked and not past expiry
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        self.revoked_at.is_none() && now < self.expires_at
    }

    /// Persists a freshly issued token
    pub async fn create(pool: &PgPool, data: NewAuthToken) -> Result<Self, sqlx::Error> {
        let token = sqlx::query_as::<_, AuthToken>(
            r#"
            INSERT INTO auth_tokens (user_id, kind, secret_hash, meta, expires_at, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, kind, secret_hash, meta, expires_at, revoked_at, created_at
            "#,
        )
        .bind(data.user_id)
        .bind(data.kind)
        .bind(data.secret_hash)
        .bind(data.meta)
        .bind(data.expires_at)
        .bind(data.created_at)
        .fetch_one(pool)
        .await?;

        Ok(token)
    }

    /// Looks up a token by its scoping triple
    ///
    /// Returns the row regardless of usability; callers apply
    /// [`AuthToken::is_usable`] themselves so they can log the rejection
    /// reason without surfacing it.
    pub async fn find(
        pool: &PgPool,
        kind: TokenKind,
        user_id: i64,
        secret_hash: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let token = sqlx::query_as::<_, AuthToken>(
            r#"
            SELECT id, user_id, kind, secret_hash, meta, expires_at, revoked_at, created_at
            FROM auth_tokens
            WHERE kind = $1 AND user_id = $2 AND secret_hash = $3
            "#,
        )
        .bind(kind)
        .bind(user_id)
        .bind(secret_hash)
        .fetch_optional(pool)
        .await?;

        Ok(token)
    }

    /// Atomically revokes a usable token matching the triple, returning it
    ///
    /// The conditional update is the compare-and-swap guard behind every
    /// verify-then-revoke flow: of any number of concurrent callers holding
    /// the same secret, exactly one gets the row back. The others see
    /// `None`, the same outcome as an already-revoked token.
    pub async fn consume(
        pool: &PgPool,
        kind: TokenKind,
        user_id: i64,
        secret_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let token = sqlx::query_as::<_, AuthToken>(
            r#"
            UPDATE auth_tokens
            SET revoked_at = $4
            WHERE kind = $1 AND user_id = $2 AND secret_hash = $3
              AND revoked_at IS NULL AND expires_at > $4
            RETURNING id, user_id, kind, secret_hash, meta, expires_at, revoked_at, created_at
            "#,
        )
        .bind(kind)
        .bind(user_id)
        .bind(secret_hash)
        .bind(now)
        .fetch_optional(pool)
        .await?;

        Ok(token)
    }

    /// Idempotently marks a token revoked
    ///
    /// Safe to call twice. Returns whether this call performed the
    /// transition; a second call finds `revoked_at` already set and
    /// returns false.
    pub async fn revoke(pool: &PgPool, id: Uuid, now: DateTime<Utc>) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE auth_tokens
            SET revoked_at = $2
            WHERE id = $1 AND revoked_at IS NULL
            "#,
        )
        .bind(id)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Revokes every live token of the given owner and kind
    ///
    /// Returns the number of rows affected. Already-revoked and expired
    /// rows are left untouched.
    pub async fn revoke_all(
        pool: &PgPool,
        user_id: i64,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            r#"
            UPDATE auth_tokens
            SET revoked_at = $3
            WHERE user_id = $1 AND kind = $2 AND revoked_at IS NULL
            "#,
        )
        .bind(user_id)
        .bind(kind)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample_token(now: DateTime<Utc>) -> AuthToken {
        AuthToken {
            id: Uuid::new_v4(),
            user_id: 1,
            kind: TokenKind::Refresh,
            secret_hash: "a".repeat(64),
            meta: serde_json::json!({}),
            expires_at: now + Duration::days(30),
            revoked_at: None,
            created_at: now,
        }
    }

    #[test]
    fn test_kind_as_str() {
        assert_eq!(TokenKind::Refresh.as_str(), "refresh");
        assert_eq!(TokenKind::EmailVerify.as_str(), "email_verify");
        assert_eq!(TokenKind::PasswordReset.as_str(), "password_reset");
    }

    #[test]
    fn test_kind_serde_wire_names() {
        let json = serde_json::to_string(&TokenKind::PasswordReset).unwrap();
        assert_eq!(json, "\"password_reset\"");

        let kind: TokenKind = serde_json::from_str("\"email_verify\"").unwrap();
        assert_eq!(kind, TokenKind::EmailVerify);
    }

    #[test]
    fn test_fresh_token_is_usable() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let token = sample_token(now);
        assert!(token.is_usable(now));
    }

    #[test]
    fn test_expired_token_is_not_usable() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let token = sample_token(now);
        assert!(!token.is_usable(now + Duration::days(31)));
    }

    #[test]
    fn test_token_expiring_now_is_not_usable() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let token = sample_token(now);
        // The predicate is strict: expiry instant itself is already unusable
        assert!(!token.is_usable(token.expires_at));
    }

    #[test]
    fn test_revoked_token_is_not_usable() {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        let mut token = sample_token(now);
        token.revoked_at = Some(now);
        assert!(!token.is_usable(now));
    }

    // Integration tests for the database operations run against the
    // in-memory backend in tests/; the Postgres queries mirror them.
}
