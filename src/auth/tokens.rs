/// Opaque token store
///
/// Generates, persists (as hash), verifies, and invalidates the opaque
/// tokens behind refresh rotation, email verification, and password
/// reset. All three kinds share one table and one lifecycle:
///
/// ```text
/// issue -> Active --verify + revoke--> Revoked   (terminal)
///                 \--expiry (lazy)---> Expired   (terminal)
/// ```
///
/// Expired is never written to storage; the usability predicate detects
/// it at verification time.
///
/// # Security
///
/// - **Secrets**: 32 bytes of cryptographic randomness, base64 URL-safe
///   without padding (43 characters)
/// - **Storage**: SHA-256 hex of the secret; the plain secret is returned
///   exactly once at issue time and never persisted
/// - **Scoping**: every lookup is by (kind, owner, hash), so kinds and
///   owners never collide
/// - **Replay**: [`TokenStore::consume`] pairs verification with
///   revocation atomically, so a secret can win at most once
///
/// Callers cannot distinguish a missing token from an expired or revoked
/// one; the internal reason is only visible in debug logs.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Duration;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::debug;

use crate::clock::Clock;
use crate::models::token::{AuthToken, NewAuthToken, TokenKind};
use crate::storage::{StorageError, TokenRepository};

/// Entropy of a token secret in bytes
const SECRET_BYTES: usize = 32;

/// Generates an opaque token secret
///
/// 32 bytes from the thread-local CSPRNG, base64 URL-safe without
/// padding. Safe to embed in a URL query parameter as-is.
///
/// # Example
///
/// ```
/// use tokensmith::auth::tokens::generate_secret;
///
/// let secret = generate_secret();
/// assert_eq!(secret.len(), 43);
/// assert!(!secret.contains('='));
/// ```
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hashes a token secret for storage
///
/// Deterministic SHA-256, hex encoded (64 characters). Unlike password
/// hashing this is unsalted on purpose: the input already carries 256
/// bits of entropy, and the hash must be recomputable for lookup.
///
/// # Example
///
/// ```
/// use tokensmith::auth::tokens::hash_secret;
///
/// let hash = hash_secret("some-secret");
/// assert_eq!(hash.len(), 64);
/// assert_eq!(hash, hash_secret("some-secret"));
/// ```
pub fn hash_secret(secret: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(secret.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Store for single-use and rotating opaque tokens
#[derive(Clone)]
pub struct TokenStore {
    repo: Arc<dyn TokenRepository>,
    clock: Arc<dyn Clock>,
}

impl TokenStore {
    pub fn new(repo: Arc<dyn TokenRepository>, clock: Arc<dyn Clock>) -> Self {
        Self { repo, clock }
    }

    /// Issues a new token and returns the plain secret
    ///
    /// This is the only moment the secret is ever disclosed; storage
    /// keeps just its hash. Issuing has no side effect beyond the new
    /// row, so a retried issue after a caller timeout merely leaves an
    /// extra unused token behind.
    pub async fn issue(
        &self,
        kind: TokenKind,
        user_id: i64,
        ttl: Duration,
        meta: serde_json::Value,
    ) -> Result<String, StorageError> {
        let secret = generate_secret();
        let now = self.clock.now();

        self.repo
            .insert_token(NewAuthToken {
                user_id,
                kind,
                secret_hash: hash_secret(&secret),
                meta,
                expires_at: now + ttl,
                created_at: now,
            })
            .await?;

        debug!(kind = kind.as_str(), user_id, "Issued token");
        Ok(secret)
    }

    /// Verifies a presented secret without consuming it
    ///
    /// Returns `None` uniformly whether the token is missing, expired, or
    /// revoked; the distinction is logged at debug level only.
    pub async fn verify(
        &self,
        kind: TokenKind,
        user_id: i64,
        secret: &str,
    ) -> Result<Option<AuthToken>, StorageError> {
        let hash = hash_secret(secret);

        let token = match self.repo.find_token(kind, user_id, &hash).await? {
            Some(token) => token,
            None => {
                debug!(kind = kind.as_str(), user_id, "Token rejected: not found");
                return Ok(None);
            }
        };

        if token.revoked_at.is_some() {
            debug!(kind = kind.as_str(), user_id, "Token rejected: revoked");
            return Ok(None);
        }

        if self.clock.now() >= token.expires_at {
            debug!(kind = kind.as_str(), user_id, "Token rejected: expired");
            return Ok(None);
        }

        Ok(Some(token))
    }

    /// Verifies and revokes in one atomic step
    ///
    /// This is the operation behind every single-use flow. Of two
    /// concurrent callers presenting the same valid secret, exactly one
    /// receives the token; the loser sees `None`, indistinguishable from
    /// an already-revoked token.
    pub async fn consume(
        &self,
        kind: TokenKind,
        user_id: i64,
        secret: &str,
    ) -> Result<Option<AuthToken>, StorageError> {
        let hash = hash_secret(secret);
        let consumed = self
            .repo
            .consume_token(kind, user_id, &hash, self.clock.now())
            .await?;

        match &consumed {
            Some(_) => debug!(kind = kind.as_str(), user_id, "Token consumed"),
            None => debug!(kind = kind.as_str(), user_id, "Token rejected: not usable"),
        }

        Ok(consumed)
    }

    /// Idempotently revokes a token
    ///
    /// Safe to call twice; returns whether this call performed the
    /// transition.
    pub async fn revoke(&self, token: &AuthToken) -> Result<bool, StorageError> {
        self.repo.revoke_token(token.id, self.clock.now()).await
    }

    /// Revokes every live token of the owner and kind
    ///
    /// "Logout everywhere" for `refresh` tokens. Returns the number of
    /// tokens revoked by this call.
    pub async fn revoke_all(&self, user_id: i64, kind: TokenKind) -> Result<u64, StorageError> {
        let count = self
            .repo
            .revoke_all_tokens(user_id, kind, self.clock.now())
            .await?;
        debug!(kind = kind.as_str(), user_id, count, "Revoked all tokens");
        Ok(count)
    }
}
