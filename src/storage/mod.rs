/// Persistence boundary for the token and user stores
///
/// The services in [`crate::auth`] reach storage exclusively through the
/// [`TokenRepository`] and [`UserDirectory`] traits. Two backends ship
/// with the crate:
///
/// - [`postgres::PgStorage`]: production backend over sqlx/Postgres
/// - [`memory::MemoryStorage`]: mutex-guarded in-memory backend used by
///   the test suite and suitable for single-process embedding
///
/// Both honor the same compare-and-swap contract: `consume_token` observes
/// a usable token and revokes it in one atomic step, so two concurrent
/// callers presenting the same secret cannot both win. A read-then-write
/// revoke is not an acceptable implementation of this trait.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::token::{AuthToken, NewAuthToken, TokenKind};
use crate::models::user::{CreateUser, User};

/// Error type for storage operations
///
/// Storage unavailability is the only failure modeled here. It is
/// surfaced upward unmodified rather than folded into authentication
/// outcomes; a caller that cannot reach the database must not report
/// "invalid credentials".
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Underlying database error
    #[error("Storage unavailable: {0}")]
    Database(#[from] sqlx::Error),
}

/// Persistence operations for opaque auth tokens
#[async_trait]
pub trait TokenRepository: Send + Sync {
    /// Persists a freshly issued token row
    async fn insert_token(&self, data: NewAuthToken) -> Result<AuthToken, StorageError>;

    /// Looks up a token by its scoping triple
    ///
    /// Returns the row regardless of usability; the caller applies the
    /// usability predicate so it can log the rejection reason.
    async fn find_token(
        &self,
        kind: TokenKind,
        user_id: i64,
        secret_hash: &str,
    ) -> Result<Option<AuthToken>, StorageError>;

    /// Atomically revokes a token that is usable at `now`, returning it
    ///
    /// Exactly one of any number of concurrent callers can win; the
    /// others receive `None`.
    async fn consume_token(
        &self,
        kind: TokenKind,
        user_id: i64,
        secret_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthToken>, StorageError>;

    /// Idempotently revokes a token by ID
    ///
    /// Returns whether this call performed the transition.
    async fn revoke_token(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, StorageError>;

    /// Revokes every live token of the owner and kind, returning the count
    async fn revoke_all_tokens(
        &self,
        user_id: i64,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<u64, StorageError>;
}

/// The narrow slice of the user subsystem the core needs
///
/// Lookup, credential overwrite, verification stamping, and role listing.
/// Full account CRUD is someone else's interface.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Persists a new user
    async fn insert_user(&self, data: CreateUser, now: DateTime<Utc>)
        -> Result<User, StorageError>;

    /// Finds a live user by ID
    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, StorageError>;

    /// Finds a live user by email, case-insensitively
    ///
    /// Soft-deleted users are never returned.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError>;

    /// Lists the user's role names
    async fn role_names(&self, user_id: i64) -> Result<Vec<String>, StorageError>;

    /// Grants a role to the user by role name
    async fn assign_role(&self, user_id: i64, role_name: &str) -> Result<(), StorageError>;

    /// Overwrites the user's password hash
    async fn set_password_hash(
        &self,
        user_id: i64,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Stamps the user's email as verified
    async fn mark_email_verified(&self, user_id: i64, now: DateTime<Utc>)
        -> Result<(), StorageError>;
}
