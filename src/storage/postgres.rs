/// Postgres-backed storage
///
/// Thin adapter from the storage traits onto the sqlx operations in
/// [`crate::models`]. The compare-and-swap in `consume_token` is a single
/// conditional `UPDATE ... WHERE revoked_at IS NULL AND expires_at > $now`
/// checked through its returned row, so no read-then-write race exists at
/// this layer.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::token::{AuthToken, NewAuthToken, TokenKind};
use crate::models::user::{CreateUser, User};
use crate::storage::{StorageError, TokenRepository, UserDirectory};

/// Production storage over a PostgreSQL connection pool
#[derive(Debug, Clone)]
pub struct PgStorage {
    pool: PgPool,
}

impl PgStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// The underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl TokenRepository for PgStorage {
    async fn insert_token(&self, data: NewAuthToken) -> Result<AuthToken, StorageError> {
        Ok(AuthToken::create(&self.pool, data).await?)
    }

    async fn find_token(
        &self,
        kind: TokenKind,
        user_id: i64,
        secret_hash: &str,
    ) -> Result<Option<AuthToken>, StorageError> {
        Ok(AuthToken::find(&self.pool, kind, user_id, secret_hash).await?)
    }

    async fn consume_token(
        &self,
        kind: TokenKind,
        user_id: i64,
        secret_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthToken>, StorageError> {
        Ok(AuthToken::consume(&self.pool, kind, user_id, secret_hash, now).await?)
    }

    async fn revoke_token(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, StorageError> {
        Ok(AuthToken::revoke(&self.pool, id, now).await?)
    }

    async fn revoke_all_tokens(
        &self,
        user_id: i64,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        Ok(AuthToken::revoke_all(&self.pool, user_id, kind, now).await?)
    }
}

#[async_trait]
impl UserDirectory for PgStorage {
    async fn insert_user(
        &self,
        data: CreateUser,
        now: DateTime<Utc>,
    ) -> Result<User, StorageError> {
        Ok(User::create(&self.pool, data, now).await?)
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, StorageError> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        Ok(User::find_by_email(&self.pool, email).await?)
    }

    async fn role_names(&self, user_id: i64) -> Result<Vec<String>, StorageError> {
        Ok(User::role_names(&self.pool, user_id).await?)
    }

    async fn assign_role(&self, user_id: i64, role_name: &str) -> Result<(), StorageError> {
        Ok(User::assign_role(&self.pool, user_id, role_name).await?)
    }

    async fn set_password_hash(
        &self,
        user_id: i64,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        User::set_password_hash(&self.pool, user_id, password_hash, now).await?;
        Ok(())
    }

    async fn mark_email_verified(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        User::mark_email_verified(&self.pool, user_id, now).await?;
        Ok(())
    }
}
