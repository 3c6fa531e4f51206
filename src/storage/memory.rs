/// In-memory storage backend
///
/// Keeps tokens and users behind a single mutex, which makes the
/// verify-then-revoke check-and-set exactly as atomic as the conditional
/// update in the Postgres backend. The test suite runs against this
/// backend; it also works for demos and single-process embedding.
///
/// Email uniqueness is a schema concern and is not enforced here.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

use crate::models::token::{AuthToken, NewAuthToken, TokenKind};
use crate::models::user::{CreateUser, User};
use crate::storage::{StorageError, TokenRepository, UserDirectory};

#[derive(Debug, Default)]
struct Inner {
    tokens: Vec<AuthToken>,
    users: Vec<User>,
    user_roles: HashMap<i64, Vec<String>>,
    next_user_id: i64,
}

/// Mutex-guarded storage with no external dependencies
#[derive(Debug, Default)]
pub struct MemoryStorage {
    inner: Mutex<Inner>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a user soft-deleted, hiding it from all lookups
    ///
    /// User deletion is owned by the surrounding user-management
    /// subsystem; this hook exists so embedders and tests can exercise
    /// the deleted-user path.
    pub fn soft_delete_user(&self, id: i64, now: DateTime<Utc>) {
        let mut inner = self.inner.lock().unwrap();
        if let Some(user) = inner.users.iter_mut().find(|u| u.id == id) {
            user.deleted_at = Some(now);
            user.updated_at = now;
        }
    }
}

#[async_trait]
impl TokenRepository for MemoryStorage {
    async fn insert_token(&self, data: NewAuthToken) -> Result<AuthToken, StorageError> {
        let token = AuthToken {
            id: Uuid::new_v4(),
            user_id: data.user_id,
            kind: data.kind,
            secret_hash: data.secret_hash,
            meta: data.meta,
            expires_at: data.expires_at,
            revoked_at: None,
            created_at: data.created_at,
        };

        let mut inner = self.inner.lock().unwrap();
        inner.tokens.push(token.clone());
        Ok(token)
    }

    async fn find_token(
        &self,
        kind: TokenKind,
        user_id: i64,
        secret_hash: &str,
    ) -> Result<Option<AuthToken>, StorageError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .tokens
            .iter()
            .find(|t| t.kind == kind && t.user_id == user_id && t.secret_hash == secret_hash)
            .cloned())
    }

    async fn consume_token(
        &self,
        kind: TokenKind,
        user_id: i64,
        secret_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<AuthToken>, StorageError> {
        // Check and revoke under one lock; this is the whole CAS
        let mut inner = self.inner.lock().unwrap();
        let token = inner.tokens.iter_mut().find(|t| {
            t.kind == kind
                && t.user_id == user_id
                && t.secret_hash == secret_hash
                && t.is_usable(now)
        });

        match token {
            Some(token) => {
                token.revoked_at = Some(now);
                Ok(Some(token.clone()))
            }
            None => Ok(None),
        }
    }

    async fn revoke_token(&self, id: Uuid, now: DateTime<Utc>) -> Result<bool, StorageError> {
        let mut inner = self.inner.lock().unwrap();
        match inner.tokens.iter_mut().find(|t| t.id == id) {
            Some(token) if token.revoked_at.is_none() => {
                token.revoked_at = Some(now);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revoke_all_tokens(
        &self,
        user_id: i64,
        kind: TokenKind,
        now: DateTime<Utc>,
    ) -> Result<u64, StorageError> {
        let mut inner = self.inner.lock().unwrap();
        let mut count = 0;
        for token in inner
            .tokens
            .iter_mut()
            .filter(|t| t.user_id == user_id && t.kind == kind && t.revoked_at.is_none())
        {
            token.revoked_at = Some(now);
            count += 1;
        }
        Ok(count)
    }
}

#[async_trait]
impl UserDirectory for MemoryStorage {
    async fn insert_user(
        &self,
        data: CreateUser,
        now: DateTime<Utc>,
    ) -> Result<User, StorageError> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_user_id += 1;
        let user = User {
            id: inner.next_user_id,
            name: data.name,
            email: data.email,
            password_hash: data.password_hash,
            email_verified_at: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        inner.users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: i64) -> Result<Option<User>, StorageError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .iter()
            .find(|u| u.id == id && u.deleted_at.is_none())
            .cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .users
            .iter()
            .find(|u| u.deleted_at.is_none() && u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn role_names(&self, user_id: i64) -> Result<Vec<String>, StorageError> {
        let inner = self.inner.lock().unwrap();
        let mut names = inner.user_roles.get(&user_id).cloned().unwrap_or_default();
        names.sort();
        Ok(names)
    }

    async fn assign_role(&self, user_id: i64, role_name: &str) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap();
        let roles = inner.user_roles.entry(user_id).or_default();
        if !roles.iter().any(|r| r == role_name) {
            roles.push(role_name.to_string());
        }
        Ok(())
    }

    async fn set_password_hash(
        &self,
        user_id: i64,
        password_hash: &str,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(user) = inner
            .users
            .iter_mut()
            .find(|u| u.id == user_id && u.deleted_at.is_none())
        {
            user.password_hash = password_hash.to_string();
            user.updated_at = now;
        }
        Ok(())
    }

    async fn mark_email_verified(
        &self,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(user) = inner
            .users
            .iter_mut()
            .find(|u| u.id == user_id && u.deleted_at.is_none())
        {
            user.email_verified_at = Some(now);
            user.updated_at = now;
        }
        Ok(())
    }
}
