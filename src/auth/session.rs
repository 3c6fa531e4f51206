/// Session and credential service
///
/// Orchestrates registration, password login, refresh rotation, and
/// logout on top of the token store and the access token issuer.
///
/// # Refresh rotation
///
/// Every successful refresh burns the presented secret and issues a brand
/// new pair; a replayed secret fails, even when replayed by the
/// legitimate holder. The revocation step is atomic, so two concurrent
/// refreshes with one secret produce exactly one new pair; the loser gets
/// the same uniform rejection as any invalid token.
///
/// # Uniform login failure
///
/// An unknown email, a soft-deleted account, and a wrong password all
/// come back as `Ok(None)` from [`SessionService::attempt`], so the login
/// endpoint cannot be used to enumerate addresses.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::auth::jwt::{AccessClaims, AccessTokenIssuer};
use crate::auth::password::{hash_password, verify_password};
use crate::auth::tokens::TokenStore;
use crate::auth::AuthError;
use crate::clock::Clock;
use crate::models::token::TokenKind;
use crate::models::user::{CreateUser, User};
use crate::storage::UserDirectory;

/// Role granted to every new account
const DEFAULT_ROLE: &str = "user";

/// Access/refresh pair handed to a client on login or refresh
#[derive(Debug, Clone, Serialize)]
pub struct CredentialPair {
    /// Signed short-lived access token
    pub access_token: String,

    /// Expiry instant of the access token
    pub access_expires_at: DateTime<Utc>,

    /// Opaque rotating refresh secret
    ///
    /// Disclosed exactly once; storage keeps only its hash
    pub refresh_token: String,
}

/// Orchestrates password login and the refresh token lifecycle
#[derive(Clone)]
pub struct SessionService {
    directory: Arc<dyn UserDirectory>,
    tokens: TokenStore,
    issuer: AccessTokenIssuer,
    clock: Arc<dyn Clock>,
    refresh_ttl: Duration,
    password_cost: u32,
}

impl SessionService {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        tokens: TokenStore,
        issuer: AccessTokenIssuer,
        clock: Arc<dyn Clock>,
        refresh_ttl_days: i64,
        password_cost: u32,
    ) -> Self {
        Self {
            directory,
            tokens,
            issuer,
            clock,
            refresh_ttl: Duration::days(refresh_ttl_days),
            password_cost,
        }
    }

    /// Registers a new account
    ///
    /// Hashes the password with Argon2id, persists the user, and grants
    /// the default role. Issues no tokens; callers log in separately.
    pub async fn register(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let password_hash = hash_password(password, self.password_cost)?;

        let user = self
            .directory
            .insert_user(
                CreateUser {
                    name: name.to_string(),
                    email: email.to_string(),
                    password_hash,
                },
                self.clock.now(),
            )
            .await?;

        self.directory.assign_role(user.id, DEFAULT_ROLE).await?;

        debug!(user_id = user.id, "Registered user");
        Ok(user)
    }

    /// Attempts a password login
    ///
    /// Returns `Ok(None)` on failure without saying why: an unknown
    /// email and a wrong password are indistinguishable to the caller.
    pub async fn attempt(
        &self,
        email: &str,
        password: &str,
        meta: serde_json::Value,
    ) -> Result<Option<CredentialPair>, AuthError> {
        let user = match self.directory.find_user_by_email(email).await? {
            Some(user) => user,
            None => {
                debug!("Login rejected: unknown email");
                return Ok(None);
            }
        };

        if !verify_password(password, &user.password_hash)? {
            debug!(user_id = user.id, "Login rejected: password mismatch");
            return Ok(None);
        }

        Ok(Some(self.issue_pair(&user, meta).await?))
    }

    /// Issues a fresh access/refresh pair for the user
    ///
    /// The access token embeds the role names current at this moment;
    /// the refresh token carries `meta` for audit (requesting IP, user
    /// agent).
    pub async fn issue_pair(
        &self,
        user: &User,
        meta: serde_json::Value,
    ) -> Result<CredentialPair, AuthError> {
        let roles = self.directory.role_names(user.id).await?;
        let (access_token, access_expires_at) = self.issuer.issue(user, roles)?;
        let refresh_token = self
            .tokens
            .issue(TokenKind::Refresh, user.id, self.refresh_ttl, meta)
            .await?;

        Ok(CredentialPair {
            access_token,
            access_expires_at,
            refresh_token,
        })
    }

    /// Rotates a refresh token
    ///
    /// Consumes the presented secret and issues a brand-new pair; the
    /// old secret fails verification afterwards. Returns `Ok(None)` when
    /// the secret is not usable, including when a concurrent rotation
    /// won the race for it.
    pub async fn refresh(
        &self,
        user: &User,
        refresh_secret: &str,
        meta: serde_json::Value,
    ) -> Result<Option<CredentialPair>, AuthError> {
        match self
            .tokens
            .consume(TokenKind::Refresh, user.id, refresh_secret)
            .await?
        {
            Some(_) => Ok(Some(self.issue_pair(user, meta).await?)),
            None => Ok(None),
        }
    }

    /// Ends one session by revoking its refresh token
    ///
    /// Returns whether a usable token was found and revoked.
    pub async fn logout(&self, user: &User, refresh_secret: &str) -> Result<bool, AuthError> {
        let consumed = self
            .tokens
            .consume(TokenKind::Refresh, user.id, refresh_secret)
            .await?;
        Ok(consumed.is_some())
    }

    /// Ends every session by revoking all live refresh tokens
    ///
    /// Returns the number of sessions revoked.
    pub async fn logout_all(&self, user: &User) -> Result<u64, AuthError> {
        Ok(self.tokens.revoke_all(user.id, TokenKind::Refresh).await?)
    }

    /// Decodes an access token previously issued by this service
    ///
    /// Returns `None` on any verification failure.
    pub fn decode(&self, token: &str) -> Option<AccessClaims> {
        self.issuer.decode(token)
    }
}
