/// Account action flows
///
/// Email verification and password reset ride on the same single-use
/// token machinery. Each flow issues a short-lived token, mails the user
/// an action URL carrying the plain secret, and later consumes the token
/// when the secret comes back.
///
/// Mail delivery failures propagate as [`AuthError::Delivery`]; they
/// indicate an infrastructure problem, not a bad credential, and are
/// never folded into the uniform token rejections.

use chrono::Duration;
use serde_json::json;
use std::sync::Arc;
use tracing::debug;

use crate::auth::password::hash_password;
use crate::auth::tokens::TokenStore;
use crate::auth::AuthError;
use crate::clock::Clock;
use crate::mailer::Mailer;
use crate::models::token::TokenKind;
use crate::models::user::User;
use crate::storage::UserDirectory;

/// Lifetime of verification and reset tokens
const ACTION_TOKEN_TTL_HOURS: i64 = 1;

/// Coordinates email verification and password reset
#[derive(Clone)]
pub struct AccountActions {
    directory: Arc<dyn UserDirectory>,
    tokens: TokenStore,
    mailer: Arc<dyn Mailer>,
    clock: Arc<dyn Clock>,
    app_url: String,
    password_cost: u32,
}

impl AccountActions {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        tokens: TokenStore,
        mailer: Arc<dyn Mailer>,
        clock: Arc<dyn Clock>,
        app_url: impl Into<String>,
        password_cost: u32,
    ) -> Self {
        Self {
            directory,
            tokens,
            mailer,
            clock,
            app_url: app_url.into(),
            password_cost,
        }
    }

    /// Sends an email verification link to the user
    ///
    /// Issues an `email_verify` token and hands the action URL to the
    /// mailer. A mailer failure propagates; the issued token stays in
    /// storage and simply expires unused.
    pub async fn send_verification(&self, user: &User) -> Result<(), AuthError> {
        let secret = self
            .tokens
            .issue(
                TokenKind::EmailVerify,
                user.id,
                Duration::hours(ACTION_TOKEN_TTL_HOURS),
                json!({}),
            )
            .await?;

        let url = self.action_url("/auth/verify", &secret);
        self.mailer
            .send(
                &user.email,
                "Verify your email",
                &format!("Follow this link to verify your email address: {}", url),
            )
            .await?;

        debug!(user_id = user.id, "Sent verification mail");
        Ok(())
    }

    /// Consumes a verification token and marks the user's email verified
    ///
    /// Returns `false` uniformly when the token is missing, expired,
    /// revoked, or belongs to another user.
    pub async fn verify(&self, secret: &str, user: &User) -> Result<bool, AuthError> {
        if self
            .tokens
            .consume(TokenKind::EmailVerify, user.id, secret)
            .await?
            .is_none()
        {
            return Ok(false);
        }

        self.directory
            .mark_email_verified(user.id, self.clock.now())
            .await?;

        debug!(user_id = user.id, "Email verified");
        Ok(true)
    }

    /// Sends a password reset link to the user
    pub async fn send_reset(&self, user: &User) -> Result<(), AuthError> {
        let secret = self
            .tokens
            .issue(
                TokenKind::PasswordReset,
                user.id,
                Duration::hours(ACTION_TOKEN_TTL_HOURS),
                json!({}),
            )
            .await?;

        let url = self.action_url("/auth/reset-password", &secret);
        self.mailer
            .send(
                &user.email,
                "Reset your password",
                &format!("Follow this link to reset your password: {}", url),
            )
            .await?;

        debug!(user_id = user.id, "Sent password reset mail");
        Ok(())
    }

    /// Consumes a reset token and overwrites the user's password hash
    ///
    /// Returns `false` uniformly on any token failure. Live refresh
    /// tokens are left untouched: a reset does not force other sessions
    /// to log in again.
    pub async fn reset_password(
        &self,
        secret: &str,
        user: &User,
        new_password: &str,
    ) -> Result<bool, AuthError> {
        if self
            .tokens
            .consume(TokenKind::PasswordReset, user.id, secret)
            .await?
            .is_none()
        {
            return Ok(false);
        }

        let password_hash = hash_password(new_password, self.password_cost)?;
        self.directory
            .set_password_hash(user.id, &password_hash, self.clock.now())
            .await?;

        debug!(user_id = user.id, "Password reset");
        Ok(true)
    }

    /// Builds an action URL embedding the plain secret as a query
    /// parameter
    fn action_url(&self, path: &str, secret: &str) -> String {
        format!(
            "{}{}?token={}",
            self.app_url.trim_end_matches('/'),
            path,
            secret
        )
    }
}
