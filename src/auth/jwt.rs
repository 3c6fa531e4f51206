/// Access token issuing and validation
///
/// Access tokens are short-lived JWTs signed with HS256. Claims carry the
/// user id, email, and a snapshot of role names taken at issuance; a role
/// change only takes effect on the next issuance, never retroactively.
/// Tokens are stateless and never persisted server-side.
///
/// # Security
///
/// - **Algorithm**: HS256 (HMAC with SHA-256)
/// - **Expiration**: minutes-scale, set from configuration
/// - **Secret Management**: at least 32 bytes, enforced at configuration load
///
/// Signature, shape, and expiry failures are all folded into a single
/// "invalid token" outcome so callers cannot tell which check failed.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use chrono::Utc;
/// use tokensmith::auth::jwt::AccessTokenIssuer;
/// use tokensmith::clock::SystemClock;
/// use tokensmith::models::user::User;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let issuer = AccessTokenIssuer::new(
///     "your-secret-key-at-least-32-bytes!!",
///     15,
///     Arc::new(SystemClock),
/// );
///
/// let now = Utc::now();
/// let user = User {
///     id: 1,
///     name: "Jane".to_string(),
///     email: "jane@example.com".to_string(),
///     password_hash: String::new(),
///     email_verified_at: None,
///     created_at: now,
///     updated_at: now,
///     deleted_at: None,
/// };
///
/// let (token, _expires_at) = issuer.issue(&user, vec!["user".to_string()])?;
/// let claims = issuer.decode(&token).expect("fresh token decodes");
/// assert_eq!(claims.sub, 1);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::clock::Clock;
use crate::models::user::User;

/// Error type for access token creation
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),
}

/// Claims embedded in an access token
///
/// # Standard Claims
///
/// - `sub`: Subject (user ID)
/// - `iat`: Issued at timestamp
/// - `exp`: Expiration timestamp
///
/// # Custom Claims
///
/// - `email`: Email address at issuance time
/// - `roles`: Role name snapshot at issuance time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Subject - User ID
    pub sub: i64,

    /// Email address at issuance time
    pub email: String,

    /// Role names at issuance time
    ///
    /// A snapshot: role changes apply from the next issuance onward
    pub roles: Vec<String>,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,
}

/// Stateless signer and verifier for access tokens
#[derive(Clone)]
pub struct AccessTokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    ttl: Duration,
    clock: Arc<dyn Clock>,
}

impl AccessTokenIssuer {
    /// Creates an issuer from the signing secret and TTL in minutes
    pub fn new(secret: &str, ttl_minutes: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            ttl: Duration::minutes(ttl_minutes),
            clock,
        }
    }

    /// Signs a new access token for the user
    ///
    /// Returns the encoded token together with its expiry instant. The
    /// role list is embedded as-is; callers pass the names current at
    /// this moment.
    ///
    /// # Errors
    ///
    /// Returns `JwtError::CreateError` if encoding fails
    pub fn issue(
        &self,
        user: &User,
        roles: Vec<String>,
    ) -> Result<(String, DateTime<Utc>), JwtError> {
        let now = self.clock.now();
        let expires_at = now + self.ttl;

        let claims = AccessClaims {
            sub: user.id,
            email: user.email.clone(),
            roles,
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))?;

        Ok((token, expires_at))
    }

    /// Decodes and verifies an access token
    ///
    /// Returns `None` on any failure: bad signature, malformed token, or
    /// past expiry. Which check failed is visible only in debug logs,
    /// never to the caller.
    pub fn decode(&self, token: &str) -> Option<AccessClaims> {
        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked below against the injected clock
        validation.validate_exp = false;

        let data = match decode::<AccessClaims>(token, &self.decoding_key, &validation) {
            Ok(data) => data,
            Err(e) => {
                debug!("Access token rejected: {}", e);
                return None;
            }
        };

        if data.claims.exp <= self.clock.now().timestamp() {
            debug!(sub = data.claims.sub, "Access token rejected: expired");
            return None;
        }

        Some(data.claims)
    }
}
