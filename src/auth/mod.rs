/// Credential and token lifecycle services
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`jwt`]: Signed access token issuing and decoding
/// - [`tokens`]: Opaque token store with atomic verify-then-revoke
/// - [`session`]: Registration, login, refresh rotation, logout
/// - [`account`]: Email verification and password reset flows
///
/// # Failure model
///
/// Authentication outcomes are deliberately uniform. A wrong password and
/// an unknown email look identical to the caller, and an expired, revoked,
/// or unknown token all fail the same way, so nothing in the response
/// surface can be used as an oracle. Those rejections are values
/// (`None`/`false`), not errors. [`AuthError`] is reserved for genuine
/// faults: storage unavailability, hashing or signing failures, and mail
/// delivery problems.

pub mod account;
pub mod jwt;
pub mod password;
pub mod session;
pub mod tokens;

use crate::mailer::MailError;
use crate::storage::StorageError;

/// Error type for the credential services
///
/// Everything here is recoverable at the boundary; the caller decides the
/// outward status. Only [`AuthError::Storage`] indicates the request
/// cannot be answered at all.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// Token or user storage is unavailable
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Password hashing or verification failed
    #[error("Password operation failed: {0}")]
    Password(#[from] password::PasswordError),

    /// Access token signing failed
    #[error("Access token error: {0}")]
    Jwt(#[from] jwt::JwtError),

    /// The mail collaborator failed to deliver a message
    ///
    /// Kept distinct from token failures: it signals an infrastructure
    /// problem, not a bad credential.
    #[error("Mail delivery failed: {0}")]
    Delivery(#[from] MailError),
}
