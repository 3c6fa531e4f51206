/// Database models
///
/// # Models
///
/// - `user`: User accounts, roles, and credential fields
/// - `token`: Opaque auth tokens shared by the refresh, email verification,
///   and password reset flows

pub mod token;
pub mod user;
