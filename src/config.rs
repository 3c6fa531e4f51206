/// Configuration management
///
/// Loads configuration from environment variables once at process start.
/// Components receive the loaded struct (or the relevant section of it) by
/// reference through their constructors; nothing reads the environment
/// mid-operation.
///
/// # Environment Variables
///
/// - `DATABASE_URL`: PostgreSQL connection string (required)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `JWT_SECRET`: Secret key for access token signing (required, at least 32 bytes)
/// - `JWT_TTL_MIN`: Access token lifetime in minutes (default: 15)
/// - `JWT_REFRESH_TTL_DAYS`: Refresh token lifetime in days (default: 30)
/// - `PASSWORD_HASH_COST`: Argon2id iteration count (default: 3)
/// - `APP_URL`: Base URL embedded in account action links (required)
/// - `MAIL_FROM_NAME`: Sender display name (default: "No Reply")
/// - `MAIL_FROM_EMAIL`: Sender address (default: "noreply@example.com")
///
/// # Example
///
/// ```no_run
/// use tokensmith::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Access tokens live for {} minutes", config.auth.access_ttl_minutes);
/// # Ok(())
/// # }
/// ```

use chrono::Duration;
use std::env;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database configuration
    pub database: DatabaseConfig,

    /// Credential and token configuration
    pub auth: AuthConfig,

    /// Outbound mail identity
    pub mail: MailConfig,
}

/// Database configuration
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,
}

/// Credential and token configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Secret key for access token signing
    ///
    /// Must be at least 32 bytes. Generate with: `openssl rand -hex 32`
    pub jwt_secret: String,

    /// Access token lifetime in minutes
    pub access_ttl_minutes: i64,

    /// Refresh token lifetime in days
    pub refresh_ttl_days: i64,

    /// Argon2id iteration count for password hashing
    pub password_hash_cost: u32,

    /// Base URL for account action links (email verification, password reset)
    pub app_url: String,
}

/// Outbound mail identity
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// Sender display name
    pub from_name: String,

    /// Sender address
    pub from_email: String,
}

impl AuthConfig {
    /// Access token lifetime as a duration
    pub fn access_ttl(&self) -> Duration {
        Duration::minutes(self.access_ttl_minutes)
    }

    /// Refresh token lifetime as a duration
    pub fn refresh_ttl(&self) -> Duration {
        Duration::days(self.refresh_ttl_days)
    }
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Required environment variables are missing
    /// - Environment variables have invalid values
    /// - `JWT_SECRET` is shorter than 32 bytes
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        let database_url = env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u32>()?;

        let jwt_secret = env::var("JWT_SECRET")
            .map_err(|_| anyhow::anyhow!("JWT_SECRET environment variable is required"))?;

        if jwt_secret.len() < 32 {
            anyhow::bail!("JWT_SECRET must be at least 32 characters long");
        }

        let access_ttl_minutes = env::var("JWT_TTL_MIN")
            .unwrap_or_else(|_| "15".to_string())
            .parse::<i64>()?;

        let refresh_ttl_days = env::var("JWT_REFRESH_TTL_DAYS")
            .unwrap_or_else(|_| "30".to_string())
            .parse::<i64>()?;

        let password_hash_cost = env::var("PASSWORD_HASH_COST")
            .unwrap_or_else(|_| "3".to_string())
            .parse::<u32>()?;

        if password_hash_cost == 0 {
            anyhow::bail!("PASSWORD_HASH_COST must be at least 1");
        }

        let app_url = env::var("APP_URL")
            .map_err(|_| anyhow::anyhow!("APP_URL environment variable is required"))?;

        let from_name = env::var("MAIL_FROM_NAME").unwrap_or_else(|_| "No Reply".to_string());
        let from_email =
            env::var("MAIL_FROM_EMAIL").unwrap_or_else(|_| "noreply@example.com".to_string());

        Ok(Self {
            database: DatabaseConfig {
                url: database_url,
                max_connections,
            },
            auth: AuthConfig {
                jwt_secret,
                access_ttl_minutes,
                refresh_ttl_days,
                password_hash_cost,
                app_url,
            },
            mail: MailConfig {
                from_name,
                from_email,
            },
        })
    }
}
