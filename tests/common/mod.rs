/// Common test utilities for integration tests
///
/// Wires the credential services against the in-memory storage backend,
/// a manually advanced clock, and a mailer double that records every
/// message. No external services are needed; time only moves when a test
/// says so.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::{Arc, Mutex};

use tokensmith::auth::account::AccountActions;
use tokensmith::auth::jwt::AccessTokenIssuer;
use tokensmith::auth::session::SessionService;
use tokensmith::auth::tokens::TokenStore;
use tokensmith::clock::ManualClock;
use tokensmith::mailer::{MailError, Mailer};
use tokensmith::models::user::User;
use tokensmith::storage::memory::MemoryStorage;

/// Signing secret shared by every test issuer
pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Access token TTL in minutes
pub const ACCESS_TTL_MINUTES: i64 = 15;

/// Refresh token TTL in days
pub const REFRESH_TTL_DAYS: i64 = 30;

/// Low Argon2 cost to keep the suite fast
pub const PASSWORD_COST: u32 = 2;

/// Base URL embedded in mailed action links
pub const APP_URL: &str = "https://app.example.com";

/// A message captured by the recording mailer
#[derive(Debug, Clone)]
pub struct SentMail {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mailer double that records every message and can be told to fail
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<SentMail>>,
    fail_next: Mutex<bool>,
}

impl RecordingMailer {
    /// Makes the next send fail with a transport error
    pub fn fail_next(&self) {
        *self.fail_next.lock().unwrap() = true;
    }

    /// Number of messages delivered so far
    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    /// The most recently delivered message
    pub fn last(&self) -> Option<SentMail> {
        self.sent.lock().unwrap().last().cloned()
    }

    /// Extracts the secret from the action URL in the last message
    pub fn last_token(&self) -> Option<String> {
        self.last()
            .and_then(|mail| mail.body.split("token=").nth(1).map(str::to_string))
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        let mut fail = self.fail_next.lock().unwrap();
        if *fail {
            *fail = false;
            return Err(MailError::Delivery("smtp connection refused".to_string()));
        }
        drop(fail);

        self.sent.lock().unwrap().push(SentMail {
            to: to.to_string(),
            subject: subject.to_string(),
            body: body.to_string(),
        });
        Ok(())
    }
}

/// Test context containing the wired services and their collaborators
pub struct TestContext {
    pub storage: Arc<MemoryStorage>,
    pub clock: Arc<ManualClock>,
    pub mailer: Arc<RecordingMailer>,
    pub tokens: TokenStore,
    pub sessions: SessionService,
    pub accounts: AccountActions,
}

impl TestContext {
    /// Creates a fresh context with empty storage and a frozen clock
    pub fn new() -> Self {
        let storage = Arc::new(MemoryStorage::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        ));
        let mailer = Arc::new(RecordingMailer::default());

        let tokens = TokenStore::new(storage.clone(), clock.clone());
        let issuer = AccessTokenIssuer::new(JWT_SECRET, ACCESS_TTL_MINUTES, clock.clone());
        let sessions = SessionService::new(
            storage.clone(),
            tokens.clone(),
            issuer,
            clock.clone(),
            REFRESH_TTL_DAYS,
            PASSWORD_COST,
        );
        let accounts = AccountActions::new(
            storage.clone(),
            tokens.clone(),
            mailer.clone(),
            clock.clone(),
            APP_URL,
            PASSWORD_COST,
        );

        Self {
            storage,
            clock,
            mailer,
            tokens,
            sessions,
            accounts,
        }
    }

    /// Registers a user through the session service
    pub async fn register_user(&self, email: &str, password: &str) -> User {
        self.sessions
            .register("Test User", email, password)
            .await
            .expect("registration should succeed")
    }

    /// Moves the shared clock forward
    pub fn advance(&self, delta: Duration) {
        self.clock.advance(delta);
    }

    /// The shared clock's current instant
    pub fn now(&self) -> DateTime<Utc> {
        use tokensmith::clock::Clock as _;
        self.clock.now()
    }
}
