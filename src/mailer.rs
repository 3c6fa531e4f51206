/// Outbound mail collaborator
///
/// The core builds action URLs and message bodies but never speaks SMTP
/// itself. Delivery goes through the [`Mailer`] trait; failures surface as
/// [`MailError`] so infrastructure problems stay distinguishable from bad
/// credentials. The core does not retry or queue; if a transport wants
/// retries, it implements them behind this trait.

use async_trait::async_trait;
use tracing::info;

/// Error type for mail delivery
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// The underlying transport rejected or failed to deliver the message
    #[error("Mail delivery failed: {0}")]
    Delivery(String),
}

/// Delivery boundary for account action messages
#[async_trait]
pub trait Mailer: Send + Sync {
    /// Sends a single message
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError>;
}

/// Development transport that writes messages to the log instead of
/// sending them
///
/// Useful while no real mail provider is wired up: the action URL shows
/// up in the server log and can be followed by hand.
#[derive(Debug, Clone)]
pub struct LogMailer {
    from_name: String,
    from_email: String,
}

impl LogMailer {
    pub fn new(from_name: impl Into<String>, from_email: impl Into<String>) -> Self {
        Self {
            from_name: from_name.into(),
            from_email: from_email.into(),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &str, subject: &str, body: &str) -> Result<(), MailError> {
        info!(
            from_name = %self.from_name,
            from_email = %self.from_email,
            to = %to,
            subject = %subject,
            body = %body,
            "Mail written to log transport"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_log_mailer_always_delivers() {
        let mailer = LogMailer::new("No Reply", "noreply@example.com");
        let result = mailer
            .send("user@example.com", "Subject", "Body text")
            .await;
        assert!(result.is_ok());
    }
}
