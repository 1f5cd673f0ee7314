use async_trait::async_trait;
use tracing::info;

use crate::services::mailer::{MailError, Mailer, OutgoingEmail};

/// Writes messages to the log instead of delivering them. Used for local development.
#[derive(Debug, Clone, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        info!(
            from = %email.from,
            to = ?email.to,
            subject = %email.subject,
            body_len = email.html_body.len(),
            "email delivery disabled, message logged only"
        );
        Ok(())
    }
}
