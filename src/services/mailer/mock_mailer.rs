use crate::services::mailer::{MailError, Mailer, OutgoingEmail};
use async_trait::async_trait;
use std::sync::Mutex;

/// A mock mailer that records sent emails for testing purposes.
#[derive(Debug, Default)]
#[allow(dead_code)]
pub struct MockMailer {
    pub attempted: Mutex<Vec<OutgoingEmail>>,
    pub sent: Mutex<Vec<OutgoingEmail>>,
    pub fail_send: bool,
    /// Fail only messages addressed to this recipient.
    pub fail_recipient: Option<String>,
}

impl MockMailer {
    pub fn failing() -> Self {
        Self {
            fail_send: true,
            ..Default::default()
        }
    }

    pub fn attempted_subjects(&self) -> Vec<String> {
        self.attempted
            .lock()
            .unwrap()
            .iter()
            .map(|email| email.subject.clone())
            .collect()
    }
}

#[async_trait]
impl Mailer for MockMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        self.attempted.lock().unwrap().push(email.clone());

        let targeted = self
            .fail_recipient
            .as_ref()
            .is_some_and(|addr| email.to.iter().any(|to| to == addr));
        if self.fail_send || targeted {
            return Err(MailError::SendError("mock failure".into()));
        }

        self.sent.lock().unwrap().push(email.clone());
        Ok(())
    }
}
