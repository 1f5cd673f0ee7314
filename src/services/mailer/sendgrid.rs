use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::services::mailer::{MailError, Mailer, OutgoingEmail};

pub const SENDGRID_API_BASE: &str = "https://api.sendgrid.com";

#[derive(Clone)]
pub struct SendgridMailer {
    api_key: String,
    api_base: String,
    http: Client,
}

impl SendgridMailer {
    pub fn new(api_key: &str, http: &Client) -> Result<Self, MailError> {
        Self::with_api_base(api_key, http, SENDGRID_API_BASE)
    }

    pub fn with_api_base(api_key: &str, http: &Client, api_base: &str) -> Result<Self, MailError> {
        if api_key.trim().is_empty() {
            return Err(MailError::MissingConfig("SENDGRID_API_KEY".into()));
        }

        Ok(Self {
            api_key: api_key.to_string(),
            api_base: api_base.trim_end_matches('/').to_string(),
            http: http.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SendgridMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        if email.to.is_empty() {
            return Err(MailError::InvalidEmailAddress("no recipients".into()));
        }

        let to: Vec<_> = email.to.iter().map(|addr| json!({ "email": addr })).collect();
        let payload = json!({
            "personalizations": [ { "to": to } ],
            "from": { "email": email.from },
            "subject": email.subject,
            "content": [ { "type": "text/html", "value": email.html_body } ]
        });

        let resp = self
            .http
            .post(format!("{}/v3/mail/send", self.api_base))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| MailError::SendError(e.to_string()))?;

        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            Err(MailError::SendError(format!(
                "SendGrid send failed: {} {}",
                status, text
            )))
        }
    }
}
