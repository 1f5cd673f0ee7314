use async_trait::async_trait;
use reqwest::Client;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{EmailProvider, MailSettings};
use crate::services::mailer::{MailError, Mailer, OutgoingEmail};

use super::log_mailer::LogMailer;
use super::sendgrid::SendgridMailer;
use super::smtp_impl::SmtpMailer;

#[derive(Clone)]
enum AppSender {
    Smtp(Arc<SmtpMailer>),
    Sendgrid(Arc<SendgridMailer>),
    Log(LogMailer),
    /// Provider selected but not usable; every send fails with this reason.
    Unconfigured(String),
}

/// Dispatches to the transport selected by `EMAIL_PROVIDER`.
#[derive(Clone)]
pub struct PluggableMailer {
    app_sender: AppSender,
}

impl PluggableMailer {
    /// Never fails: incomplete or invalid provider settings leave delivery
    /// disabled so the rest of the site keeps serving.
    pub fn from_settings(settings: &MailSettings, http: &Client) -> Self {
        if !settings.is_complete() {
            let reason = format!("missing {}", settings.missing.join(", "));
            warn!(provider = ?settings.provider, %reason, "email delivery disabled");
            return Self::unconfigured(reason);
        }

        let app_sender = match Self::build_sender(settings, http) {
            Ok(sender) => sender,
            Err(err) => {
                warn!(provider = ?settings.provider, error = %err, "email delivery disabled");
                AppSender::Unconfigured(err.to_string())
            }
        };

        Self { app_sender }
    }

    fn unconfigured(reason: String) -> Self {
        Self {
            app_sender: AppSender::Unconfigured(reason),
        }
    }

    fn build_sender(settings: &MailSettings, http: &Client) -> Result<AppSender, MailError> {
        Ok(match settings.provider {
            EmailProvider::Smtp => {
                let smtp = settings
                    .smtp
                    .as_ref()
                    .ok_or_else(|| MailError::MissingConfig("SMTP_HOST".into()))?;
                info!(host = %smtp.host, port = smtp.port, tls = %smtp.tls_mode, "using SMTP mail transport");
                AppSender::Smtp(Arc::new(SmtpMailer::new(smtp)?))
            }
            EmailProvider::Sendgrid => {
                let api_key = settings
                    .sendgrid_api_key
                    .as_deref()
                    .ok_or_else(|| MailError::MissingConfig("SENDGRID_API_KEY".into()))?;
                info!("using SendGrid mail transport");
                AppSender::Sendgrid(Arc::new(SendgridMailer::new(api_key, http)?))
            }
            EmailProvider::Log => {
                info!("email delivery disabled, using log transport");
                AppSender::Log(LogMailer)
            }
        })
    }

    pub fn provider_name(&self) -> &'static str {
        match &self.app_sender {
            AppSender::Smtp(_) => "smtp",
            AppSender::Sendgrid(_) => "sendgrid",
            AppSender::Log(_) => "log",
            AppSender::Unconfigured(_) => "unconfigured",
        }
    }
}

#[async_trait]
impl Mailer for PluggableMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        match &self.app_sender {
            AppSender::Smtp(smtp) => smtp.send(email).await,
            AppSender::Sendgrid(sg) => sg.send(email).await,
            AppSender::Log(log) => log.send(email).await,
            AppSender::Unconfigured(reason) => Err(MailError::MissingConfig(reason.clone())),
        }
    }
}
