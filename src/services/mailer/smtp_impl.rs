use async_trait::async_trait;
use lettre::{
    message::{header::ContentType, Mailbox},
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use std::sync::Arc;

use crate::services::mailer::{Mailer, OutgoingEmail, SmtpSettings, TlsMode};

use super::MailError;

#[derive(Clone)]
pub struct SmtpMailer {
    transport: Arc<AsyncSmtpTransport<Tokio1Executor>>,
    settings: SmtpSettings,
}

impl SmtpMailer {
    pub fn new(settings: &SmtpSettings) -> Result<Self, MailError> {
        let transport = build_transport(settings)?;

        Ok(Self {
            transport: Arc::new(transport),
            settings: settings.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError> {
        let message = build_message(email)?;

        self.transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| {
                MailError::SendError(format!(
                    "{} (host: {}:{}, tls: {}, auth: {})",
                    e,
                    self.settings.host,
                    self.settings.port,
                    self.settings.tls_mode,
                    if self.settings.username.is_some() {
                        "set"
                    } else {
                        "not set"
                    }
                ))
            })
    }
}

fn build_message(email: &OutgoingEmail) -> Result<Message, MailError> {
    if email.to.is_empty() {
        return Err(MailError::InvalidEmailAddress("no recipients".into()));
    }

    let from_mailbox: Mailbox = email.from.parse()?;
    let mut builder = Message::builder().from(from_mailbox);

    for recipient in &email.to {
        let mailbox: Mailbox = recipient.parse()?;
        builder = builder.to(mailbox);
    }

    Ok(builder
        .subject(email.subject.as_str())
        .header(ContentType::TEXT_HTML)
        .body(email.html_body.clone())?)
}

fn build_transport(
    settings: &SmtpSettings,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
    if settings.host.trim().is_empty() {
        return Err(MailError::MissingConfig("SMTP host is empty".into()));
    }

    let mut builder = match settings.tls_mode {
        TlsMode::StartTls => {
            let tls = TlsParameters::new(settings.host.clone())?;
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&settings.host)?
                .port(settings.port)
                .tls(Tls::Required(tls))
        }
        TlsMode::Implicit => {
            let tls = TlsParameters::new(settings.host.clone())?;
            AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.host)?
                .port(settings.port)
                .tls(Tls::Wrapper(tls))
        }
        TlsMode::None => {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&settings.host)
                .port(settings.port)
        }
    };

    if let (Some(username), Some(password)) =
        (settings.username.as_ref(), settings.password.as_ref())
    {
        builder = builder.credentials(Credentials::new(username.clone(), password.clone()));
    }

    Ok(builder.build())
}
