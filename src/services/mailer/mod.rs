use async_trait::async_trait;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use lettre::address::AddressError;
use lettre::transport::smtp::Error as SmtpError;

#[derive(Debug, Error)]
pub enum MailError {
    #[error("Invalid Address: {0}")]
    InvalidEmailAddress(String),
    #[error("Send error: {0}")]
    SendError(String),
    #[error("Missing configuration: {0}")]
    MissingConfig(String),
    #[error("Compose error: {0}")]
    Compose(String),
}

impl From<SmtpError> for MailError {
    fn from(err: SmtpError) -> Self {
        MailError::SendError(err.to_string())
    }
}

impl From<lettre::error::Error> for MailError {
    fn from(err: lettre::error::Error) -> Self {
        MailError::SendError(err.to_string())
    }
}

impl From<AddressError> for MailError {
    fn from(e: AddressError) -> Self {
        MailError::InvalidEmailAddress(e.to_string())
    }
}

/// A fully composed HTML message ready for a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub from: String,
    pub to: Vec<String>,
    pub subject: String,
    pub html_body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: &OutgoingEmail) -> Result<(), MailError>;
}

mod log_mailer;
mod mock_mailer;
mod pluggable;
mod sendgrid;
mod smtp_impl;

pub use log_mailer::LogMailer;
#[allow(unused_imports)]
pub use mock_mailer::MockMailer;
pub use pluggable::PluggableMailer;
pub use sendgrid::SendgridMailer;
pub use smtp_impl::SmtpMailer;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlsMode {
    StartTls,
    Implicit,
    None,
}

impl TlsMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            TlsMode::StartTls => "starttls",
            TlsMode::Implicit => "implicit_tls",
            TlsMode::None => "none",
        }
    }
}

impl fmt::Display for TlsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TlsMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "starttls" => Ok(TlsMode::StartTls),
            "implicit" | "implicit_tls" | "tls" => Ok(TlsMode::Implicit),
            "none" | "plain" | "disabled" => Ok(TlsMode::None),
            other => Err(format!(
                "unsupported SMTP TLS mode '{}' (expected starttls, implicit or none)",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tls_mode: TlsMode,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_tls_mode_aliases() {
        assert_eq!("STARTTLS".parse::<TlsMode>().unwrap(), TlsMode::StartTls);
        assert_eq!("tls".parse::<TlsMode>().unwrap(), TlsMode::Implicit);
        assert_eq!("plain".parse::<TlsMode>().unwrap(), TlsMode::None);
        assert!("ssl3".parse::<TlsMode>().is_err());
    }
}
