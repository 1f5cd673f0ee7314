use std::{env, net::SocketAddr, str::FromStr};

use sqlx::postgres::PgSslMode;
use thiserror::Error;

use crate::services::mailer::{SmtpSettings, TlsMode};

pub const DEFAULT_SECRET_KEY: &str = "studyhive-secret-key";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_SESSION_TTL_HOURS: i64 = 12;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{key} has an invalid value {value:?}: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionBackend {
    Postgres,
    Memory,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailProvider {
    Sendgrid,
    Smtp,
    Log,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminCredentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailSettings {
    pub provider: EmailProvider,
    /// Sender address used for every outgoing message.
    pub from: String,
    /// Mailbox that receives new-report notifications.
    pub admin_recipient: String,
    pub sendgrid_api_key: Option<String>,
    pub smtp: Option<SmtpSettings>,
    /// Required variables that were not set. Delivery is disabled while non-empty.
    pub missing: Vec<&'static str>,
}

impl MailSettings {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    pub production: bool,
    pub bind_addr: SocketAddr,
    pub database_url: String,
    pub database_ssl_mode: PgSslMode,
    pub secret_key: String,
    pub session_backend: SessionBackend,
    pub session_ttl_hours: i64,
    pub session_cookie_secure: bool,
    pub admin: AdminCredentials,
    pub mail: MailSettings,
    /// When set, a failed notification turns a persisted submission into a 500.
    pub support_strict_email: bool,
    pub cors_origin: Option<String>,
    pub static_dir: String,
}

pub fn is_production() -> bool {
    env::var("APP_ENV")
        .map(|v| v.eq_ignore_ascii_case("production"))
        .unwrap_or(false)
}

impl Config {
    /// Reads the process environment. `.env` is loaded by the binary before this runs.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let production = get("APP_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?;
        let database_ssl_mode = match get("DATABASE_SSL_MODE") {
            Some(raw) => PgSslMode::from_str(&raw).map_err(|err| ConfigError::Invalid {
                key: "DATABASE_SSL_MODE",
                value: raw.clone(),
                reason: err.to_string(),
            })?,
            None => PgSslMode::Require,
        };

        let bind_addr = parse_or("BIND_ADDR", get("BIND_ADDR"), DEFAULT_BIND_ADDR)?;

        let secret_key = match get("SECRET_KEY") {
            Some(secret) => secret,
            None => {
                tracing::warn!("SECRET_KEY is not set; falling back to the development default");
                DEFAULT_SECRET_KEY.to_string()
            }
        };

        let session_backend = match get("SESSION_BACKEND").as_deref() {
            None => SessionBackend::Postgres,
            Some(v) if v.eq_ignore_ascii_case("postgres") => SessionBackend::Postgres,
            Some(v) if v.eq_ignore_ascii_case("memory") => SessionBackend::Memory,
            Some(other) => {
                return Err(ConfigError::Invalid {
                    key: "SESSION_BACKEND",
                    value: other.to_string(),
                    reason: "expected 'postgres' or 'memory'".into(),
                })
            }
        };

        let session_ttl_hours: i64 = parse_or(
            "SESSION_TTL_HOURS",
            get("SESSION_TTL_HOURS"),
            &DEFAULT_SESSION_TTL_HOURS.to_string(),
        )?;
        if session_ttl_hours < 1 {
            return Err(ConfigError::Invalid {
                key: "SESSION_TTL_HOURS",
                value: session_ttl_hours.to_string(),
                reason: "must be at least 1".into(),
            });
        }

        let session_cookie_secure = match get("SESSION_COOKIE_SECURE") {
            Some(raw) => parse_bool("SESSION_COOKIE_SECURE", &raw)?,
            None => production,
        };

        let admin = AdminCredentials {
            username: lookup("ADMIN_USERNAME").filter(|v| !v.is_empty()),
            password: lookup("ADMIN_PASSWORD").filter(|v| !v.is_empty()),
        };

        let mail = mail_settings(&get)?;

        let support_strict_email = match get("SUPPORT_STRICT_EMAIL") {
            Some(raw) => parse_bool("SUPPORT_STRICT_EMAIL", &raw)?,
            None => false,
        };

        Ok(Config {
            production,
            bind_addr,
            database_url,
            database_ssl_mode,
            secret_key,
            session_backend,
            session_ttl_hours,
            session_cookie_secure,
            admin,
            mail,
            support_strict_email,
            cors_origin: get("CORS_ORIGIN"),
            static_dir: get("STATIC_DIR").unwrap_or_else(|| "static".to_string()),
        })
    }
}

fn mail_settings<G>(get: &G) -> Result<MailSettings, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    let provider = match get("EMAIL_PROVIDER").map(|v| v.to_ascii_lowercase()).as_deref() {
        None | Some("sendgrid") => EmailProvider::Sendgrid,
        Some("smtp") => EmailProvider::Smtp,
        Some("log") => EmailProvider::Log,
        Some(other) => {
            return Err(ConfigError::Invalid {
                key: "EMAIL_PROVIDER",
                value: other.to_string(),
                reason: "expected 'sendgrid', 'smtp' or 'log'".into(),
            })
        }
    };

    if provider == EmailProvider::Log {
        return Ok(MailSettings {
            provider,
            from: get("MAIL_FROM").unwrap_or_else(|| "no-reply@studyhive.local".into()),
            admin_recipient: get("MAIL_TO").unwrap_or_else(|| "admin@studyhive.local".into()),
            sendgrid_api_key: None,
            smtp: None,
            missing: Vec::new(),
        });
    }

    // Missing mail variables only disable delivery; the site still starts.
    let mut missing = Vec::new();
    let mut required = |key: &'static str| {
        let value = get(key);
        if value.is_none() {
            missing.push(key);
        }
        value
    };

    let from = required("MAIL_FROM").unwrap_or_default();
    let admin_recipient = required("MAIL_TO").unwrap_or_default();

    let (sendgrid_api_key, smtp) = match provider {
        EmailProvider::Sendgrid => (required("SENDGRID_API_KEY"), None),
        EmailProvider::Smtp => {
            let host = required("SMTP_HOST");
            let port: u16 = parse_or("SMTP_PORT", get("SMTP_PORT"), "587")?;
            let tls_mode = match get("SMTP_TLS") {
                Some(raw) => TlsMode::from_str(&raw).map_err(|reason| ConfigError::Invalid {
                    key: "SMTP_TLS",
                    value: raw.clone(),
                    reason,
                })?,
                None => TlsMode::StartTls,
            };
            let smtp = host.map(|host| SmtpSettings {
                host,
                port,
                username: get("SMTP_USERNAME"),
                password: get("SMTP_PASSWORD"),
                tls_mode,
            });
            (None, smtp)
        }
        EmailProvider::Log => (None, None),
    };

    Ok(MailSettings {
        provider,
        from,
        admin_recipient,
        sendgrid_api_key,
        smtp,
        missing,
    })
}

fn parse_or<T>(key: &'static str, raw: Option<String>, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let value = raw.unwrap_or_else(|| default.to_string());
    value.parse::<T>().map_err(|err| ConfigError::Invalid {
        key,
        value: value.clone(),
        reason: err.to_string(),
    })
}

fn parse_bool(key: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: raw.to_string(),
            reason: "expected a boolean".into(),
        }),
    }
}

#[cfg(test)]
pub fn test_config() -> Config {
    Config {
        production: false,
        bind_addr: DEFAULT_BIND_ADDR.parse().unwrap(),
        database_url: "postgres://localhost/studyhive_test".into(),
        database_ssl_mode: PgSslMode::Disable,
        secret_key: "test-secret-key-0123456789abcdef".into(),
        session_backend: SessionBackend::Memory,
        session_ttl_hours: 1,
        session_cookie_secure: false,
        admin: AdminCredentials {
            username: Some("admin".into()),
            password: Some("hunter2".into()),
        },
        mail: MailSettings {
            provider: EmailProvider::Log,
            from: "support@studyhive.test".into(),
            admin_recipient: "admin@studyhive.test".into(),
            sendgrid_api_key: None,
            smtp: None,
            missing: Vec::new(),
        },
        support_strict_email: false,
        cors_origin: None,
        static_dir: "static".into(),
    }
}
