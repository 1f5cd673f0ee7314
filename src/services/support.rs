//! Support ticket intake: validate, persist, then notify.
//!
//! The database write always happens before any email is attempted, and a
//! failed email never undoes the write.

use minijinja::context;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::{
    config::{Config, MailSettings},
    db::support_report_repository::SupportReportRepository,
    models::support_report::{NewSupportReport, SupportReport},
    services::mailer::{MailError, Mailer, OutgoingEmail},
    state::AppState,
    templates,
};

pub const ADMIN_NOTIFICATION_SUBJECT: &str = "New StudyHive Support Report";
pub const SUBMITTER_CONFIRMATION_SUBJECT: &str = "We've received your report – StudyHive";

/// Raw form body. Fields stay untyped so that wrong types are reported as
/// missing fields rather than as deserialization failures.
#[derive(Debug, Default, Deserialize)]
pub struct SupportPayload {
    #[serde(default)]
    pub name: Option<Value>,
    #[serde(default)]
    pub email: Option<Value>,
    #[serde(default)]
    pub message: Option<Value>,
}

#[derive(Debug, Error)]
pub enum SupportError {
    #[error("Missing required field: {field}")]
    Validation { field: &'static str },
    #[error("failed to store support report: {0}")]
    Persistence(#[from] sqlx::Error),
    #[error("support report {report_id} stored but notification failed")]
    Delivery {
        report_id: i32,
        notifications: NotificationReport,
    },
}

fn required(value: &Option<Value>, field: &'static str) -> Result<String, SupportError> {
    match value {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        _ => Err(SupportError::Validation { field }),
    }
}

impl SupportPayload {
    pub fn validate(&self) -> Result<NewSupportReport, SupportError> {
        Ok(NewSupportReport {
            name: required(&self.name, "name")?,
            email: required(&self.email, "email")?,
            message: required(&self.message, "message")?,
        })
    }
}

/// Delivery outcome for both notifications. Only inspected for logging and
/// the strict delivery policy.
#[derive(Debug)]
pub struct NotificationReport {
    pub admin: Result<(), MailError>,
    pub submitter: Result<(), MailError>,
}

impl NotificationReport {
    pub fn all_delivered(&self) -> bool {
        self.admin.is_ok() && self.submitter.is_ok()
    }
}

#[derive(Debug)]
pub struct SubmissionReceipt {
    pub report: SupportReport,
    pub notifications: NotificationReport,
}

pub fn compose_admin_notification(
    mail: &MailSettings,
    report: &SupportReport,
) -> Result<OutgoingEmail, MailError> {
    let html_body = templates::render(
        "email/admin_notification.html",
        context! {
            name => &report.name,
            email => &report.email,
            message => &report.message,
        },
    )
    .map_err(|err| MailError::Compose(err.to_string()))?;

    Ok(OutgoingEmail {
        from: mail.from.clone(),
        to: vec![mail.admin_recipient.clone()],
        subject: ADMIN_NOTIFICATION_SUBJECT.to_string(),
        html_body,
    })
}

pub fn compose_submitter_confirmation(
    mail: &MailSettings,
    report: &SupportReport,
) -> Result<OutgoingEmail, MailError> {
    let html_body = templates::render(
        "email/submitter_confirmation.html",
        context! {
            name => &report.name,
            message => &report.message,
        },
    )
    .map_err(|err| MailError::Compose(err.to_string()))?;

    Ok(OutgoingEmail {
        from: mail.from.clone(),
        to: vec![report.email.clone()],
        subject: SUBMITTER_CONFIRMATION_SUBJECT.to_string(),
        html_body,
    })
}

async fn deliver(
    mailer: &dyn Mailer,
    composed: Result<OutgoingEmail, MailError>,
) -> Result<(), MailError> {
    let email = composed?;
    mailer.send(&email).await
}

pub struct SupportDesk<'a> {
    reports: &'a dyn SupportReportRepository,
    mailer: &'a dyn Mailer,
    config: &'a Config,
}

impl<'a> SupportDesk<'a> {
    pub fn new(
        reports: &'a dyn SupportReportRepository,
        mailer: &'a dyn Mailer,
        config: &'a Config,
    ) -> Self {
        Self {
            reports,
            mailer,
            config,
        }
    }

    pub fn from_state(state: &'a AppState) -> Self {
        Self::new(
            state.reports.as_ref(),
            state.mailer.as_ref(),
            state.config.as_ref(),
        )
    }

    pub async fn submit(&self, payload: &SupportPayload) -> Result<SubmissionReceipt, SupportError> {
        let new_report = payload.validate()?;

        let report = self.reports.create_report(new_report).await?;
        info!(report_id = report.id, "stored support report");

        let notifications = self.notify(&report).await;

        if notifications.all_delivered() {
            info!(report_id = report.id, "support notifications sent");
        } else {
            if let Err(err) = &notifications.admin {
                warn!(report_id = report.id, error = %err, "admin notification failed (ignored)");
            }
            if let Err(err) = &notifications.submitter {
                warn!(report_id = report.id, error = %err, "submitter confirmation failed (ignored)");
            }

            if self.config.support_strict_email {
                return Err(SupportError::Delivery {
                    report_id: report.id,
                    notifications,
                });
            }
        }

        Ok(SubmissionReceipt {
            report,
            notifications,
        })
    }

    /// Sends the admin notice and the submitter confirmation. A failure of one
    /// does not prevent the other from being attempted.
    pub async fn notify(&self, report: &SupportReport) -> NotificationReport {
        let mail = &self.config.mail;

        let admin = deliver(self.mailer, compose_admin_notification(mail, report)).await;
        let submitter = deliver(self.mailer, compose_submitter_confirmation(mail, report)).await;

        NotificationReport { admin, submitter }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use crate::db::mock_db::MockDb;
    use crate::services::mailer::{MockMailer, PluggableMailer};
    use serde_json::json;
    use time::OffsetDateTime;

    fn payload(value: Value) -> SupportPayload {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn rejects_missing_empty_and_non_string_fields() {
        let cases = [
            (json!({ "email": "a@x.com", "message": "Help" }), "name"),
            (json!({ "name": "", "email": "a@x.com", "message": "Help" }), "name"),
            (json!({ "name": "Ada", "email": null, "message": "Help" }), "email"),
            (json!({ "name": "Ada", "email": "a@x.com", "message": 42 }), "message"),
            (json!({}), "name"),
        ];

        for (body, expected) in cases {
            match payload(body).validate() {
                Err(SupportError::Validation { field }) => assert_eq!(field, expected),
                other => panic!("expected validation error for {expected}, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn stores_report_then_sends_both_emails() {
        let db = MockDb::default();
        let mailer = MockMailer::default();
        let config = test_config();
        let before = OffsetDateTime::now_utc();

        let receipt = SupportDesk::new(&db, &mailer, &config)
            .submit(&payload(json!({ "name": "Ada", "email": "ada@x.com", "message": "Help" })))
            .await
            .unwrap();

        assert!(receipt.notifications.all_delivered());
        assert!(!receipt.report.resolved);
        assert!(receipt.report.created_at >= before);

        let reports = db.reports.lock().unwrap();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].name, "Ada");
        assert_eq!(reports[0].email, "ada@x.com");
        assert_eq!(reports[0].message, "Help");

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].subject, ADMIN_NOTIFICATION_SUBJECT);
        assert_eq!(sent[0].to, vec![config.mail.admin_recipient.clone()]);
        assert_eq!(sent[0].from, config.mail.from);
        assert!(sent[0].html_body.contains("ada@x.com"));
        assert!(sent[0].html_body.contains("Help"));
        assert_eq!(sent[1].subject, SUBMITTER_CONFIRMATION_SUBJECT);
        assert_eq!(sent[1].to, vec!["ada@x.com".to_string()]);
        assert!(sent[1].html_body.contains("Hi Ada,"));
        assert!(sent[1].html_body.contains("Help"));
    }

    #[tokio::test]
    async fn unconfigured_mail_still_accepts_reports() {
        let db = MockDb::default();
        let mut config = test_config();
        config.mail.provider = crate::config::EmailProvider::Sendgrid;
        config.mail.missing = vec!["SENDGRID_API_KEY"];
        let mailer = PluggableMailer::from_settings(&config.mail, &reqwest::Client::new());

        let receipt = SupportDesk::new(&db, &mailer, &config)
            .submit(&payload(json!({ "name": "Ada", "email": "ada@x.com", "message": "Help" })))
            .await
            .unwrap();

        assert!(matches!(receipt.notifications.admin, Err(MailError::MissingConfig(_))));
        assert!(matches!(receipt.notifications.submitter, Err(MailError::MissingConfig(_))));
        assert_eq!(db.reports.lock().unwrap().len(), 1);

        config.support_strict_email = true;
        let err = SupportDesk::new(&db, &mailer, &config)
            .submit(&payload(json!({ "name": "Bo", "email": "bo@x.com", "message": "Hi" })))
            .await
            .unwrap_err();
        assert!(matches!(err, SupportError::Delivery { report_id: 2, .. }));
        assert_eq!(db.reports.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delivery_failure_keeps_the_report_and_still_succeeds() {
        let db = MockDb::default();
        let mailer = MockMailer::failing();
        let config = test_config();

        let receipt = SupportDesk::new(&db, &mailer, &config)
            .submit(&payload(json!({ "name": "Ada", "email": "ada@x.com", "message": "Help" })))
            .await
            .unwrap();

        assert!(!receipt.notifications.all_delivered());
        assert_eq!(db.reports.lock().unwrap().len(), 1);
        assert_eq!(mailer.attempted.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn admin_failure_does_not_skip_confirmation() {
        let db = MockDb::default();
        let config = test_config();
        let mailer = MockMailer {
            fail_recipient: Some(config.mail.admin_recipient.clone()),
            ..Default::default()
        };

        let receipt = SupportDesk::new(&db, &mailer, &config)
            .submit(&payload(json!({ "name": "Ada", "email": "ada@x.com", "message": "Help" })))
            .await
            .unwrap();

        assert!(receipt.notifications.admin.is_err());
        assert!(receipt.notifications.submitter.is_ok());
        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, SUBMITTER_CONFIRMATION_SUBJECT);
    }

    #[tokio::test]
    async fn strict_policy_reports_delivery_failure_after_persisting() {
        let db = MockDb::default();
        let mailer = MockMailer::failing();
        let mut config = test_config();
        config.support_strict_email = true;

        let err = SupportDesk::new(&db, &mailer, &config)
            .submit(&payload(json!({ "name": "Ada", "email": "ada@x.com", "message": "Help" })))
            .await
            .unwrap_err();

        assert!(matches!(err, SupportError::Delivery { report_id: 1, .. }));
        assert_eq!(db.reports.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn invalid_submission_has_no_side_effects() {
        let db = MockDb::default();
        let mailer = MockMailer::default();
        let config = test_config();

        let err = SupportDesk::new(&db, &mailer, &config)
            .submit(&payload(json!({ "name": "", "email": "a@x.com", "message": "Help" })))
            .await
            .unwrap_err();

        assert!(matches!(err, SupportError::Validation { field: "name" }));
        assert!(db.reports.lock().unwrap().is_empty());
        assert!(mailer.attempted.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn persistence_failure_skips_notifications() {
        let db = MockDb::failing();
        let mailer = MockMailer::default();
        let config = test_config();

        let err = SupportDesk::new(&db, &mailer, &config)
            .submit(&payload(json!({ "name": "Ada", "email": "ada@x.com", "message": "Help" })))
            .await
            .unwrap_err();

        assert!(matches!(err, SupportError::Persistence(_)));
        assert!(mailer.attempted.lock().unwrap().is_empty());
    }
}
