use async_trait::async_trait;
use std::sync::Mutex;
use time::OffsetDateTime;

use super::support_report_repository::SupportReportRepository;
use crate::models::support_report::{NewSupportReport, SupportReport, SupportStats};

/// In-memory stand-in for Postgres used by handler and service tests.
#[derive(Default)]
#[allow(dead_code)]
pub struct MockDb {
    pub reports: Mutex<Vec<SupportReport>>,
    pub should_fail: bool,
}

impl MockDb {
    pub fn failing() -> Self {
        Self {
            should_fail: true,
            ..Default::default()
        }
    }

    pub fn with_reports(reports: Vec<SupportReport>) -> Self {
        Self {
            reports: Mutex::new(reports),
            ..Default::default()
        }
    }

    fn check(&self) -> Result<(), sqlx::Error> {
        if self.should_fail {
            return Err(sqlx::Error::Protocol("Mock DB failure".into()));
        }
        Ok(())
    }

    fn newest_first(&self) -> Vec<SupportReport> {
        let mut reports = self.reports.lock().unwrap().clone();
        reports.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        reports
    }
}

#[async_trait]
impl SupportReportRepository for MockDb {
    async fn create_report(&self, report: NewSupportReport) -> Result<SupportReport, sqlx::Error> {
        self.check()?;
        let mut reports = self.reports.lock().unwrap();
        let id = reports.iter().map(|r| r.id).max().unwrap_or(0) + 1;
        let stored = SupportReport {
            id,
            name: report.name,
            email: report.email,
            message: report.message,
            resolved: false,
            created_at: OffsetDateTime::now_utc(),
        };
        reports.push(stored.clone());
        Ok(stored)
    }

    async fn list_reports(&self) -> Result<Vec<SupportReport>, sqlx::Error> {
        self.check()?;
        Ok(self.newest_first())
    }

    async fn latest_reports(&self, limit: i64) -> Result<Vec<SupportReport>, sqlx::Error> {
        self.check()?;
        let mut reports = self.newest_first();
        reports.truncate(limit.max(0) as usize);
        Ok(reports)
    }

    async fn report_stats(&self) -> Result<SupportStats, sqlx::Error> {
        self.check()?;
        let reports = self.reports.lock().unwrap();
        let resolved = reports.iter().filter(|r| r.resolved).count() as i64;
        let total = reports.len() as i64;
        Ok(SupportStats {
            total,
            unresolved: total - resolved,
            resolved,
        })
    }

    async fn resolve_report(&self, id: i32) -> Result<bool, sqlx::Error> {
        self.check()?;
        let mut reports = self.reports.lock().unwrap();
        match reports.iter_mut().find(|r| r.id == id) {
            Some(report) => {
                report.resolved = true;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
