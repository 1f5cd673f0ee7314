use async_trait::async_trait;

use crate::models::support_report::{NewSupportReport, SupportReport, SupportStats};

#[async_trait]
pub trait SupportReportRepository: Send + Sync {
    async fn create_report(&self, report: NewSupportReport) -> Result<SupportReport, sqlx::Error>;
    /// Every report, newest first.
    async fn list_reports(&self) -> Result<Vec<SupportReport>, sqlx::Error>;
    async fn latest_reports(&self, limit: i64) -> Result<Vec<SupportReport>, sqlx::Error>;
    async fn report_stats(&self) -> Result<SupportStats, sqlx::Error>;
    /// Marks a report resolved. Returns `false` when no report has that id.
    async fn resolve_report(&self, id: i32) -> Result<bool, sqlx::Error>;
}
