use crate::config::Config;
use crate::db::support_report_repository::SupportReportRepository;
use crate::services::mailer::Mailer;
use crate::session::SessionStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub reports: Arc<dyn SupportReportRepository>,
    pub sessions: Arc<dyn SessionStore>,
    pub mailer: Arc<dyn Mailer>,
    pub config: Arc<Config>,
}

#[cfg(test)]
pub fn test_state(
    reports: Arc<crate::db::mock_db::MockDb>,
    mailer: Arc<crate::services::mailer::MockMailer>,
    config: Config,
) -> AppState {
    AppState {
        reports,
        sessions: Arc::new(crate::session::MemorySessionStore::new()),
        mailer,
        config: Arc::new(config),
    }
}
