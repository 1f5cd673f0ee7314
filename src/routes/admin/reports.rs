use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    Extension,
};
use minijinja::context;
use tracing::{error, info};

use crate::{
    state::AppState,
    templates::{render_page, render_page_with_status},
};

use super::AdminSession;

pub const LATEST_REPORTS_LIMIT: i64 = 5;
pub const SUPPORT_LIST_PATH: &str = "/admin/support";

fn database_error_page(err: sqlx::Error, action: &str) -> Response {
    error!(error = ?err, action, "admin query failed");
    render_page_with_status(
        StatusCode::INTERNAL_SERVER_ERROR,
        "admin-support.html",
        context! {
            reports => Vec::<()>::new(),
            error => "Could not load support reports. Please try again later.",
        },
    )
}

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminSession>,
) -> Response {
    let stats = match state.reports.report_stats().await {
        Ok(stats) => stats,
        Err(err) => return database_error_page(err, "report_stats"),
    };
    let latest = match state.reports.latest_reports(LATEST_REPORTS_LIMIT).await {
        Ok(reports) => reports,
        Err(err) => return database_error_page(err, "latest_reports"),
    };

    render_page(
        "admin-dashboard.html",
        context! {
            admin => admin.display_name(),
            total => stats.total,
            unresolved => stats.unresolved,
            resolved => stats.resolved,
            latest_reports => latest,
        },
    )
}

pub async fn list_reports(State(state): State<AppState>) -> Response {
    match state.reports.list_reports().await {
        Ok(reports) => render_page("admin-support.html", context! { reports }),
        Err(err) => database_error_page(err, "list_reports"),
    }
}

pub async fn resolve_report(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminSession>,
    Path(id): Path<i32>,
) -> Response {
    match state.reports.resolve_report(id).await {
        Ok(true) => info!(report_id = id, admin = admin.display_name(), "report resolved"),
        Ok(false) => info!(report_id = id, "resolve requested for unknown report"),
        Err(err) => return database_error_page(err, "resolve_report"),
    }

    Redirect::to(SUPPORT_LIST_PATH).into_response()
}
