//! Server-side rendering for pages, admin views and notification emails.
//!
//! Templates are embedded at compile time so the binary does not depend on the
//! working directory.

use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use minijinja::{Environment, Error};
use once_cell::sync::Lazy;
use serde::Serialize;
use tracing::error;

const TEMPLATE_SOURCES: &[(&str, &str)] = &[
    ("base.html", include_str!("../templates/base.html")),
    ("index.html", include_str!("../templates/index.html")),
    ("home.html", include_str!("../templates/home.html")),
    ("about.html", include_str!("../templates/about.html")),
    ("explore.html", include_str!("../templates/explore.html")),
    ("login.html", include_str!("../templates/login.html")),
    ("profile.html", include_str!("../templates/profile.html")),
    ("messages.html", include_str!("../templates/messages.html")),
    ("subject.html", include_str!("../templates/subject.html")),
    ("support.html", include_str!("../templates/support.html")),
    ("admin-login.html", include_str!("../templates/admin-login.html")),
    (
        "admin-dashboard.html",
        include_str!("../templates/admin-dashboard.html"),
    ),
    (
        "admin-support.html",
        include_str!("../templates/admin-support.html"),
    ),
    (
        "email/admin_notification.html",
        include_str!("../templates/email/admin_notification.html"),
    ),
    (
        "email/submitter_confirmation.html",
        include_str!("../templates/email/submitter_confirmation.html"),
    ),
];

/// `2026-10-18T09:30:00Z` -> `2026-10-18 09:30`.
fn short_datetime(value: String) -> String {
    let trimmed: String = value.chars().take(16).collect();
    trimmed.replacen('T', " ", 1)
}

static ENV: Lazy<Environment<'static>> = Lazy::new(|| {
    let mut env = Environment::new();
    env.add_filter("short_datetime", short_datetime);

    for (name, source) in TEMPLATE_SOURCES {
        if let Err(err) = env.add_template(*name, *source) {
            error!(template = %name, error = %err, "failed to compile template");
        }
    }

    env
});

pub fn render<S: Serialize>(name: &str, ctx: S) -> Result<String, Error> {
    ENV.get_template(name)?.render(ctx)
}

/// Renders an HTML page, turning template failures into a logged 500.
pub fn render_page<S: Serialize>(name: &str, ctx: S) -> Response {
    render_page_with_status(StatusCode::OK, name, ctx)
}

pub fn render_page_with_status<S: Serialize>(status: StatusCode, name: &str, ctx: S) -> Response {
    match render(name, ctx) {
        Ok(body) => (status, Html(body)).into_response(),
        Err(err) => {
            error!(template = %name, error = %err, "failed to render template");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Something went wrong rendering this page",
            )
                .into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minijinja::context;

    #[test]
    fn all_templates_compile() {
        for (name, _) in TEMPLATE_SOURCES {
            assert!(ENV.get_template(name).is_ok(), "template {name} failed");
        }
    }

    #[test]
    fn html_templates_escape_user_input() {
        let body = render(
            "email/admin_notification.html",
            context! {
                name => "<script>alert(1)</script>",
                email => "ada@example.com",
                message => "Help & thanks",
            },
        )
        .unwrap();

        assert!(!body.contains("<script>"));
        assert!(body.contains("&lt;script&gt;"));
        assert!(body.contains("Help &amp; thanks"));
    }

    #[test]
    fn formats_timestamps_for_tables() {
        assert_eq!(
            short_datetime("2026-10-18T09:30:12.5Z".to_string()),
            "2026-10-18 09:30"
        );
        assert_eq!(short_datetime("n/a".to_string()), "n/a");
    }

    #[test]
    fn missing_template_is_a_server_error() {
        let resp = render_page("does-not-exist.html", context! {});
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
