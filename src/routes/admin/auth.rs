use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use axum_extra::extract::cookie::CookieJar;
use minijinja::context;
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tracing::{error, info, warn};

use crate::{
    config::AdminCredentials,
    session::{expired_session_cookie, session_cookie, session_id_from_headers, SessionData},
    state::AppState,
    templates::{render_page, render_page_with_status},
};

use super::LOGIN_PATH;

pub const DASHBOARD_PATH: &str = "/admin/dashboard";

#[derive(Debug, Default, Deserialize)]
pub struct AdminLoginForm {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Both fields are compared even when the first one already mismatches.
pub fn credentials_match(configured: &AdminCredentials, username: &str, password: &str) -> bool {
    let (Some(expected_user), Some(expected_pass)) = (&configured.username, &configured.password)
    else {
        return false;
    };

    let user_ok = expected_user.as_bytes().ct_eq(username.as_bytes());
    let pass_ok = expected_pass.as_bytes().ct_eq(password.as_bytes());
    (user_ok & pass_ok).unwrap_u8() == 1
}

/// Python `str.title`: a cased character following another cased character is
/// lowercased, any other cased character is title-cased. Uncased characters
/// (digits, punctuation, CJK) end a word, so `"admin1x"` becomes `"Admin1X"`.
/// Title case is approximated as the first uppercase char followed by the rest
/// lowercased, which gives `"ß"` -> `"Ss"`.
pub fn title_case(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut previous_is_cased = false;

    for ch in input.chars() {
        if !(ch.is_uppercase() || ch.is_lowercase()) {
            out.push(ch);
            previous_is_cased = false;
            continue;
        }

        if previous_is_cased {
            out.extend(ch.to_lowercase());
        } else {
            let mut upper = ch.to_uppercase();
            if let Some(first) = upper.next() {
                out.push(first);
            }
            out.extend(upper.flat_map(char::to_lowercase));
        }
        previous_is_cased = true;
    }

    out
}

pub async fn login_page() -> Response {
    render_page("admin-login.html", context! {})
}

pub async fn handle_login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<AdminLoginForm>,
) -> Response {
    let username = form.username.unwrap_or_default();
    let password = form.password.unwrap_or_default();

    if !credentials_match(&state.config.admin, &username, &password) {
        warn!("rejected admin login attempt");
        return render_page("admin-login.html", context! { error => "Invalid admin credentials" });
    }

    let data = SessionData::admin(title_case(&username), state.config.session_ttl_hours);
    let session_id = match state.sessions.create(data).await {
        Ok(id) => id,
        Err(err) => {
            error!(error = ?err, "failed to create admin session");
            return render_page_with_status(
                StatusCode::INTERNAL_SERVER_ERROR,
                "admin-login.html",
                context! { error => "Could not sign you in. Please try again." },
            );
        }
    };

    info!(%session_id, "admin signed in");
    let jar = jar.add(session_cookie(&state.config, session_id));
    (jar, Redirect::to(DASHBOARD_PATH)).into_response()
}

pub async fn handle_logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(session_id) = session_id_from_headers(&state.config, &headers) {
        match state.sessions.delete(session_id).await {
            Ok(_) => info!(%session_id, "admin signed out"),
            Err(err) => error!(%session_id, error = ?err, "failed to delete admin session"),
        }
    }

    let jar = CookieJar::new().add(expired_session_cookie(&state.config));
    (jar, Redirect::to(LOGIN_PATH)).into_response()
}
