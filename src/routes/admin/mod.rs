pub mod auth;
pub mod reports;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
    Router,
};
use tracing::{debug, error};
use uuid::Uuid;

use crate::{
    session::{session_id_from_headers, SessionData},
    state::AppState,
};

pub const LOGIN_PATH: &str = "/admin/login";

/// Session of the signed-in admin, inserted by [`admin_gate`].
#[derive(Clone, Debug)]
pub struct AdminSession {
    pub session_id: Uuid,
    pub data: SessionData,
}

impl AdminSession {
    pub fn display_name(&self) -> &str {
        self.data.admin_username.as_deref().unwrap_or("Admin")
    }
}

pub fn router(state: AppState) -> Router<AppState> {
    let gated = Router::new()
        .route("/dashboard", get(reports::dashboard))
        .route("/support", get(reports::list_reports))
        .route("/support/resolve/{id}", post(reports::resolve_report))
        .route_layer(middleware::from_fn_with_state(state, admin_gate));

    Router::new()
        .route("/login", get(auth::login_page).post(auth::handle_login))
        .route("/logout", get(auth::handle_logout).post(auth::handle_logout))
        .merge(gated)
}

async fn admin_gate(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let Some(session_id) = session_id_from_headers(&state.config, req.headers()) else {
        return Redirect::to(LOGIN_PATH).into_response();
    };

    let data = match state.sessions.load(session_id).await {
        Ok(Some(data)) if data.admin_logged_in => data,
        Ok(_) => {
            debug!(%session_id, "no admin session, redirecting to login");
            return Redirect::to(LOGIN_PATH).into_response();
        }
        Err(err) => {
            error!(%session_id, error = ?err, "failed to load admin session");
            return Redirect::to(LOGIN_PATH).into_response();
        }
    };

    req.extensions_mut().insert(AdminSession { session_id, data });
    next.run(req).await
}
