pub mod admin;
pub mod pages;
pub mod support;

use axum::{
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tower_http::services::ServeDir;

use crate::{responses::JsonResponse, state::AppState};

/// Every public and admin route, without transport layers (tracing, CORS).
pub fn app_router(state: AppState) -> Router {
    let static_dir = state.config.static_dir.clone();

    Router::new()
        .route("/health", get(health))
        .merge(pages::router())
        .merge(support::router())
        .nest("/admin", admin::router(state.clone()))
        .nest_service("/static", ServeDir::new(static_dir))
        .with_state(state)
}

async fn health() -> Response {
    JsonResponse::success("StudyHive is up").into_response()
}
