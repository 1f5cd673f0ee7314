use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use minijinja::context;
use tracing::{error, warn};

use crate::{
    responses::JsonResponse,
    services::support::{SupportDesk, SupportError, SupportPayload},
    state::AppState,
    templates::render_page,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/support", get(support_page).post(submit_support))
}

async fn support_page() -> Response {
    render_page("support.html", context! {})
}

pub async fn submit_support(
    State(state): State<AppState>,
    payload: Result<Json<SupportPayload>, JsonRejection>,
) -> Response {
    let Json(payload) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!(error = %rejection, "rejected support submission body");
            return JsonResponse::bad_request("Request body must be a JSON object").into_response();
        }
    };

    match SupportDesk::from_state(&state).submit(&payload).await {
        Ok(_) => JsonResponse::success("Support report submitted").into_response(),
        Err(err @ SupportError::Validation { .. }) => {
            JsonResponse::bad_request(&err.to_string()).into_response()
        }
        Err(SupportError::Persistence(err)) => {
            error!(error = ?err, "failed to store support report");
            JsonResponse::server_error("Could not submit your report. Please try again later.")
                .into_response()
        }
        Err(SupportError::Delivery { report_id, .. }) => {
            error!(report_id, "support report stored but notifications failed");
            JsonResponse::server_error(
                "Your report was saved but we could not send a confirmation email.",
            )
            .into_response()
        }
    }
}
