use axum::{http::StatusCode, response::IntoResponse, Json};
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize)]
pub struct JsonResponse {
    pub status: String,
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    fn build(status: StatusCode, success: bool, msg: &str) -> impl IntoResponse {
        (
            status,
            Json(JsonResponse {
                status: if success { "success" } else { "error" }.to_string(),
                success,
                message: msg.to_string(),
            }),
        )
    }

    pub fn success(msg: &str) -> impl IntoResponse {
        Self::build(StatusCode::OK, true, msg)
    }

    pub fn bad_request(msg: &str) -> impl IntoResponse {
        Self::build(StatusCode::BAD_REQUEST, false, msg)
    }

    pub fn server_error(msg: &str) -> impl IntoResponse {
        Self::build(StatusCode::INTERNAL_SERVER_ERROR, false, msg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn decode(resp: impl IntoResponse) -> (StatusCode, JsonResponse) {
        let resp = resp.into_response();
        let status = resp.status();
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn envelopes_carry_status_and_success_flag() {
        let (status, json) = decode(JsonResponse::success("Support report submitted")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!((json.status.as_str(), json.success), ("success", true));
        assert_eq!(json.message, "Support report submitted");

        for (resp, expected) in [
            (
                JsonResponse::bad_request("Missing required field: email").into_response(),
                StatusCode::BAD_REQUEST,
            ),
            (
                JsonResponse::server_error("database unavailable").into_response(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ] {
            let (status, json) = decode(resp).await;
            assert_eq!(status, expected);
            assert_eq!((json.status.as_str(), json.success), ("error", false));
        }
    }
}
