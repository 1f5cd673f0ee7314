use axum::{response::Response, routing::get, Router};
use minijinja::context;

use crate::{state::AppState, templates::render_page};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(|| page("index.html")))
        .route("/home", get(|| page("home.html")))
        .route("/about", get(|| page("about.html")))
        .route("/explore", get(|| page("explore.html")))
        .route("/login", get(|| page("login.html")))
        .route("/profile", get(|| profile("self")))
        .route("/profile-friend", get(|| profile("friend")))
        .route("/profile-other", get(|| profile("other")))
        .route("/messages", get(|| page("messages.html")))
        .route("/subject-english", get(|| subject("English")))
        .route("/subject-maths", get(|| subject("Maths")))
        .route("/subject-science", get(|| subject("Science")))
}

async fn page(template: &'static str) -> Response {
    render_page(template, context! {})
}

async fn profile(variant: &'static str) -> Response {
    render_page("profile.html", context! { variant })
}

async fn subject(subject: &'static str) -> Response {
    render_page("subject.html", context! { subject })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
    };
    use std::sync::Arc;
    use tower::ServiceExt;

    use crate::{
        config::test_config, db::mock_db::MockDb, services::mailer::MockMailer,
        state::test_state,
    };

    async fn get_page(path: &str) -> (StatusCode, String) {
        let state = test_state(
            Arc::new(MockDb::default()),
            Arc::new(MockMailer::default()),
            test_config(),
        );
        let app = router().with_state(state);
        let res = app
            .oneshot(Request::get(path).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = res.status();
        let body = to_bytes(res.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn renders_every_public_page() {
        for path in [
            "/", "/home", "/about", "/explore", "/login", "/profile", "/profile-friend",
            "/profile-other", "/messages", "/subject-english", "/subject-maths", "/subject-science",
        ] {
            let (status, body) = get_page(path).await;
            assert_eq!(status, StatusCode::OK, "{path}");
            assert!(body.contains("StudyHive"), "{path}");
        }
    }

    #[tokio::test]
    async fn subject_and_profile_pages_use_their_variant() {
        let (_, body) = get_page("/subject-maths").await;
        assert!(body.contains("<h1>Maths</h1>"));

        let (_, body) = get_page("/profile-friend").await;
        assert!(body.contains("Friend profile"));
    }
}
