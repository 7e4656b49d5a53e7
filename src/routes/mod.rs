//! HTTP surface of the IdP.

pub mod health;
pub mod metadata;
pub mod sso;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};

use crate::idp::AppState;

/// Largest accepted request body.
pub const BODY_LIMIT_BYTES: usize = 1024 * 1024;

/// Build the IdP router.
pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/", get(health::liveness))
        .route("/metadata", get(metadata::metadata))
        .route("/sso", post(sso::sso))
        .layer(TraceLayer::new_for_http())
        .layer(RequestBodyLimitLayer::new(BODY_LIMIT_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use http::{Request, StatusCode, header};

    use crate::tests::{default_test_app, get, send};

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let app = default_test_app();
        let (status, _, _) = get(&app, "/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_get_sso_not_allowed() {
        let app = default_test_app();
        let (status, _, _) = get(&app, "/sso").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_oversized_body_rejected() {
        let app = default_test_app();
        let body = vec![b'a'; super::BODY_LIMIT_BYTES + 1];
        let request = Request::builder()
            .method("POST")
            .uri("/sso")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .header(header::CONTENT_LENGTH, body.len())
            .body(Body::from(body))
            .unwrap();

        let (status, _, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }
}
