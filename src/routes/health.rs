//! Liveness endpoint.

use axum::response::IntoResponse;
use http::StatusCode;

/// Returns 200 with an empty body while the server is up.
#[tracing::instrument(name = "health.liveness")]
pub async fn liveness() -> impl IntoResponse {
    StatusCode::OK
}
