//! IdP metadata endpoint.

use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use http::{StatusCode, header};

use crate::{idp::AppState, saml::MetadataBuilder};

/// Media type registered for SAML metadata documents.
pub const METADATA_CONTENT_TYPE: &str = "application/samlmetadata+xml";

#[tracing::instrument(name = "metadata.get", skip_all)]
pub async fn metadata(State(state): State<AppState>) -> Response {
    match MetadataBuilder::new(&state.codec).build(&state.config) {
        Ok(xml) => ([(header::CONTENT_TYPE, METADATA_CONTENT_TYPE)], xml).into_response(),
        Err(error) => {
            tracing::error!(error = %error, "Failed to serialize IdP metadata");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
