//! HTTP-POST binding SSO endpoint.
//!
//! Accepts an AuthnRequest in the `SAMLRequest` form field and answers with
//! an auto-submitting HTML form that posts the configured response to the
//! request's AssertionConsumerServiceURL. No user is authenticated and the
//! request's signature, destination and issuer are not checked.

use axum::{
    Form,
    extract::{State, rejection::FormRejection},
    response::{Html, IntoResponse, Response},
};
use http::{StatusCode, header};
use quick_xml::escape::escape;
use serde::Deserialize;

use crate::{idp::AppState, saml::UnmarshalError};

/// Form body posted to `/sso`.
///
/// The field carries raw AuthnRequest XML, not Base64.
#[derive(Debug, Deserialize)]
pub struct SsoForm {
    #[serde(rename = "SAMLRequest")]
    pub saml_request: Option<String>,
}

/// Every way an SSO request can be unusable.
///
/// All variants answer 400 with an empty body.
#[derive(Debug, thiserror::Error)]
pub enum SsoError {
    #[error("Invalid form body: {0}")]
    Form(#[from] FormRejection),

    #[error("SAMLRequest form field is missing")]
    MissingRequest,

    #[error("Invalid AuthnRequest: {0}")]
    Unmarshal(#[from] UnmarshalError),

    #[error("AuthnRequest has no AssertionConsumerServiceURL")]
    MissingAcsUrl,
}

impl IntoResponse for SsoError {
    fn into_response(self) -> Response {
        tracing::debug!(error = %self, "Rejecting SSO request");
        StatusCode::BAD_REQUEST.into_response()
    }
}

#[tracing::instrument(name = "sso.post", skip_all)]
pub async fn sso(
    State(state): State<AppState>,
    form: Result<Form<SsoForm>, FormRejection>,
) -> Result<Response, SsoError> {
    let Form(form) = form?;
    let xml = form.saml_request.ok_or(SsoError::MissingRequest)?;

    let request = state.codec.unmarshal_authn_request(&xml)?;
    let acs_url = request
        .assertion_consumer_service_url
        .filter(|url| !url.is_empty())
        .ok_or(SsoError::MissingAcsUrl)?;

    tracing::info!(acs_url = %acs_url, "Answering AuthnRequest");

    let html = render_post_form(&acs_url, state.config.saml_response());
    Ok((
        [(header::LOCATION, state.config.post_response_url())],
        Html(html),
    )
        .into_response())
}

/// Auto-submit page carrying the response to the SP.
fn render_post_form(acs_url: &str, saml_response: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html xmlns="http://www.w3.org/1999/xhtml" lang="en">
<head></head>
<body>
<form method="post" action="{action}" id="samlRequestPostForm">
    <input type="hidden" name="SAMLResponse" value="{value}">
</form>
<script>document.getElementById("samlRequestPostForm").submit();</script>
</body>
</html>
"#,
        action = escape(acs_url),
        value = escape(saml_response),
    )
}
