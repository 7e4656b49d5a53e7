//! Consolidated test modules.
//!
//! End-to-end SSO flow tests plus small helpers shared by unit tests across
//! the crate.


use axum::{Router, body::Body};
use http::{HeaderMap, Request, StatusCode, header};
use tower::ServiceExt;

use crate::{
    config::{IdpConfig, IdpConfigBuilder},
    idp::AppState,
    routes::build_app,
    saml::XmlCodec,
};

/// Router over a config built from `builder` with a fully registered codec.
pub(crate) fn test_app(builder: IdpConfigBuilder) -> Router {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let codec = XmlCodec::new();
    let config = builder.build(&codec).unwrap();
    build_app(AppState::new(config, codec))
}

/// Router with a fixed certificate, so tests skip key generation.
pub(crate) fn default_test_app() -> Router {
    test_app(IdpConfig::builder().signing_certificate("someCertificate"))
}

/// `POST /sso` with an optional `SAMLRequest` form field.
pub(crate) fn sso_request(saml_request: Option<&str>) -> Request<Body> {
    let mut form = url::form_urlencoded::Serializer::new(String::new());
    if let Some(value) = saml_request {
        form.append_pair("SAMLRequest", value);
    }

    Request::builder()
        .method("POST")
        .uri("/sso")
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(form.finish()))
        .unwrap()
}

/// Send one request through the router and collect the response.
pub(crate) async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, String) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, headers, String::from_utf8_lossy(&body).to_string())
}

/// `GET` a path through the router.
pub(crate) async fn get(app: &Router, uri: &str) -> (StatusCode, HeaderMap, String) {
    let request = Request::builder()
        .method("GET")
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

/// The parts of a SAML `Response` the tests care about.
#[derive(Debug)]
pub(crate) struct ResponseSummary {
    pub status_code: Option<String>,
    pub assertion_issuer: Option<String>,
}

/// Parse a `Response` with the codec and pull out its status code and
/// assertion issuer.
pub(crate) fn summarize_response(xml: &str) -> ResponseSummary {
    let response = XmlCodec::new().unmarshal_response(xml).unwrap();

    ResponseSummary {
        status_code: response
            .status
            .as_ref()
            .and_then(|status| status.status_code.value.clone()),
        assertion_issuer: response
            .assertion
            .as_ref()
            .and_then(|assertion| assertion.issuer.value.clone()),
    }
}

/// A minimal but complete `samlp:AuthnRequest` as an SP would send it.
pub(crate) fn authn_request_xml(acs_url: &str) -> String {
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<samlp:AuthnRequest xmlns:samlp="urn:oasis:names:tc:SAML:2.0:protocol" xmlns:saml="urn:oasis:names:tc:SAML:2.0:assertion" ID="_a6e7f0d3c1b24e5f9a8d7c6b5a4f3e2d" Version="2.0" IssueInstant="2024-01-01T00:00:00Z" AssertionConsumerServiceURL="{acs_url}" ProtocolBinding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST">
    <saml:Issuer>https://sp-test</saml:Issuer>
</samlp:AuthnRequest>"#
    )
}

/// AuthnRequest with only the attributes some SPs send: no `ID`, no
/// `IssueInstant`, no issuer.
pub(crate) fn bare_authn_request_xml(acs_url: &str) -> String {
    format!(
        r#"<saml2p:AuthnRequest xmlns:saml2p="urn:oasis:names:tc:SAML:2.0:protocol" AssertionConsumerServiceURL="{acs_url}" ProtocolBinding="urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST" Version="2.0"/>"#
    )
}
