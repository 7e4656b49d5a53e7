//! Default SAML `Response`.
//!
//! When no canned response is configured the IdP answers every AuthnRequest
//! with the same minimal success response: one assertion naming the IdP as
//! issuer, no subject, no conditions, no signature.

use chrono::Utc;
use samael::schema::{Assertion, Issuer, Response, Status, StatusCode};
use uuid::Uuid;

use super::{
    STATUS_SUCCESS, SerializationError,
    xml::{ElementKind, XmlCodec},
};

const SAML_VERSION: &str = "2.0";

/// SAML IDs must be NCNames, so they cannot start with a digit.
fn new_id() -> String {
    format!("_{}", Uuid::new_v4().simple())
}

/// Builds the default response returned when none was configured.
pub struct ResponseBuilder<'a> {
    codec: &'a XmlCodec,
}

impl<'a> ResponseBuilder<'a> {
    pub fn new(codec: &'a XmlCodec) -> Self {
        Self { codec }
    }

    /// Build and serialize the default success response.
    ///
    /// Returns plain XML; Base64 encoding is left to the caller.
    pub fn build_default(&self, issuer: &str) -> Result<String, SerializationError> {
        let response = self.default_response(issuer)?;
        self.codec.marshal(&response)
    }

    /// Build the default response object tree without serializing it.
    pub fn default_response(&self, issuer: &str) -> Result<Response, SerializationError> {
        self.codec.require_builder(ElementKind::Response)?;

        let now = Utc::now();
        let assertion = Assertion {
            id: new_id(),
            issue_instant: now,
            version: SAML_VERSION.to_string(),
            issuer: Issuer {
                value: Some(issuer.to_string()),
                ..Default::default()
            },
            signature: None,
            subject: None,
            conditions: None,
            authn_statements: None,
            attribute_statements: None,
        };

        Ok(Response {
            id: new_id(),
            in_response_to: None,
            version: SAML_VERSION.to_string(),
            issue_instant: now,
            destination: None,
            consent: None,
            issuer: None,
            signature: None,
            status: Some(Status {
                status_code: StatusCode {
                    value: Some(STATUS_SUCCESS.to_string()),
                },
                status_message: None,
                status_detail: None,
            }),
            encrypted_assertion: None,
            assertion: Some(assertion),
        })
    }
}
