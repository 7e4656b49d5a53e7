use base64::{Engine, engine::general_purpose::STANDARD};

use crate::saml::{
    CertificateError, ResponseBuilder, SerializationError, XmlCodec, provide_certificate,
};

/// Entity ID used when none is configured.
pub const DEFAULT_ENTITY_ID: &str = "http://in-memory-idp";

/// Port used when none is configured.
pub const DEFAULT_PORT: u16 = 8080;

/// Immutable IdP configuration.
///
/// All derived values (SSO URL, response Base64) are computed from these
/// four fields, so two configs built from the same inputs behave the same.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdpConfig {
    entity_id: String,
    port: u16,
    signing_certificate: String,
    saml_response: String,
}

impl IdpConfig {
    pub fn builder() -> IdpConfigBuilder {
        IdpConfigBuilder::default()
    }

    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Base64 DER signing certificate advertised in metadata.
    pub fn signing_certificate(&self) -> &str {
        &self.signing_certificate
    }

    /// The response returned from `/sso`, already Base64 encoded.
    pub fn saml_response(&self) -> &str {
        &self.saml_response
    }

    /// Location of the HTTP-POST SSO endpoint.
    pub fn sso_url(&self) -> String {
        format!("http://localhost:{}/sso", self.port)
    }

    /// Value of the `Location` header sent with every SSO answer.
    pub fn post_response_url(&self) -> String {
        format!("http://localhost:{}/post-response", self.port)
    }
}

/// Fluent builder for [`IdpConfig`].
///
/// `build` borrows the builder, so one builder can produce any number of
/// independent configs.
#[derive(Debug, Clone, Default)]
pub struct IdpConfigBuilder {
    entity_id: Option<String>,
    port: Option<u16>,
    signing_certificate: Option<String>,
    saml_response_xml: Option<String>,
}

impl IdpConfigBuilder {
    pub fn entity_id(mut self, entity_id: impl Into<String>) -> Self {
        self.entity_id = Some(entity_id.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Use this Base64 DER certificate instead of generating one.
    pub fn signing_certificate(mut self, certificate: impl Into<String>) -> Self {
        self.signing_certificate = Some(certificate.into());
        self
    }

    /// Return this XML verbatim from `/sso` instead of the default response.
    pub fn saml_response_xml(mut self, xml: impl Into<String>) -> Self {
        self.saml_response_xml = Some(xml.into());
        self
    }

    pub fn build(&self, codec: &XmlCodec) -> Result<IdpConfig, BuildError> {
        let entity_id = self
            .entity_id
            .clone()
            .unwrap_or_else(|| DEFAULT_ENTITY_ID.to_string());
        let port = self.port.unwrap_or(DEFAULT_PORT);

        let signing_certificate = provide_certificate(self.signing_certificate.as_deref())?;

        let response_xml = match &self.saml_response_xml {
            Some(xml) => xml.clone(),
            None => ResponseBuilder::new(codec).build_default(&entity_id)?,
        };

        Ok(IdpConfig {
            entity_id,
            port,
            signing_certificate,
            saml_response: STANDARD.encode(response_xml.as_bytes()),
        })
    }
}

/// Failure to build an [`IdpConfig`].
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error(transparent)]
    Certificate(#[from] CertificateError),

    #[error(transparent)]
    Serialization(#[from] SerializationError),
}
