//! SAML 2.0 IdP metadata.
//!
//! Builds the `EntityDescriptor` an SP imports to learn where to send
//! AuthnRequests and which certificate the IdP signs with.

use samael::{
    key_info::{KeyInfo, X509Data},
    metadata::{Endpoint, EntityDescriptor, IdpSsoDescriptor, KeyDescriptor},
};

use super::{
    HTTP_POST_BINDING, PROTOCOL_NS, SerializationError,
    xml::{ElementKind, XmlCodec},
};
use crate::config::IdpConfig;

/// Builds IdP metadata from an [`IdpConfig`].
pub struct MetadataBuilder<'a> {
    codec: &'a XmlCodec,
}

impl<'a> MetadataBuilder<'a> {
    pub fn new(codec: &'a XmlCodec) -> Self {
        Self { codec }
    }

    /// Build and serialize the metadata document.
    ///
    /// Nothing is cached; the same config always yields the same bytes.
    pub fn build(&self, config: &IdpConfig) -> Result<String, SerializationError> {
        let descriptor = self.entity_descriptor(config)?;
        self.codec.marshal(&descriptor)
    }

    /// Build the metadata object tree without serializing it.
    pub fn entity_descriptor(
        &self,
        config: &IdpConfig,
    ) -> Result<EntityDescriptor, SerializationError> {
        self.codec.require_builder(ElementKind::EntityDescriptor)?;

        let key_descriptor = KeyDescriptor {
            key_use: Some("signing".to_string()),
            key_info: KeyInfo {
                id: None,
                x509_data: Some(X509Data {
                    certificates: vec![config.signing_certificate().to_string()],
                }),
            },
            encryption_methods: None,
        };

        let idp_descriptor = IdpSsoDescriptor {
            protocol_support_enumeration: Some(PROTOCOL_NS.to_string()),
            key_descriptors: vec![key_descriptor],
            want_authn_requests_signed: None,
            single_sign_on_services: vec![Endpoint {
                binding: HTTP_POST_BINDING.to_string(),
                location: config.sso_url(),
                response_location: None,
            }],
            id: None,
            valid_until: None,
            cache_duration: None,
            error_url: None,
            signature: None,
            organization: None,
            contact_people: vec![],
            artifact_resolution_service: vec![],
            manage_name_id_services: vec![],
            name_id_mapping_services: vec![],
            assertion_id_request_services: vec![],
            attribute_profiles: vec![],
            attributes: vec![],
            single_logout_services: vec![],
            name_id_formats: vec![],
        };

        Ok(EntityDescriptor {
            entity_id: Some(config.entity_id().to_string()),
            idp_sso_descriptors: Some(vec![idp_descriptor]),
            ..EntityDescriptor::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    fn config(entity_id: &str, port: u16, certificate: &str) -> IdpConfig {
        IdpConfig::builder()
            .entity_id(entity_id)
            .port(port)
            .signing_certificate(certificate)
            .saml_response_xml("<samlp:Response/>")
            .build(&XmlCodec::new())
            .unwrap()
    }

    #[rstest]
    #[case("http://in-memory-idp", 8080, "someCertificate")]
    #[case("someEntityID", 8000, "MIICpDCCAYwCCQCqhQ5lgj5e6TANBgkqhkiG9w0BAQsFADAU")]
    #[case("https://sp-test", 8443, "Zm9vYmFy")]
    #[case("urn:example:idp", 1, "c29tZS1jZXJ0aWZpY2F0ZQ==")]
    fn test_metadata_round_trips(
        #[case] entity_id: &str,
        #[case] port: u16,
        #[case] certificate: &str,
    ) {
        let codec = XmlCodec::new();
        let xml = MetadataBuilder::new(&codec)
            .build(&config(entity_id, port, certificate))
            .unwrap();

        let parsed = codec.unmarshal_metadata(&xml).unwrap();
        assert_eq!(parsed.entity_id.as_deref(), Some(entity_id));

        let idp = parsed
            .idp_sso_descriptors
            .as_ref()
            .and_then(|d| d.first())
            .expect("IDPSSODescriptor");
        assert_eq!(
            idp.protocol_support_enumeration.as_deref(),
            Some(PROTOCOL_NS)
        );

        let sso = idp.single_sign_on_services.first().expect("SSO service");
        assert_eq!(sso.binding, HTTP_POST_BINDING);
        assert_eq!(sso.location, format!("http://localhost:{port}/sso"));

        let signing = idp
            .key_descriptors
            .iter()
            .find(|kd| kd.key_use.as_deref() == Some("signing"))
            .expect("signing key descriptor");
        let x509 = signing.key_info.x509_data.as_ref().expect("X509Data");
        assert_eq!(x509.certificates, vec![certificate.to_string()]);
    }

    #[test]
    fn test_metadata_is_deterministic() {
        let codec = XmlCodec::new();
        let config = config("someEntityID", 8000, "someCertificate");
        let builder = MetadataBuilder::new(&codec);

        assert_eq!(builder.build(&config).unwrap(), builder.build(&config).unwrap());
    }

    #[test]
    fn test_metadata_is_pretty_printed() {
        let codec = XmlCodec::new();
        let xml = MetadataBuilder::new(&codec)
            .build(&config("http://in-memory-idp", 8080, "CERT"))
            .unwrap();

        let mut lines = xml.lines();
        assert_eq!(
            lines.next(),
            Some(r#"<?xml version="1.0" encoding="UTF-8"?>"#)
        );
        let root = lines.next().unwrap();
        assert!(root.starts_with('<') && root.contains("EntityDescriptor"));

        let descriptor = xml
            .lines()
            .find(|line| line.contains("IDPSSODescriptor"))
            .unwrap();
        assert!(descriptor.starts_with("    <"));
        assert!(!descriptor.starts_with("     "));

        let certificate = xml
            .lines()
            .find(|line| line.contains("X509Certificate"))
            .unwrap();
        assert!(certificate.trim_start().contains(">CERT</"));
        assert!(certificate.starts_with("                "));
    }

    #[test]
    fn test_indent_follows_codec() {
        let codec = XmlCodec::new().with_indent(2);
        let xml = MetadataBuilder::new(&codec)
            .build(&config("http://in-memory-idp", 8080, "CERT"))
            .unwrap();

        let descriptor = xml
            .lines()
            .find(|line| line.contains("IDPSSODescriptor"))
            .unwrap();
        assert!(descriptor.starts_with("  <"));
        assert!(!descriptor.starts_with("   "));
    }

    #[test]
    fn test_entity_id_is_escaped() {
        let codec = XmlCodec::new();
        let xml = MetadataBuilder::new(&codec)
            .build(&config("https://idp.example.com/?a=1&b=\"2\"", 8080, "CERT"))
            .unwrap();

        assert!(xml.contains("a=1&amp;b=&quot;2&quot;"));
        let parsed = codec.unmarshal_metadata(&xml).unwrap();
        assert_eq!(
            parsed.entity_id.as_deref(),
            Some("https://idp.example.com/?a=1&b=\"2\"")
        );
    }

    #[test]
    fn test_missing_builder_is_serialization_error() {
        let config = config("someEntityID", 8000, "someCertificate");
        let codec = XmlCodec::empty().register_marshaller(ElementKind::EntityDescriptor);

        let err = MetadataBuilder::new(&codec).build(&config).unwrap_err();
        assert!(matches!(
            err,
            SerializationError::MissingBuilder(ElementKind::EntityDescriptor)
        ));
    }

    #[test]
    fn test_missing_marshaller_is_serialization_error() {
        let config = config("someEntityID", 8000, "someCertificate");
        let codec = XmlCodec::empty().register_builder(ElementKind::EntityDescriptor);

        let err = MetadataBuilder::new(&codec).build(&config).unwrap_err();
        assert!(matches!(
            err,
            SerializationError::MissingMarshaller(ElementKind::EntityDescriptor)
        ));
    }
}
