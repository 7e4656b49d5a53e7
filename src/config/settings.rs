use std::{
    net::{IpAddr, Ipv4Addr},
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use super::{ConfigError, DEFAULT_ENTITY_ID, DEFAULT_PORT, ObservabilityConfig, expand_env_vars};
use crate::idp::InMemoryIdpBuilder;

/// Root configuration for the standalone server.
///
/// All sections are optional; an empty file runs the IdP with defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdpSettings {
    /// IdP identity and listener.
    #[serde(default)]
    pub idp: IdpSection,

    /// Observability configuration (logging).
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IdpSection {
    #[serde(default = "default_entity_id")]
    pub entity_id: String,

    /// Address to bind. Metadata always advertises `localhost`.
    #[serde(default = "default_host")]
    pub host: IpAddr,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Inline Base64 DER signing certificate.
    #[serde(default)]
    pub signing_certificate: Option<String>,

    /// File holding the signing certificate, PEM or bare Base64.
    #[serde(default)]
    pub signing_certificate_path: Option<PathBuf>,

    /// File holding a canned SAML response XML.
    #[serde(default)]
    pub saml_response_path: Option<PathBuf>,
}

impl Default for IdpSection {
    fn default() -> Self {
        Self {
            entity_id: default_entity_id(),
            host: default_host(),
            port: default_port(),
            signing_certificate: None,
            signing_certificate_path: None,
            saml_response_path: None,
        }
    }
}

fn default_entity_id() -> String {
    DEFAULT_ENTITY_ID.to_string()
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::LOCALHOST)
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

impl IdpSettings {
    /// Load settings from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = read(path.as_ref())?;
        Self::from_str(&contents)
    }

    /// Parse settings from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        let settings: IdpSettings = toml::from_str(&expanded)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.idp.entity_id.trim().is_empty() {
            return Err(ConfigError::Validation(
                "idp.entity_id must not be empty".into(),
            ));
        }
        if self.idp.signing_certificate.is_some() && self.idp.signing_certificate_path.is_some() {
            return Err(ConfigError::Validation(
                "idp.signing_certificate and idp.signing_certificate_path are mutually exclusive"
                    .into(),
            ));
        }
        Ok(())
    }

    /// Turn the settings into an IdP builder, reading any referenced files.
    pub fn idp_builder(&self) -> Result<InMemoryIdpBuilder, ConfigError> {
        let idp = &self.idp;
        let mut builder = crate::InMemoryIdp::builder()
            .entity_id(idp.entity_id.clone())
            .port(idp.port)
            .host(idp.host);

        if let Some(certificate) = &idp.signing_certificate {
            builder = builder.signing_certificate(certificate.trim());
        } else if let Some(path) = &idp.signing_certificate_path {
            builder = builder.signing_certificate(strip_pem_armor(&read(path)?));
        }

        if let Some(path) = &idp.saml_response_path {
            builder = builder.saml_response_xml(read(path)?);
        }

        Ok(builder)
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e, path.to_path_buf()))
}

/// Strip `-----BEGIN/END ...-----` lines and whitespace, leaving the Base64 body.
fn strip_pem_armor(contents: &str) -> String {
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.starts_with("-----"))
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use base64::{Engine, engine::general_purpose::STANDARD};

    use super::*;
    use crate::config::{LogFormat, LogLevel};

    #[test]
    fn test_empty_settings_use_defaults() {
        let settings = IdpSettings::from_str("").unwrap();

        assert_eq!(settings.idp.entity_id, "http://in-memory-idp");
        assert_eq!(settings.idp.port, 8080);
        assert_eq!(settings.idp.host, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert!(settings.idp.signing_certificate.is_none());
        assert_eq!(settings.observability.logging.format, LogFormat::Compact);
    }

    #[test]
    fn test_full_settings() {
        let settings = IdpSettings::from_str(
            r#"
            [idp]
            entity_id = "https://sp-test"
            host = "0.0.0.0"
            port = 8443
            signing_certificate = "someCertificate"

            [observability.logging]
            level = "debug"
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(settings.idp.entity_id, "https://sp-test");
        assert_eq!(settings.idp.host, IpAddr::V4(Ipv4Addr::UNSPECIFIED));
        assert_eq!(settings.idp.port, 8443);
        assert_eq!(
            settings.idp.signing_certificate.as_deref(),
            Some("someCertificate")
        );
        assert_eq!(settings.observability.logging.level, LogLevel::Debug);
        assert_eq!(settings.observability.logging.format, LogFormat::Json);
    }

    #[test]
    fn test_env_vars_expanded() {
        temp_env::with_var("IDP_SETTINGS_TEST_PORT", Some("9100"), || {
            let settings = IdpSettings::from_str(
                r#"
                [idp]
                port = ${IDP_SETTINGS_TEST_PORT}
                "#,
            )
            .unwrap();
            assert_eq!(settings.idp.port, 9100);
        });
    }

    #[test]
    fn test_unknown_field_rejected() {
        let err = IdpSettings::from_str(
            r#"
            [idp]
            entityId = "camel"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_empty_entity_id_rejected() {
        let err = IdpSettings::from_str(
            r#"
            [idp]
            entity_id = "  "
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_inline_and_path_certificate_rejected() {
        let err = IdpSettings::from_str(
            r#"
            [idp]
            signing_certificate = "abc"
            signing_certificate_path = "/tmp/cert.pem"
            "#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = IdpSettings::from_file("/nonexistent/in-memory-idp.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_, path) if path.ends_with("in-memory-idp.toml")));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[idp]\nentity_id = \"from-file\"").unwrap();

        let settings = IdpSettings::from_file(file.path()).unwrap();
        assert_eq!(settings.idp.entity_id, "from-file");
    }

    #[test]
    fn test_strip_pem_armor() {
        let pem = "-----BEGIN CERTIFICATE-----\nMIIB\nAAAA\n-----END CERTIFICATE-----\n";
        assert_eq!(strip_pem_armor(pem), "MIIBAAAA");
        assert_eq!(strip_pem_armor("  Zm9v  \n"), "Zm9v");
    }

    #[test]
    fn test_idp_builder_reads_files() {
        let dir = tempfile::tempdir().unwrap();
        let cert_path = dir.path().join("idp.pem");
        let response_path = dir.path().join("response.xml");
        std::fs::write(
            &cert_path,
            "-----BEGIN CERTIFICATE-----\nQ0VSVA==\n-----END CERTIFICATE-----\n",
        )
        .unwrap();
        std::fs::write(&response_path, "<samlp:Response ID=\"_file\"/>").unwrap();

        let settings = IdpSettings {
            idp: IdpSection {
                signing_certificate_path: Some(cert_path),
                saml_response_path: Some(response_path),
                ..Default::default()
            },
            ..Default::default()
        };

        let idp = settings.idp_builder().unwrap().build().unwrap();
        assert_eq!(idp.config().signing_certificate(), "Q0VSVA==");

        let response = STANDARD.decode(idp.config().saml_response()).unwrap();
        assert_eq!(response, b"<samlp:Response ID=\"_file\"/>");
    }

    #[test]
    fn test_idp_builder_missing_response_file() {
        let settings = IdpSettings {
            idp: IdpSection {
                signing_certificate: Some("someCertificate".into()),
                saml_response_path: Some(PathBuf::from("/nonexistent/response.xml")),
                ..Default::default()
            },
            ..Default::default()
        };

        assert!(matches!(
            settings.idp_builder(),
            Err(ConfigError::Io(_, _))
        ));
    }
}
