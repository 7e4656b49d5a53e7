//! Signing certificate provider.
//!
//! The IdP advertises a signing key in its metadata even though it never
//! signs anything. Callers may supply their own Base64 DER certificate;
//! otherwise a throwaway self-signed one is generated.

use base64::{Engine, engine::general_purpose::STANDARD};
use chrono::{Duration, Utc};
use openssl::{
    asn1::Asn1Time,
    bn::BigNum,
    error::ErrorStack,
    hash::MessageDigest,
    pkey::PKey,
    rsa::Rsa,
    x509::{X509Builder, X509Name, X509NameBuilder},
};

const RSA_KEY_BITS: u32 = 2048;
const ISSUER_CN: &str = "in-memory-idp";
const SUBJECT_DC: &str = "whatever";

#[derive(Debug, thiserror::Error)]
pub enum CertificateError {
    #[error("Failed to generate signing certificate: {0}")]
    Crypto(#[from] ErrorStack),
}

/// Resolve the IdP signing certificate.
///
/// A non-empty `existing` value is returned unchanged; it is not checked
/// for being a well-formed certificate.
pub fn provide_certificate(existing: Option<&str>) -> Result<String, CertificateError> {
    match existing {
        Some(certificate) if !certificate.is_empty() => Ok(certificate.to_string()),
        _ => generate_signing_certificate(),
    }
}

/// Generate a self-signed X.509v3 certificate over a fresh RSA-2048 key.
///
/// Returns the Base64 encoding of the DER bytes (no PEM armor). The private
/// key is dropped before returning.
pub fn generate_signing_certificate() -> Result<String, CertificateError> {
    let rsa = Rsa::generate(RSA_KEY_BITS)?;
    let private_key = PKey::from_rsa(rsa)?;

    let issuer = single_entry_name("CN", ISSUER_CN)?;
    let subject = single_entry_name("DC", SUBJECT_DC)?;

    let now = Utc::now();
    let serial = BigNum::from_dec_str(&now.timestamp_millis().to_string())?;
    let not_before = Asn1Time::from_unix((now - Duration::days(1)).timestamp())?;
    let not_after = Asn1Time::from_unix((now + Duration::days(365)).timestamp())?;

    let mut builder = X509Builder::new()?;
    builder.set_version(2)?;
    let serial = serial.to_asn1_integer()?;
    builder.set_serial_number(&serial)?;
    builder.set_issuer_name(&issuer)?;
    builder.set_subject_name(&subject)?;
    builder.set_pubkey(&private_key)?;
    builder.set_not_before(&not_before)?;
    builder.set_not_after(&not_after)?;
    builder.sign(&private_key, MessageDigest::sha256())?;

    let der = builder.build().to_der()?;

    tracing::debug!(der_len = der.len(), "Generated self-signed IdP signing certificate");

    Ok(STANDARD.encode(der))
}

fn single_entry_name(field: &str, value: &str) -> Result<X509Name, ErrorStack> {
    let mut name = X509NameBuilder::new()?;
    name.append_entry_by_text(field, value)?;
    Ok(name.build())
}
