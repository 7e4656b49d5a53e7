//! SAML 2.0 identity provider core.
//!
//! This module implements the IdP side of the Web Browser SSO profile over
//! the HTTP-POST binding. It handles:
//! - Self-signed signing certificate generation
//! - `EntityDescriptor` metadata construction and serialization
//! - Default `Response` construction
//! - AuthnRequest unmarshalling
//!
//! The object model is samael's. All XML passes through an explicitly
//! constructed [`XmlCodec`] that is injected into the builders and the SSO
//! handler.

pub mod authn_request;
pub mod certificate;
mod error;
pub mod metadata;
pub mod response;
pub mod xml;

pub use authn_request::AuthnRequest;
pub use certificate::{CertificateError, provide_certificate};
pub use error::{SerializationError, UnmarshalError};
pub use metadata::MetadataBuilder;
pub use response::ResponseBuilder;
pub use xml::{ElementKind, XmlCodec};

/// SAML 2.0 protocol namespace (`samlp`).
pub const PROTOCOL_NS: &str = "urn:oasis:names:tc:SAML:2.0:protocol";

/// SAML 2.0 metadata namespace (`md`).
pub const METADATA_NS: &str = "urn:oasis:names:tc:SAML:2.0:metadata";

/// HTTP-POST binding URI.
pub const HTTP_POST_BINDING: &str = "urn:oasis:names:tc:SAML:2.0:bindings:HTTP-POST";

/// Top-level status code for a successful response.
pub const STATUS_SUCCESS: &str = "urn:oasis:names:tc:SAML:2.0:status:Success";
