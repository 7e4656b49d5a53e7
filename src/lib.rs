//! An ephemeral, in-process SAML 2.0 Identity Provider for tests.
//!
//! The IdP publishes metadata describing a single HTTP-POST SSO endpoint and
//! answers every AuthnRequest with a pre-configured SAML response, without
//! authenticating anyone. It is meant to stand in for a real IdP while
//! exercising a Service Provider's SSO flow.
//!
//! ```no_run
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use in_memory_idp::InMemoryIdp;
//!
//! let mut idp = InMemoryIdp::builder()
//!     .entity_id("https://idp.test")
//!     .port(8443)
//!     .build()?;
//! idp.start().await?;
//!
//! let metadata = idp.metadata()?;
//! // Import `metadata` into the SP under test, then drive its login flow.
//! # let _ = metadata;
//! idp.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod idp;
#[cfg(feature = "server")]
pub mod observability;
pub mod routes;
pub mod saml;

pub use config::{BuildError, IdpConfig, IdpConfigBuilder};
pub use idp::{AppState, IdpError, InMemoryIdp, InMemoryIdpBuilder};
pub use saml::{SerializationError, UnmarshalError, XmlCodec};

#[cfg(test)]
mod tests;
