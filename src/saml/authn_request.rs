//! Inbound `samlp:AuthnRequest`.
//!
//! Only the attributes of the root element are read. Child elements,
//! signatures and unknown attributes are skipped, and no attribute is
//! required, so requests from SPs that omit `ID` or `IssueInstant` still
//! reach the handler.

use serde::Deserialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct AuthnRequest {
    #[serde(rename = "@ID")]
    pub id: Option<String>,
    #[serde(rename = "@Version")]
    pub version: Option<String>,
    #[serde(rename = "@IssueInstant")]
    pub issue_instant: Option<String>,
    #[serde(rename = "@Destination")]
    pub destination: Option<String>,
    #[serde(rename = "@AssertionConsumerServiceURL")]
    pub assertion_consumer_service_url: Option<String>,
    #[serde(rename = "@ProtocolBinding")]
    pub protocol_binding: Option<String>,
}
