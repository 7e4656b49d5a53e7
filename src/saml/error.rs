use thiserror::Error;

use super::xml::ElementKind;

/// Failure to build or marshal an XML object.
///
/// Raised when the codec has no builder or marshaller registered for an
/// element, or when writing the document fails. It signals a broken codec
/// setup rather than bad input, so callers surface it instead of retrying.
#[derive(Debug, Error)]
pub enum SerializationError {
    #[error("Unable to serialize XML. Builder to construct {0} is missing.")]
    MissingBuilder(ElementKind),

    #[error("Unable to serialize XML. Marshaller to serialize {0} is missing.")]
    MissingMarshaller(ElementKind),

    #[error("Unable to serialize XML. {0}")]
    Marshal(String),
}

/// Failure to read an inbound XML document into a SAML object.
#[derive(Debug, Error)]
pub enum UnmarshalError {
    #[error("Unmarshaller for {0} is missing")]
    MissingUnmarshaller(ElementKind),

    #[error("Malformed XML: {0}")]
    Malformed(String),

    #[error("Document has no root element")]
    EmptyDocument,

    #[error("Expected {expected} but found {found}")]
    UnexpectedElement { expected: ElementKind, found: String },

    #[error("Failed to unmarshal {kind}: {message}")]
    Unmarshal { kind: ElementKind, message: String },
}
