//! XML codec shared by the metadata builder, the response builder and the
//! SSO handler.
//!
//! The codec keeps a registry of the element kinds it knows how to build,
//! marshal and unmarshal. It is constructed once at startup and handed to
//! whoever needs it, typically behind an `Arc`.

use std::{collections::BTreeSet, fmt, io::Write};

use quick_xml::{
    NsReader, Reader, Writer,
    events::{BytesDecl, BytesText, Event},
    name::{Namespace, ResolveResult},
};
use samael::{metadata::EntityDescriptor, traits::ToXml};

use super::{
    METADATA_NS, PROTOCOL_NS, SerializationError, UnmarshalError, authn_request::AuthnRequest,
};

const DEFAULT_INDENT: usize = 4;

/// Qualified name of a top-level SAML element handled by the codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElementKind {
    /// `md:EntityDescriptor`
    EntityDescriptor,
    /// `samlp:Response`
    Response,
    /// `samlp:AuthnRequest`, inbound only.
    AuthnRequest,
}

impl ElementKind {
    pub fn namespace(self) -> &'static str {
        match self {
            ElementKind::EntityDescriptor => METADATA_NS,
            ElementKind::Response | ElementKind::AuthnRequest => PROTOCOL_NS,
        }
    }

    pub fn local_name(self) -> &'static str {
        match self {
            ElementKind::EntityDescriptor => "EntityDescriptor",
            ElementKind::Response => "Response",
            ElementKind::AuthnRequest => "AuthnRequest",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}{}", self.namespace(), self.local_name())
    }
}

/// A samael object the codec knows how to marshal.
pub trait XmlObject: for<'a> ToXml<'a> {
    /// Element kind of the root element this object writes.
    const KIND: ElementKind;
}

impl XmlObject for EntityDescriptor {
    const KIND: ElementKind = ElementKind::EntityDescriptor;
}

impl XmlObject for samael::schema::Response {
    const KIND: ElementKind = ElementKind::Response;
}

/// Explicitly constructed XML codec.
#[derive(Debug, Clone)]
pub struct XmlCodec {
    builders: BTreeSet<ElementKind>,
    marshallers: BTreeSet<ElementKind>,
    unmarshallers: BTreeSet<ElementKind>,
    indent: usize,
}

impl Default for XmlCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlCodec {
    /// Create a codec for the IdP: metadata and responses go out,
    /// AuthnRequests come in.
    pub fn new() -> Self {
        Self::empty()
            .register(ElementKind::EntityDescriptor)
            .register(ElementKind::Response)
            .register_unmarshaller(ElementKind::AuthnRequest)
    }

    /// Create a codec with nothing registered.
    pub fn empty() -> Self {
        Self {
            builders: BTreeSet::new(),
            marshallers: BTreeSet::new(),
            unmarshallers: BTreeSet::new(),
            indent: DEFAULT_INDENT,
        }
    }

    /// Register builder, marshaller and unmarshaller for `kind`.
    pub fn register(self, kind: ElementKind) -> Self {
        self.register_builder(kind)
            .register_marshaller(kind)
            .register_unmarshaller(kind)
    }

    pub fn register_builder(mut self, kind: ElementKind) -> Self {
        self.builders.insert(kind);
        self
    }

    pub fn register_marshaller(mut self, kind: ElementKind) -> Self {
        self.marshallers.insert(kind);
        self
    }

    pub fn register_unmarshaller(mut self, kind: ElementKind) -> Self {
        self.unmarshallers.insert(kind);
        self
    }

    /// Number of spaces per nesting level in marshalled output.
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Check that an object of the given kind can be constructed.
    pub fn require_builder(&self, kind: ElementKind) -> Result<(), SerializationError> {
        if self.builders.contains(&kind) {
            Ok(())
        } else {
            Err(SerializationError::MissingBuilder(kind))
        }
    }

    /// Serialize a samael object into a pretty-printed XML document.
    pub fn marshal<T: XmlObject>(&self, object: &T) -> Result<String, SerializationError>
    where
        for<'a> <T as ToXml<'a>>::Error: fmt::Display,
    {
        if !self.marshallers.contains(&T::KIND) {
            return Err(SerializationError::MissingMarshaller(T::KIND));
        }

        let compact = ToXml::to_string(object).map_err(marshal_error)?;
        pretty_print(&compact, self.indent)
    }

    /// Unmarshal an inbound `samlp:AuthnRequest`.
    ///
    /// Rejects documents whose root element is anything other than an
    /// AuthnRequest in the SAML 2.0 protocol namespace. Attributes are
    /// read leniently; see [`AuthnRequest`].
    pub fn unmarshal_authn_request(&self, xml: &str) -> Result<AuthnRequest, UnmarshalError> {
        self.unmarshal(ElementKind::AuthnRequest, xml, |xml| {
            quick_xml::de::from_str::<AuthnRequest>(xml).map_err(|e| e.to_string())
        })
    }

    /// Unmarshal an `md:EntityDescriptor` metadata document.
    pub fn unmarshal_metadata(&self, xml: &str) -> Result<EntityDescriptor, UnmarshalError> {
        self.unmarshal(ElementKind::EntityDescriptor, xml, |xml| {
            samael::metadata::de::from_str(xml).map_err(|e| e.to_string())
        })
    }

    /// Unmarshal a `samlp:Response` document.
    pub fn unmarshal_response(
        &self,
        xml: &str,
    ) -> Result<samael::schema::Response, UnmarshalError> {
        self.unmarshal(ElementKind::Response, xml, |xml| {
            xml.parse::<samael::schema::Response>()
                .map_err(|e| e.to_string())
        })
    }

    fn unmarshal<T>(
        &self,
        kind: ElementKind,
        xml: &str,
        parse: impl FnOnce(&str) -> Result<T, String>,
    ) -> Result<T, UnmarshalError> {
        if !self.unmarshallers.contains(&kind) {
            return Err(UnmarshalError::MissingUnmarshaller(kind));
        }

        let (namespace, local_name) = root_element(xml)?;
        if namespace.as_deref() != Some(kind.namespace()) || local_name != kind.local_name() {
            return Err(UnmarshalError::UnexpectedElement {
                expected: kind,
                found: match namespace {
                    Some(ns) => format!("{{{ns}}}{local_name}"),
                    None => local_name,
                },
            });
        }

        parse(xml).map_err(|message| UnmarshalError::Unmarshal { kind, message })
    }
}

/// Resolve the namespace and local name of the document's root element.
fn root_element(xml: &str) -> Result<(Option<String>, String), UnmarshalError> {
    let mut reader = NsReader::from_str(xml);

    loop {
        match reader.read_resolved_event() {
            Ok((ns, Event::Start(e) | Event::Empty(e))) => {
                let namespace = match ns {
                    ResolveResult::Bound(Namespace(ns)) => {
                        Some(String::from_utf8_lossy(ns).into_owned())
                    }
                    _ => None,
                };
                let local_name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                return Ok((namespace, local_name));
            }
            Ok((_, Event::Text(text))) => {
                if !text.iter().all(u8::is_ascii_whitespace) {
                    return Err(UnmarshalError::Malformed(
                        "text content outside of the root element".to_string(),
                    ));
                }
            }
            Ok((_, Event::Eof)) => return Err(UnmarshalError::EmptyDocument),
            Ok(_) => {}
            Err(e) => return Err(UnmarshalError::Malformed(e.to_string())),
        }
    }
}

/// Re-indent a compact document and prefix the UTF-8 declaration.
///
/// Character data is passed through still escaped. Runs of text and
/// entity references are joined back into one text node, and text that is
/// only whitespace is dropped.
fn pretty_print(xml: &str, indent: usize) -> Result<String, SerializationError> {
    let mut reader = Reader::from_str(xml);
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', indent);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(marshal_error)?;

    let mut text = String::new();
    loop {
        match reader.read_event().map_err(marshal_error)? {
            Event::Text(t) => text.push_str(std::str::from_utf8(&t).map_err(marshal_error)?),
            Event::GeneralRef(r) => {
                text.push('&');
                text.push_str(std::str::from_utf8(&r).map_err(marshal_error)?);
                text.push(';');
            }
            Event::Decl(_) | Event::DocType(_) => {}
            Event::Eof => break,
            event => {
                flush_text(&mut writer, &mut text)?;
                writer.write_event(event).map_err(marshal_error)?;
            }
        }
    }
    flush_text(&mut writer, &mut text)?;

    String::from_utf8(writer.into_inner()).map_err(marshal_error)
}

fn flush_text<W: Write>(writer: &mut Writer<W>, text: &mut String) -> Result<(), SerializationError> {
    if !text.trim().is_empty() {
        writer
            .write_event(Event::Text(BytesText::from_escaped(text.as_str())))
            .map_err(marshal_error)?;
    }
    text.clear();
    Ok(())
}

fn marshal_error(e: impl fmt::Display) -> SerializationError {
    SerializationError::Marshal(e.to_string())
}
