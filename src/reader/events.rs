//! XML Event Types
//!
//! Events produced by the pull reader. Names and markup content borrow from
//! the input; text is entity-decoded and only allocates when it had to.

use crate::core::attributes::{split_name, Attribute};
use std::borrow::Cow;

/// XML parsing event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent<'a> {
    /// `<name attrs...>`
    StartElement(StartElement<'a>),
    /// `</name>`
    EndElement(EndElement<'a>),
    /// `<name attrs.../>`
    EmptyElement(StartElement<'a>),
    /// Character data between tags, entity-decoded
    Text(Cow<'a, [u8]>),
    /// CDATA section content
    CData(&'a [u8]),
    /// Comment content
    Comment(&'a [u8]),
    /// `<?target data?>`
    ProcessingInstruction {
        target: &'a [u8],
        data: Option<&'a [u8]>,
    },
    /// `<?xml version="1.0"?>`
    XmlDeclaration {
        version: Cow<'a, [u8]>,
        encoding: Option<Cow<'a, [u8]>>,
        standalone: Option<bool>,
    },
    /// DOCTYPE body, internal subset included
    DocType(&'a [u8]),
    EndDocument,
}

/// Start or empty element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StartElement<'a> {
    /// Qualified name as written
    pub name: &'a [u8],
    pub attributes: Vec<Attribute<'a>>,
}

impl<'a> StartElement<'a> {
    pub fn new(name: &'a [u8], attributes: Vec<Attribute<'a>>) -> Self {
        StartElement { name, attributes }
    }

    pub fn prefix(&self) -> Option<&'a [u8]> {
        split_name(self.name).0
    }

    pub fn local_name(&self) -> &'a [u8] {
        split_name(self.name).1
    }

    pub fn name_str(&self) -> Option<&str> {
        std::str::from_utf8(self.name).ok()
    }

    /// Attribute value by qualified name
    pub fn get_attribute_value(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name.as_bytes())
            .and_then(|a| a.value_str())
    }
}

/// End element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndElement<'a> {
    pub name: &'a [u8],
}

impl<'a> EndElement<'a> {
    pub fn new(name: &'a [u8]) -> Self {
        EndElement { name }
    }

    pub fn name_str(&self) -> Option<&str> {
        std::str::from_utf8(self.name).ok()
    }
}

impl<'a> XmlEvent<'a> {
    pub fn is_start_element(&self) -> bool {
        matches!(self, XmlEvent::StartElement(_) | XmlEvent::EmptyElement(_))
    }

    pub fn as_start_element(&self) -> Option<&StartElement<'a>> {
        match self {
            XmlEvent::StartElement(e) | XmlEvent::EmptyElement(e) => Some(e),
            _ => None,
        }
    }

    /// Character content of a text or CDATA event
    pub fn as_text(&self) -> Option<&[u8]> {
        match self {
            XmlEvent::Text(t) => Some(t.as_ref()),
            XmlEvent::CData(t) => Some(t),
            _ => None,
        }
    }
}
