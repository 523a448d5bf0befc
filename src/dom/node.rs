//! XML Node representation
//!
//! Nodes live in the document arena and refer to each other by `NodeId`.
//! Strings are IDs into the document's `StringPool`.

/// Compact node identifier (index into arena)
pub type NodeId = u32;

/// The document node is always arena slot 0
pub const DOCUMENT_NODE: NodeId = 0;

/// Type of XML node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Text,
    CData,
    Comment,
    ProcessingInstruction,
}

/// An XML node in the arena
#[derive(Debug, Clone)]
pub struct XmlNode {
    pub kind: NodeKind,
    pub parent: Option<NodeId>,
    pub first_child: Option<NodeId>,
    pub last_child: Option<NodeId>,
    pub prev_sibling: Option<NodeId>,
    pub next_sibling: Option<NodeId>,
    /// Qualified name (elements) or target (PIs)
    pub name_id: u32,
    /// Resolved namespace URI, 0 for no namespace
    pub namespace_id: u32,
    /// Character content (text, CDATA, comments) or PI data
    pub value_id: u32,
    /// Start of this element's run in the attribute arena
    pub attr_start: u32,
    pub attr_count: u32,
}

impl XmlNode {
    fn new(kind: NodeKind, name_id: u32, value_id: u32) -> Self {
        XmlNode {
            kind,
            parent: None,
            first_child: None,
            last_child: None,
            prev_sibling: None,
            next_sibling: None,
            name_id,
            namespace_id: 0,
            value_id,
            attr_start: 0,
            attr_count: 0,
        }
    }

    pub fn document() -> Self {
        Self::new(NodeKind::Document, 0, 0)
    }

    pub fn element(name_id: u32, namespace_id: u32) -> Self {
        XmlNode {
            namespace_id,
            ..Self::new(NodeKind::Element, name_id, 0)
        }
    }

    /// Text, CDATA or comment node
    pub fn character_data(kind: NodeKind, value_id: u32) -> Self {
        Self::new(kind, 0, value_id)
    }

    pub fn processing_instruction(target_id: u32, data_id: u32) -> Self {
        Self::new(NodeKind::ProcessingInstruction, target_id, data_id)
    }

    #[inline]
    pub fn is_element(&self) -> bool {
        self.kind == NodeKind::Element
    }

    /// Text or CDATA
    #[inline]
    pub fn is_text(&self) -> bool {
        matches!(self.kind, NodeKind::Text | NodeKind::CData)
    }

    #[inline]
    pub fn has_children(&self) -> bool {
        self.first_child.is_some()
    }

    #[inline]
    pub fn has_attributes(&self) -> bool {
        self.attr_count > 0
    }

    /// Arena range of this element's attributes
    #[inline]
    pub fn attr_range(&self) -> std::ops::Range<usize> {
        let start = self.attr_start as usize;
        start..start + self.attr_count as usize
    }
}

/// Stored attribute
///
/// Namespace declarations (`xmlns`, `xmlns:p`) are stored as attributes so
/// serialization reproduces them; XPath's attribute axis skips them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XmlAttribute {
    /// Qualified name
    pub name_id: u32,
    /// Resolved namespace URI, 0 for no namespace
    pub namespace_id: u32,
    pub value_id: u32,
    /// Set for `xmlns` and `xmlns:*`
    pub is_namespace_decl: bool,
}

impl XmlAttribute {
    pub fn new(name_id: u32, namespace_id: u32, value_id: u32) -> Self {
        XmlAttribute {
            name_id,
            namespace_id,
            value_id,
            is_namespace_decl: false,
        }
    }

    pub fn namespace_decl(name_id: u32, value_id: u32) -> Self {
        XmlAttribute {
            is_namespace_decl: true,
            ..Self::new(name_id, 0, value_id)
        }
    }
}
