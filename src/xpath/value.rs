//! XPath Value Types
//!
//! XPath 1.0 has four data types: node-set, boolean, number, and string.
//! Node-sets can hold attributes as well as tree nodes, so a selection like
//! `@href` stays a node-set and keeps working under predicates and unions.

use crate::dom::{NodeId, NodeKind, XmlAttribute, XmlDocument};

/// A member of a node-set
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum XPathNode {
    /// Document, element, text, CDATA, comment or PI
    Node(NodeId),
    /// The `index`-th entry of `owner`'s attribute list
    Attribute { owner: NodeId, index: u32 },
}

impl XPathNode {
    /// Tree node ID, None for attributes
    pub fn node_id(self) -> Option<NodeId> {
        match self {
            XPathNode::Node(id) => Some(id),
            XPathNode::Attribute { .. } => None,
        }
    }

    fn attribute(self, doc: &XmlDocument) -> Option<&XmlAttribute> {
        match self {
            XPathNode::Attribute { owner, index } => doc.attributes(owner).get(index as usize),
            XPathNode::Node(_) => None,
        }
    }

    /// XPath string-value
    pub fn string_value(self, doc: &XmlDocument) -> String {
        match self {
            XPathNode::Node(id) => doc.text_content(id),
            XPathNode::Attribute { .. } => self
                .attribute(doc)
                .map(|a| doc.attribute_value(a).to_string())
                .unwrap_or_default(),
        }
    }

    /// Qualified name, empty for unnamed nodes
    pub fn name(self, doc: &XmlDocument) -> &str {
        match self {
            XPathNode::Node(id) => doc.node_name(id).unwrap_or(""),
            XPathNode::Attribute { .. } => self.attribute(doc).map_or("", |a| doc.attribute_name(a)),
        }
    }

    pub fn local_name(self, doc: &XmlDocument) -> &str {
        match self {
            XPathNode::Node(id) => doc.node_local_name(id).unwrap_or(""),
            XPathNode::Attribute { .. } => self
                .attribute(doc)
                .map_or("", |a| doc.attribute_local_name(a)),
        }
    }

    pub fn namespace_uri(self, doc: &XmlDocument) -> &str {
        match self {
            XPathNode::Node(id) => doc.node_namespace_uri(id).unwrap_or(""),
            XPathNode::Attribute { .. } => self
                .attribute(doc)
                .and_then(|a| doc.attribute_namespace_uri(a))
                .unwrap_or(""),
        }
    }

    pub fn kind(self, doc: &XmlDocument) -> Option<NodeKind> {
        self.node_id().and_then(|id| doc.node_kind(id))
    }
}

/// XPath value types
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum XPathValue {
    /// Nodes in document order, no duplicates
    NodeSet(Vec<XPathNode>),
    Boolean(bool),
    Number(f64),
    String(String),
}

impl XPathValue {
    pub fn empty_nodeset() -> Self {
        XPathValue::NodeSet(Vec::new())
    }

    pub fn single_node(id: NodeId) -> Self {
        XPathValue::NodeSet(vec![XPathNode::Node(id)])
    }

    /// boolean() semantics
    pub fn to_boolean(&self) -> bool {
        match self {
            XPathValue::NodeSet(nodes) => !nodes.is_empty(),
            XPathValue::Boolean(b) => *b,
            XPathValue::Number(n) => *n != 0.0 && !n.is_nan(),
            XPathValue::String(s) => !s.is_empty(),
        }
    }

    /// number() semantics
    pub fn to_number(&self, doc: &XmlDocument) -> f64 {
        match self {
            XPathValue::Boolean(b) => f64::from(u8::from(*b)),
            XPathValue::Number(n) => *n,
            XPathValue::NodeSet(_) | XPathValue::String(_) => parse_number(&self.to_string_value(doc)),
        }
    }

    /// string() semantics: a node-set converts to its first node's
    /// string-value
    pub fn to_string_value(&self, doc: &XmlDocument) -> String {
        match self {
            XPathValue::NodeSet(nodes) => nodes
                .first()
                .map(|n| n.string_value(doc))
                .unwrap_or_default(),
            XPathValue::Boolean(b) => b.to_string(),
            XPathValue::Number(n) => format_number(*n),
            XPathValue::String(s) => s.clone(),
        }
    }

    pub fn is_nodeset(&self) -> bool {
        matches!(self, XPathValue::NodeSet(_))
    }

    pub fn as_nodeset(&self) -> Option<&[XPathNode]> {
        match self {
            XPathValue::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }

    pub fn into_nodeset(self) -> Option<Vec<XPathNode>> {
        match self {
            XPathValue::NodeSet(nodes) => Some(nodes),
            _ => None,
        }
    }
}

impl Default for XPathValue {
    fn default() -> Self {
        XPathValue::empty_nodeset()
    }
}

impl From<bool> for XPathValue {
    fn from(b: bool) -> Self {
        XPathValue::Boolean(b)
    }
}

impl From<f64> for XPathValue {
    fn from(n: f64) -> Self {
        XPathValue::Number(n)
    }
}

impl From<String> for XPathValue {
    fn from(s: String) -> Self {
        XPathValue::String(s)
    }
}

impl From<&str> for XPathValue {
    fn from(s: &str) -> Self {
        XPathValue::String(s.to_string())
    }
}

/// String to number per the XPath `Number` production, NaN otherwise
pub fn parse_number(s: &str) -> f64 {
    let s = s.trim_matches(|c| matches!(c, ' ' | '\t' | '\n' | '\r'));
    let digits = s.strip_prefix('-').unwrap_or(s);
    let valid = !digits.is_empty()
        && digits != "."
        && digits.bytes().all(|b| b.is_ascii_digit() || b == b'.')
        && digits.bytes().filter(|&b| b == b'.').count() <= 1;
    if valid {
        s.parse().unwrap_or(f64::NAN)
    } else {
        f64::NAN
    }
}

/// Number to string: integers without a fraction, no exponent
pub fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".to_string()
    } else if n.is_infinite() {
        if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string()
    } else if n == 0.0 {
        "0".to_string()
    } else {
        n.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_boolean_conversion() {
        assert!(XPathValue::single_node(1).to_boolean());
        assert!(!XPathValue::empty_nodeset().to_boolean());
        assert!(XPathValue::Number(1.0).to_boolean());
        assert!(!XPathValue::Number(0.0).to_boolean());
        assert!(!XPathValue::Number(f64::NAN).to_boolean());
        assert!(XPathValue::from("x").to_boolean());
        assert!(!XPathValue::from("").to_boolean());
    }

    #[test]
    fn test_number_conversion() {
        let doc = XmlDocument::parse(b"<n> 42 </n>");
        assert_eq!(XPathValue::Boolean(true).to_number(&doc), 1.0);
        assert_eq!(XPathValue::from("42").to_number(&doc), 42.0);
        assert_eq!(XPathValue::from(" -1.5 ").to_number(&doc), -1.5);
        assert!(XPathValue::from("abc").to_number(&doc).is_nan());
        assert!(XPathValue::from("1e3").to_number(&doc).is_nan());
        assert!(XPathValue::from("+1").to_number(&doc).is_nan());

        let root = doc.root_element_id().unwrap();
        assert_eq!(XPathValue::single_node(root).to_number(&doc), 42.0);
    }

    #[test]
    fn test_string_conversion() {
        let doc = XmlDocument::parse(b"<a href=\"x\">text</a>");
        assert_eq!(XPathValue::Boolean(false).to_string_value(&doc), "false");
        assert_eq!(XPathValue::Number(42.0).to_string_value(&doc), "42");
        assert_eq!(XPathValue::Number(3.25).to_string_value(&doc), "3.25");
        assert_eq!(XPathValue::Number(-0.0).to_string_value(&doc), "0");
        assert_eq!(XPathValue::Number(f64::INFINITY).to_string_value(&doc), "Infinity");
        assert_eq!(XPathValue::Number(1e21).to_string_value(&doc), "1000000000000000000000");

        let root = doc.root_element_id().unwrap();
        let attr = XPathNode::Attribute { owner: root, index: 0 };
        assert_eq!(XPathValue::NodeSet(vec![attr]).to_string_value(&doc), "x");
        assert_eq!(attr.name(&doc), "href");
        assert_eq!(XPathValue::single_node(root).to_string_value(&doc), "text");
        assert_eq!(XPathValue::empty_nodeset().to_string_value(&doc), "");
    }
}
