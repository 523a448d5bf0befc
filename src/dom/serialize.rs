//! XML Serialization
//!
//! Writes a document or a single subtree back to markup. Namespace
//! declarations are emitted exactly as stored on the elements.

use super::document::XmlDocument;
use super::node::{NodeId, NodeKind, DOCUMENT_NODE};
use crate::core::entities::{escape_attribute, escape_text};

impl XmlDocument {
    /// Whole document with its XML declaration, one top-level node per line
    pub fn to_xml(&self) -> String {
        let mut out = String::with_capacity(self.node_count() * 32);
        out.push_str("<?xml version=\"");
        out.push_str(self.version());
        out.push('"');
        if let Some(encoding) = self.encoding() {
            out.push_str(" encoding=\"");
            out.push_str(encoding);
            out.push('"');
        }
        if let Some(standalone) = self.standalone() {
            out.push_str(if standalone { " standalone=\"yes\"" } else { " standalone=\"no\"" });
        }
        out.push_str("?>\n");

        for child in self.children(DOCUMENT_NODE) {
            self.write_node(child, &mut out);
            out.push('\n');
        }
        out
    }

    /// One node and its subtree, no declaration
    ///
    /// The document node serializes as its children.
    pub fn node_to_xml(&self, id: NodeId) -> String {
        let mut out = String::new();
        self.write_node(id, &mut out);
        out
    }

    /// Preorder walk over an explicit frame stack
    fn write_node(&self, id: NodeId, out: &mut String) {
        let mut stack = vec![Frame::Open(id)];
        while let Some(frame) = stack.pop() {
            let id = match frame {
                Frame::Open(id) => id,
                Frame::Close(id) => {
                    out.push_str("</");
                    out.push_str(self.node_name(id).unwrap_or_default());
                    out.push('>');
                    continue;
                }
            };
            let Some(node) = self.get_node(id) else {
                continue;
            };
            match node.kind {
                NodeKind::Document => {}
                NodeKind::Element => {
                    self.write_start_tag(id, out);
                    if !node.has_children() {
                        out.push_str("/>");
                        continue;
                    }
                    out.push('>');
                    stack.push(Frame::Close(id));
                }
                NodeKind::Text => out.push_str(&escape_text(self.strings().get(node.value_id))),
                NodeKind::CData => {
                    out.push_str("<![CDATA[");
                    out.push_str(self.strings().get(node.value_id));
                    out.push_str("]]>");
                }
                NodeKind::Comment => {
                    out.push_str("<!--");
                    out.push_str(self.strings().get(node.value_id));
                    out.push_str("-->");
                }
                NodeKind::ProcessingInstruction => {
                    out.push_str("<?");
                    out.push_str(self.strings().get(node.name_id));
                    let data = self.strings().get(node.value_id);
                    if !data.is_empty() {
                        out.push(' ');
                        out.push_str(data);
                    }
                    out.push_str("?>");
                }
            }
            // Children go on reversed so the first one pops next
            let start = stack.len();
            stack.extend(self.children(id).map(Frame::Open));
            stack[start..].reverse();
        }
    }

    /// `<name attr="value" ...` without the closing bracket
    fn write_start_tag(&self, id: NodeId, out: &mut String) {
        out.push('<');
        out.push_str(self.node_name(id).unwrap_or_default());
        for attr in self.attributes(id) {
            out.push(' ');
            out.push_str(self.attribute_name(attr));
            out.push_str("=\"");
            out.push_str(&escape_attribute(self.attribute_value(attr)));
            out.push('"');
        }
    }
}

enum Frame {
    Open(NodeId),
    Close(NodeId),
}
