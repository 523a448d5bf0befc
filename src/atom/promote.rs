//! Node promotion
//!
//! Turns one element of a feed (typically an `atom:entry`) into its own
//! document, so it can be handed around and serialized independently.

use tracing::debug;

use crate::dom::{NodeId, NodeKind, XmlDocument};

/// Standalone copy of the subtree rooted at `node`
///
/// The new document has version "1.0" and the deep copy as root element.
/// Bindings the source inherited from its ancestors are re-declared on the
/// new root. Anything but an element yields a document with no root.
pub fn wrap_in_doc(source: &XmlDocument, node: NodeId) -> XmlDocument {
    let mut doc = XmlDocument::new();
    if source.node_kind(node) != Some(NodeKind::Element) {
        return doc;
    }
    let Some(copy) = doc.import_node(source, node) else {
        return doc;
    };
    if let Err(err) = doc.set_root_element(copy) {
        debug!(error = %err, "cannot promote node");
        return doc;
    }

    for (prefix, uri) in source.in_scope_namespaces(node) {
        let attr = if prefix.is_empty() {
            "xmlns".to_string()
        } else {
            format!("xmlns:{prefix}")
        };
        if doc.get_attribute(copy, &attr).is_some() {
            continue;
        }
        if let Err(err) = doc.set_attribute(copy, &attr, uri) {
            debug!(prefix, error = %err, "cannot re-declare namespace");
        }
    }
    doc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atom::{get_xpath_value, register_namespaces, ATOM, CMIS};
    use crate::xpath::XPathContext;

    const FEED: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<atom:feed xmlns:atom="http://www.w3.org/2005/Atom" xmlns:cmis="http://docs.oasis-open.org/ns/cmis/core/200908/" xmlns:xsi="http://www.w3.org/2001/XMLSchema-instance">
  <atom:title>Children</atom:title>
  <atom:entry xmlns:app="http://www.w3.org/2007/app">
    <atom:title>First</atom:title>
    <cmis:value xsi:type="cmis:cmisValue">1</cmis:value>
    <app:edited>today</app:edited>
    <!--note-->
  </atom:entry>
  <atom:entry>
    <atom:title>Second</atom:title>
  </atom:entry>
</atom:feed>"#;

    fn entries(doc: &XmlDocument) -> Vec<NodeId> {
        let feed = doc.root_element_id().unwrap();
        doc.children(feed)
            .filter(|&c| doc.node_local_name(c) == Some("entry"))
            .collect()
    }

    #[test]
    fn test_promoted_entry_is_standalone() {
        let source = XmlDocument::parse(FEED);
        let first = entries(&source)[0];
        let promoted = wrap_in_doc(&source, first);

        let root = promoted.root_element_id().unwrap();
        assert_eq!(promoted.node_name(root), Some("atom:entry"));
        assert_eq!(promoted.node_namespace_uri(root), Some(ATOM));
        assert_eq!(promoted.version(), "1.0");
        assert_eq!(promoted.get_attribute(root, "xmlns:atom"), Some(ATOM));
        assert_eq!(promoted.get_attribute(root, "xmlns:cmis"), Some(CMIS));
        assert_eq!(
            promoted.get_attribute(root, "xmlns:app"),
            Some("http://www.w3.org/2007/app")
        );

        let xml = promoted.to_xml();
        assert!(xml.starts_with("<?xml version=\"1.0\"?>\n<atom:entry"));
        let reparsed = XmlDocument::parse_strict(xml.as_bytes()).unwrap();
        let mut ctx = XPathContext::new();
        register_namespaces(&mut ctx);
        assert_eq!(get_xpath_value(&mut ctx, &reparsed, "/atom:entry/atom:title"), "First");
        assert_eq!(get_xpath_value(&mut ctx, &reparsed, "//cmis:value/@xsi:type"), "cmis:cmisValue");
        assert_eq!(get_xpath_value(&mut ctx, &reparsed, "//comment()"), "note");
    }

    #[test]
    fn test_declarations_not_duplicated() {
        let source = XmlDocument::parse(FEED);
        let promoted = wrap_in_doc(&source, entries(&source)[0]);
        let root = promoted.root_element_id().unwrap();
        let declarations = promoted
            .attributes(root)
            .iter()
            .filter(|a| a.is_namespace_decl)
            .count();
        assert_eq!(declarations, 4);
    }

    #[test]
    fn test_source_untouched() {
        let source = XmlDocument::parse(FEED);
        let before = source.to_xml();
        let count = source.node_count();
        let second = entries(&source)[1];

        let mut promoted = wrap_in_doc(&source, second);
        let root = promoted.root_element_id().unwrap();
        promoted.set_attribute(root, "id", "x").unwrap();

        assert_eq!(source.to_xml(), before);
        assert_eq!(source.node_count(), count);
        let mut ctx = XPathContext::new();
        register_namespaces(&mut ctx);
        assert_eq!(get_xpath_value(&mut ctx, &promoted, "atom:entry/atom:title"), "Second");
    }

    fn element_children(doc: &XmlDocument, id: NodeId) -> Vec<NodeId> {
        doc.children(id)
            .filter(|&c| doc.node_kind(c) == Some(NodeKind::Element))
            .collect()
    }

    #[test]
    fn test_promoted_children_mutate_independently() {
        let source = XmlDocument::parse(
            b"<atom:feed xmlns:atom=\"http://www.w3.org/2005/Atom\"><atom:entry>\
              <atom:title>Report</atom:title><atom:summary>Q3 numbers</atom:summary>\
              </atom:entry></atom:feed>",
        );
        let entry = entries(&source)[0];
        let before = source.to_xml();

        let mut promoted = wrap_in_doc(&source, entry);
        let root = promoted.root_element_id().unwrap();
        let source_children = element_children(&source, entry);
        let copied_children = element_children(&promoted, root);
        assert_eq!(source_children.len(), 2);
        assert_eq!(copied_children.len(), 2);
        for (&s, &c) in source_children.iter().zip(&copied_children) {
            assert_eq!(promoted.node_name(c), source.node_name(s));
            assert_eq!(promoted.text_content(c), source.text_content(s));
        }

        promoted.set_text(copied_children[0], "Changed").unwrap();
        promoted.detach(copied_children[1]);
        assert_eq!(element_children(&promoted, root), vec![copied_children[0]]);
        assert_eq!(promoted.text_content(root), "Changed");

        assert_eq!(source.to_xml(), before);
        assert_eq!(element_children(&source, entry), source_children);
        assert_eq!(source.text_content(entry), "ReportQ3 numbers");
    }

    #[test]
    fn test_deep_entry_promotes_and_serializes() {
        const DEPTH: usize = 100_000;
        let entry = format!("<entry>{}x{}</entry>", "<a>".repeat(DEPTH), "</a>".repeat(DEPTH));
        let source = XmlDocument::parse(format!("<feed>{entry}</feed>").as_bytes());

        let promoted = wrap_in_doc(&source, entries(&source)[0]);
        assert_eq!(promoted.node_count(), DEPTH + 3);
        let root = promoted.root_element_id().unwrap();
        assert_eq!(promoted.node_to_xml(root), entry);
    }

    #[test]
    fn test_non_element_yields_empty_document() {
        let source = XmlDocument::parse(FEED);
        let feed = source.root_element_id().unwrap();
        let text = source.children(feed).next().unwrap();
        assert_eq!(source.node_kind(text), Some(NodeKind::Text));

        assert_eq!(wrap_in_doc(&source, text).root_element_id(), None);
        assert_eq!(wrap_in_doc(&source, 0).root_element_id(), None);
        assert_eq!(wrap_in_doc(&source, 9_999).root_element_id(), None);
    }

    #[test]
    fn test_default_namespace_carried() {
        let source = XmlDocument::parse(
            b"<feed xmlns=\"http://www.w3.org/2005/Atom\"><entry><title>t</title></entry></feed>",
        );
        let feed = source.root_element_id().unwrap();
        let entry = source.children(feed).next().unwrap();
        let promoted = wrap_in_doc(&source, entry);
        let xml = promoted.node_to_xml(promoted.root_element_id().unwrap());
        assert_eq!(
            xml,
            "<entry xmlns=\"http://www.w3.org/2005/Atom\"><title>t</title></entry>"
        );
    }
}
