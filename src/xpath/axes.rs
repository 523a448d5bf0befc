//! XPath Axes
//!
//! Navigation for the supported axes plus node-test matching. Each axis
//! returns its nodes in axis order: reverse axes (parent, ancestor,
//! ancestor-or-self, preceding-sibling) list the nearest node first.

use super::compiler::CompiledTest;
use super::parser::Axis;
use super::value::XPathNode;
use crate::dom::{NodeKind, XmlDocument};

/// Navigate along an axis from a context node
pub fn navigate(doc: &XmlDocument, context: XPathNode, axis: Axis) -> Vec<XPathNode> {
    match axis {
        Axis::Child => child_axis(doc, context),
        Axis::Descendant => descendant_axis(doc, context),
        Axis::DescendantOrSelf => {
            let mut result = vec![context];
            result.extend(descendant_axis(doc, context));
            result
        }
        Axis::Parent => parent(doc, context).into_iter().collect(),
        Axis::Ancestor => ancestor_axis(doc, context),
        Axis::AncestorOrSelf => {
            let mut result = vec![context];
            result.extend(ancestor_axis(doc, context));
            result
        }
        Axis::FollowingSibling => sibling_axis(doc, context, XmlDocument::next_sibling),
        Axis::PrecedingSibling => sibling_axis(doc, context, XmlDocument::prev_sibling),
        Axis::SelfAxis => vec![context],
        Axis::Attribute => attribute_axis(doc, context),
    }
}

fn child_axis(doc: &XmlDocument, context: XPathNode) -> Vec<XPathNode> {
    match context {
        XPathNode::Node(id) => doc.children(id).map(XPathNode::Node).collect(),
        XPathNode::Attribute { .. } => Vec::new(),
    }
}

fn descendant_axis(doc: &XmlDocument, context: XPathNode) -> Vec<XPathNode> {
    match context {
        XPathNode::Node(id) => doc.descendants(id).map(XPathNode::Node).collect(),
        XPathNode::Attribute { .. } => Vec::new(),
    }
}

/// An attribute's parent is its owner element
fn parent(doc: &XmlDocument, context: XPathNode) -> Option<XPathNode> {
    match context {
        XPathNode::Node(id) => doc.parent_of(id).map(XPathNode::Node),
        XPathNode::Attribute { owner, .. } => Some(XPathNode::Node(owner)),
    }
}

fn ancestor_axis(doc: &XmlDocument, context: XPathNode) -> Vec<XPathNode> {
    let mut result = Vec::new();
    let mut current = parent(doc, context);
    while let Some(node) = current {
        result.push(node);
        current = parent(doc, node);
    }
    result
}

fn sibling_axis(
    doc: &XmlDocument,
    context: XPathNode,
    step: fn(&XmlDocument, u32) -> Option<u32>,
) -> Vec<XPathNode> {
    let XPathNode::Node(id) = context else {
        return Vec::new();
    };
    let mut result = Vec::new();
    let mut current = step(doc, id);
    while let Some(sibling) = current {
        result.push(XPathNode::Node(sibling));
        current = step(doc, sibling);
    }
    result
}

/// Attributes of an element, namespace declarations excluded
fn attribute_axis(doc: &XmlDocument, context: XPathNode) -> Vec<XPathNode> {
    let XPathNode::Node(owner) = context else {
        return Vec::new();
    };
    doc.attributes(owner)
        .iter()
        .enumerate()
        .filter(|(_, attr)| !attr.is_namespace_decl)
        .map(|(index, _)| XPathNode::Attribute {
            owner,
            index: index as u32,
        })
        .collect()
}

/// Node test against a node reached along `axis`
///
/// Name tests and `*` select the axis's principal node type: attributes on
/// the attribute axis, elements everywhere else.
pub fn matches(doc: &XmlDocument, node: XPathNode, test: &CompiledTest, axis: Axis) -> bool {
    let principal = || match node {
        XPathNode::Attribute { .. } => axis == Axis::Attribute,
        XPathNode::Node(id) => axis != Axis::Attribute && doc.node_kind(id) == Some(NodeKind::Element),
    };
    match test {
        CompiledTest::Node => true,
        CompiledTest::Text => matches!(node.kind(doc), Some(NodeKind::Text | NodeKind::CData)),
        CompiledTest::Comment => node.kind(doc) == Some(NodeKind::Comment),
        CompiledTest::ProcessingInstruction(target) => {
            node.kind(doc) == Some(NodeKind::ProcessingInstruction)
                && target.as_deref().is_none_or(|t| node.name(doc) == t)
        }
        CompiledTest::Any => principal(),
        CompiledTest::Name { uri, local } => {
            principal()
                && node.local_name(doc) == local
                && node.namespace_uri(doc) == uri.as_deref().unwrap_or("")
        }
        CompiledTest::Namespace(uri) => principal() && node.namespace_uri(doc) == uri,
    }
}
