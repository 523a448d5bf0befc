//! XPath value extraction
//!
//! Read helpers for AtomPub responses. Failures of any kind (malformed
//! expression, unbound prefix, type errors, no match) come back as empty
//! values; evaluation errors are logged at debug level.

use tracing::debug;

use crate::dom::XmlDocument;
use crate::xpath::{XPathContext, XPathNode, XPathValue};

/// Text content of the first node selected by `expr`
///
/// Elements yield their concatenated descendant text, attributes their
/// value. Scalar results and errors yield an empty string.
pub fn get_xpath_value(ctx: &mut XPathContext, doc: &XmlDocument, expr: &str) -> String {
    selected_nodes(ctx, doc, expr)
        .first()
        .map(|node| node.string_value(doc))
        .unwrap_or_default()
}

/// Text content of every selected node, in document order
pub fn get_xpath_values(ctx: &mut XPathContext, doc: &XmlDocument, expr: &str) -> Vec<String> {
    selected_nodes(ctx, doc, expr)
        .into_iter()
        .map(|node| node.string_value(doc))
        .collect()
}

fn selected_nodes(ctx: &mut XPathContext, doc: &XmlDocument, expr: &str) -> Vec<XPathNode> {
    match ctx.evaluate(doc, expr) {
        Ok(XPathValue::NodeSet(nodes)) => nodes,
        Ok(_) => Vec::new(),
        Err(err) => {
            debug!(expr, error = %err, "xpath evaluation failed");
            Vec::new()
        }
    }
}
