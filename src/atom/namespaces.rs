//! AtomPub / CMIS namespace table
//!
//! The fixed prefixes every extraction expression is written against.

use crate::xpath::XPathContext;

pub const APP: &str = "http://www.w3.org/2007/app";
pub const ATOM: &str = "http://www.w3.org/2005/Atom";
pub const CMIS: &str = "http://docs.oasis-open.org/ns/cmis/core/200908/";
pub const CMISRA: &str = "http://docs.oasis-open.org/ns/cmis/restatom/200908/";
pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const CMIS_MESSAGING: &str = "http://docs.oasis-open.org/ns/cmis/messaging/200908/";
/// Bound to `type`; a QName rather than a URI, kept as the servers send it
pub const DOCUMENT_DEFINITION_TYPE: &str = "cmis:cmisTypeDocumentDefinitionType";

/// (prefix, URI) pairs bound by [`register_namespaces`]
pub const NAMESPACES: &[(&str, &str)] = &[
    ("app", APP),
    ("atom", ATOM),
    ("cmis", CMIS),
    ("cmisra", CMISRA),
    ("xsi", XSI),
    ("ns3", CMIS_MESSAGING),
    ("type", DOCUMENT_DEFINITION_TYPE),
];

/// Bind the whole table on `ctx`; calling it again changes nothing
pub fn register_namespaces(ctx: &mut XPathContext) {
    for &(prefix, uri) in NAMESPACES {
        ctx.register_namespace(prefix, uri);
    }
}
