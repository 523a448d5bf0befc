//! Error types
//!
//! The atom helpers turn these into emptiness; the substrate APIs and the
//! session boundary return them.

use std::io;

/// Malformed XML found by a strict parse, or a rejected tree edit
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum XmlError {
    /// Low-level syntax error reported by the reader
    #[error("syntax error at byte {offset}: {message}")]
    Syntax { message: &'static str, offset: usize },

    #[error("tag mismatch: <{open}> closed with </{close}>")]
    TagMismatch { open: String, close: String },

    #[error("unexpected end tag: </{0}>")]
    UnexpectedEndTag(String),

    #[error("unclosed tag: <{0}>")]
    UnclosedTag(String),

    #[error("document has multiple root elements")]
    MultipleRoots,

    #[error("document has no root element")]
    NoRootElement,

    #[error("text content not allowed at document level")]
    TextOutsideRoot,

    #[error("namespace prefix not bound: {0}")]
    UnboundPrefix(String),

    #[error("duplicate attribute: {0}")]
    DuplicateAttribute(String),

    /// A tree edit that would break the document structure
    #[error("invalid tree operation: {0}")]
    InvalidOperation(&'static str),
}

/// XPath compilation or evaluation failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum XPathError {
    #[error("syntax error: {0}")]
    Syntax(String),

    #[error("namespace prefix not registered: {0}")]
    UnboundPrefix(String),

    #[error("unknown function: {0}()")]
    UnknownFunction(String),

    #[error("{function}() {message}")]
    Argument {
        function: &'static str,
        message: &'static str,
    },

    #[error("union requires two node-sets")]
    UnionOfNonNodeSets,

    /// A location step or predicate applied to a non-node-set value
    #[error("expression does not evaluate to a node-set")]
    NodeSetRequired,

    #[error("variable references are not supported: ${0}")]
    Variable(String),
}

/// Crate-level error
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Xml(#[from] XmlError),

    #[error(transparent)]
    XPath(#[from] XPathError),

    #[error(transparent)]
    Session(#[from] crate::session::SessionError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
