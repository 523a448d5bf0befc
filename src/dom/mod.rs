//! DOM Module - Arena-based XML Document
//!
//! - Arena allocation for nodes, addressed by `NodeId` (u32)
//! - Owned string interning for names, text and namespace URIs
//! - Namespace resolution stack used while building
//! - Tree mutation and cross-document node import
//! - Serialization back to markup

pub mod document;
pub mod namespace;
pub mod node;
pub mod serialize;
pub mod strings;

pub use document::{ChildIter, DescendantIter, XmlDocument};
pub use node::{NodeId, NodeKind, XmlAttribute, XmlNode, DOCUMENT_NODE};
pub use strings::StringPool;
