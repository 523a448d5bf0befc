//! XPath 1.0 Engine
//!
//! Subset implementation with:
//! - Ten axes (no following, preceding or namespace)
//! - Namespace-aware name tests, prefixes bound on the context
//! - Core node-set, string, boolean and number functions
//! - Compiled expression caching

pub mod axes;
pub mod compiler;
pub mod context;
pub mod eval;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod value;

pub use compiler::CompiledExpr;
pub use context::XPathContext;
pub use value::{XPathNode, XPathValue};
