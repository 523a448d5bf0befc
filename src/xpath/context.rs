//! XPath Evaluation Context
//!
//! Holds the prefix → namespace URI bindings used by prefixed name tests and
//! an LRU cache of compiled expressions keyed by source text. Changing a
//! binding clears the cache, since compiled expressions embed resolved URIs.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use tracing::trace;

use super::compiler::CompiledExpr;
use super::eval::Evaluator;
use super::value::XPathValue;
use crate::dom::{NodeId, XmlDocument, DOCUMENT_NODE};
use crate::error::XPathError;

/// Compiled expressions kept by `XPathContext::new`
pub const DEFAULT_CACHE_CAPACITY: usize = 64;

pub struct XPathContext {
    namespaces: HashMap<String, String>,
    cache: LruCache<String, Arc<CompiledExpr>>,
}

impl Default for XPathContext {
    fn default() -> Self {
        Self::new()
    }
}

impl XPathContext {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CACHE_CAPACITY)
    }

    /// Context caching up to `capacity` compiled expressions (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        XPathContext {
            namespaces: HashMap::new(),
            cache: LruCache::new(capacity),
        }
    }

    /// Bind `prefix` to `uri`; rebinding to the same URI is a no-op
    pub fn register_namespace(&mut self, prefix: &str, uri: &str) {
        if self.namespaces.get(prefix).is_some_and(|bound| bound == uri) {
            return;
        }
        self.namespaces.insert(prefix.to_string(), uri.to_string());
        self.cache.clear();
    }

    pub fn namespace_uri(&self, prefix: &str) -> Option<&str> {
        self.namespaces.get(prefix).map(String::as_str)
    }

    /// Registered (prefix, URI) pairs, unordered
    pub fn namespaces(&self) -> impl Iterator<Item = (&str, &str)> {
        self.namespaces.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    /// Compiled form of `expr`, from the cache when possible
    pub fn compile(&mut self, expr: &str) -> Result<Arc<CompiledExpr>, XPathError> {
        if let Some(compiled) = self.cache.get(expr) {
            return Ok(Arc::clone(compiled));
        }
        let compiled = Arc::new(CompiledExpr::from_source(expr, &self.namespaces)?);
        trace!(expr, ops = compiled.ops.len(), "compiled xpath expression");
        self.cache.put(expr.to_string(), Arc::clone(&compiled));
        Ok(compiled)
    }

    /// Evaluate with the document node as context node
    pub fn evaluate(&mut self, doc: &XmlDocument, expr: &str) -> Result<XPathValue, XPathError> {
        self.evaluate_from(doc, DOCUMENT_NODE, expr)
    }

    /// Evaluate with `node` as context node, for relative lookups
    pub fn evaluate_from(&mut self, doc: &XmlDocument, node: NodeId, expr: &str) -> Result<XPathValue, XPathError> {
        let compiled = self.compile(expr)?;
        Evaluator::new(doc).evaluate(&compiled, node)
    }

    /// Number of cached compiled expressions
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}

impl std::fmt::Debug for XPathContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("XPathContext")
            .field("namespaces", &self.namespaces)
            .field("cached", &self.cache.len())
            .finish()
    }
}
