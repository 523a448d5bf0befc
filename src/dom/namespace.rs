//! Namespace Resolution
//!
//! Scope-marked prefix table used while building a document. Each open
//! element records where its declarations start in the binding list, so
//! closing it is a single truncate. Prefix ID 0 (the empty string) stands
//! for the default namespace; binding it to URI ID 0 undeclares the default.

use super::strings::StringPool;

/// Well-known namespace URIs
pub mod ns {
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const XMLNS: &str = "http://www.w3.org/2000/xmlns/";
}

#[derive(Debug)]
pub struct NamespaceResolver {
    /// (prefix ID, URI ID), innermost last
    bindings: Vec<(u32, u32)>,
    /// Start of each open element's declarations in `bindings`
    scopes: Vec<usize>,
    /// `xml` and `xmlns` prefix IDs, never rebindable
    reserved: [u32; 2],
}

impl NamespaceResolver {
    /// Resolver with `xml` and `xmlns` pre-bound
    pub fn new(strings: &mut StringPool) -> Self {
        let xml = strings.intern("xml");
        let xmlns = strings.intern("xmlns");
        let bindings = vec![(xml, strings.intern(ns::XML)), (xmlns, strings.intern(ns::XMLNS))];
        NamespaceResolver {
            bindings,
            scopes: Vec::with_capacity(16),
            reserved: [xml, xmlns],
        }
    }

    pub fn push_scope(&mut self) {
        self.scopes.push(self.bindings.len());
    }

    /// Leave an element scope, dropping the bindings it declared
    pub fn pop_scope(&mut self) {
        if let Some(start) = self.scopes.pop() {
            self.bindings.truncate(start);
        }
    }

    /// Bind a prefix in the innermost scope
    pub fn declare(&mut self, prefix_id: u32, uri_id: u32) {
        if !self.reserved.contains(&prefix_id) {
            self.bindings.push((prefix_id, uri_id));
        }
    }

    /// URI ID bound to a prefix, None when unbound
    ///
    /// The default namespace resolves to `Some(0)` when nothing declared it.
    pub fn resolve(&self, prefix_id: u32) -> Option<u32> {
        let uri = self
            .bindings
            .iter()
            .rev()
            .find_map(|&(prefix, uri)| (prefix == prefix_id).then_some(uri));
        match uri {
            None if prefix_id == 0 => Some(0),
            // xmlns:p="" (XML 1.1) unbinds p
            Some(0) if prefix_id != 0 => None,
            other => other,
        }
    }

    /// Number of open element scopes
    pub fn depth(&self) -> usize {
        self.scopes.len()
    }
}
