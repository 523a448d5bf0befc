//! XML Document
//!
//! Arena-based DOM. Node 0 is the document node; everything else is linked
//! through parent, child and sibling IDs. The document owns all of its
//! strings, so it can be edited after parsing and nodes can be copied
//! between documents.

use super::namespace::{ns, NamespaceResolver};
use super::node::{NodeId, NodeKind, XmlAttribute, XmlNode, DOCUMENT_NODE};
use super::strings::StringPool;
use crate::core::attributes::{is_whitespace, Attribute};
use crate::error::XmlError;
use crate::reader::{SliceReader, StartElement, XmlEvent};

/// A parsed or constructed XML document
#[derive(Debug, Clone)]
pub struct XmlDocument {
    nodes: Vec<XmlNode>,
    attributes: Vec<XmlAttribute>,
    strings: StringPool,
    version: String,
    encoding: Option<String>,
    standalone: Option<bool>,
}

impl Default for XmlDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl XmlDocument {
    /// Empty document (version "1.0") with no root element
    pub fn new() -> Self {
        let mut nodes = Vec::with_capacity(64);
        nodes.push(XmlNode::document());
        XmlDocument {
            nodes,
            attributes: Vec::with_capacity(32),
            strings: StringPool::new(),
            version: "1.0".to_string(),
            encoding: None,
            standalone: None,
        }
    }

    /// Parse a document, recovering from malformed input (never fails)
    pub fn parse(input: &[u8]) -> Self {
        let mut doc = Self::new();
        // Lenient mode never reports
        let _ = doc.build_from_events(input, false);
        doc
    }

    /// Parse a document, rejecting anything that is not well-formed
    pub fn parse_strict(input: &[u8]) -> Result<Self, XmlError> {
        let mut doc = Self::new();
        doc.build_from_events(input, true)?;
        Ok(doc)
    }

    fn build_from_events(&mut self, input: &[u8], strict: bool) -> Result<(), XmlError> {
        let mut reader = if strict {
            SliceReader::new_strict(input)
        } else {
            SliceReader::new(input)
        };
        let mut resolver = NamespaceResolver::new(&mut self.strings);
        // Open elements and the names they were opened with
        let mut stack: Vec<(NodeId, &[u8])> = Vec::new();
        let mut seen_root = false;
        // Adjacent text events of the current parent, interned once per run
        let mut text = String::new();

        while let Some(event) = reader.next_event() {
            let parent = stack.last().map_or(DOCUMENT_NODE, |&(id, _)| id);
            match event {
                XmlEvent::StartElement(elem) => {
                    self.flush_text(parent, &mut text);
                    let id = self.open_element(&elem, parent, strict, &mut seen_root, &mut resolver)?;
                    stack.push((id, elem.name));
                }

                XmlEvent::EmptyElement(elem) => {
                    self.flush_text(parent, &mut text);
                    self.open_element(&elem, parent, strict, &mut seen_root, &mut resolver)?;
                    resolver.pop_scope();
                }

                XmlEvent::EndElement(end) => {
                    if strict {
                        self.flush_text(parent, &mut text);
                        match stack.pop() {
                            Some((_, open)) if open == end.name => {}
                            Some((_, open)) => {
                                return Err(XmlError::TagMismatch {
                                    open: String::from_utf8_lossy(open).into_owned(),
                                    close: String::from_utf8_lossy(end.name).into_owned(),
                                });
                            }
                            None => {
                                return Err(XmlError::UnexpectedEndTag(
                                    String::from_utf8_lossy(end.name).into_owned(),
                                ));
                            }
                        }
                        resolver.pop_scope();
                    } else if let Some(pos) = stack.iter().rposition(|&(_, open)| open == end.name) {
                        self.flush_text(parent, &mut text);
                        // Close everything opened since the matching start tag
                        for _ in pos..stack.len() {
                            resolver.pop_scope();
                        }
                        stack.truncate(pos);
                    }
                }

                XmlEvent::Text(content) => {
                    if parent == DOCUMENT_NODE {
                        if strict && !content.iter().all(|&b| is_whitespace(b)) {
                            return Err(XmlError::TextOutsideRoot);
                        }
                        continue;
                    }
                    text.push_str(&String::from_utf8_lossy(&content));
                }

                XmlEvent::CData(content) => {
                    if parent == DOCUMENT_NODE {
                        if strict {
                            return Err(XmlError::TextOutsideRoot);
                        }
                        continue;
                    }
                    self.flush_text(parent, &mut text);
                    let value_id = self.strings.intern_bytes(content);
                    let id = self.push_node(XmlNode::character_data(NodeKind::CData, value_id));
                    self.link_child(parent, id);
                }

                XmlEvent::Comment(content) => {
                    self.flush_text(parent, &mut text);
                    let value_id = self.strings.intern_bytes(content);
                    let id = self.push_node(XmlNode::character_data(NodeKind::Comment, value_id));
                    self.link_child(parent, id);
                }

                XmlEvent::ProcessingInstruction { target, data } => {
                    self.flush_text(parent, &mut text);
                    let target_id = self.strings.intern_bytes(target);
                    let data_id = data.map_or(0, |d| self.strings.intern_bytes(d));
                    let id = self.push_node(XmlNode::processing_instruction(target_id, data_id));
                    self.link_child(parent, id);
                }

                XmlEvent::XmlDeclaration {
                    version,
                    encoding,
                    standalone,
                } => {
                    self.version = String::from_utf8_lossy(&version).into_owned();
                    self.encoding = encoding.map(|e| String::from_utf8_lossy(&e).into_owned());
                    self.standalone = standalone;
                }

                XmlEvent::DocType(_) => {}

                XmlEvent::EndDocument => break,
            }
        }
        let parent = stack.last().map_or(DOCUMENT_NODE, |&(id, _)| id);
        self.flush_text(parent, &mut text);

        if !strict {
            return Ok(());
        }
        if let Some(err) = reader.error() {
            return Err(err.clone());
        }
        if let Some(&(_, open)) = stack.last() {
            return Err(XmlError::UnclosedTag(String::from_utf8_lossy(open).into_owned()));
        }
        if !seen_root {
            return Err(XmlError::NoRootElement);
        }
        Ok(())
    }

    /// Create an element for a start tag, declaring its namespaces
    ///
    /// Leaves the element's namespace scope open.
    fn open_element(
        &mut self,
        elem: &StartElement<'_>,
        parent: NodeId,
        strict: bool,
        seen_root: &mut bool,
        resolver: &mut NamespaceResolver,
    ) -> Result<NodeId, XmlError> {
        if parent == DOCUMENT_NODE {
            if *seen_root && strict {
                return Err(XmlError::MultipleRoots);
            }
            *seen_root = true;
        }
        if strict {
            if let Some(dup) = find_duplicate_attribute(&elem.attributes) {
                return Err(XmlError::DuplicateAttribute(dup));
            }
        }

        resolver.push_scope();
        for attr in &elem.attributes {
            if let Some(prefix) = attr.declared_prefix() {
                let prefix_id = self.strings.intern_bytes(prefix);
                let uri_id = self.strings.intern_bytes(&attr.value);
                resolver.declare(prefix_id, uri_id);
            }
        }

        let namespace_id = self.resolve_prefix(elem.prefix(), resolver, strict)?;
        let name_id = self.strings.intern_bytes(elem.name);
        let mut node = XmlNode::element(name_id, namespace_id);
        node.attr_start = self.attributes.len() as u32;

        for attr in &elem.attributes {
            let attr_name_id = self.strings.intern_bytes(attr.name);
            let value_id = self.strings.intern_bytes(&attr.value);
            let stored = if attr.declared_prefix().is_some() {
                XmlAttribute::namespace_decl(attr_name_id, value_id)
            } else {
                // Unprefixed attributes are in no namespace
                let namespace_id = match attr.prefix() {
                    Some(prefix) => self.resolve_prefix(Some(prefix), resolver, strict)?,
                    None => 0,
                };
                XmlAttribute::new(attr_name_id, namespace_id, value_id)
            };
            self.attributes.push(stored);
            node.attr_count += 1;
        }

        let id = self.push_node(node);
        self.link_child(parent, id);
        Ok(id)
    }

    fn resolve_prefix(
        &mut self,
        prefix: Option<&[u8]>,
        resolver: &NamespaceResolver,
        strict: bool,
    ) -> Result<u32, XmlError> {
        let prefix_id = prefix.map_or(0, |p| self.strings.intern_bytes(p));
        match resolver.resolve(prefix_id) {
            Some(uri_id) => Ok(uri_id),
            None if strict => Err(XmlError::UnboundPrefix(self.strings.get(prefix_id).to_string())),
            None => Ok(0),
        }
    }

    /// Turn a pending text run into one text node under `parent`
    fn flush_text(&mut self, parent: NodeId, text: &mut String) {
        if text.is_empty() {
            return;
        }
        let value_id = self.strings.intern(text);
        let id = self.push_node(XmlNode::character_data(NodeKind::Text, value_id));
        self.link_child(parent, id);
        text.clear();
    }

    fn push_node(&mut self, node: XmlNode) -> NodeId {
        let id = self.nodes.len() as NodeId;
        self.nodes.push(node);
        id
    }

    /// Link a detached node as the last child of `parent`
    fn link_child(&mut self, parent: NodeId, child: NodeId) {
        let prev = self.nodes[parent as usize].last_child;
        {
            let node = &mut self.nodes[child as usize];
            node.parent = Some(parent);
            node.prev_sibling = prev;
            node.next_sibling = None;
        }
        match prev {
            Some(prev) => self.nodes[prev as usize].next_sibling = Some(child),
            None => self.nodes[parent as usize].first_child = Some(child),
        }
        self.nodes[parent as usize].last_child = Some(child);
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    /// First element child of the document node
    pub fn root_element_id(&self) -> Option<NodeId> {
        self.children(DOCUMENT_NODE).find(|&id| self.nodes[id as usize].is_element())
    }

    pub fn root_element(&self) -> Option<&XmlNode> {
        self.root_element_id().and_then(|id| self.get_node(id))
    }

    pub fn get_node(&self, id: NodeId) -> Option<&XmlNode> {
        self.nodes.get(id as usize)
    }

    pub fn node_kind(&self, id: NodeId) -> Option<NodeKind> {
        self.get_node(id).map(|n| n.kind)
    }

    /// Qualified name of an element, target of a PI
    pub fn node_name(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Element | NodeKind::ProcessingInstruction => Some(self.strings.get(node.name_id)),
            _ => None,
        }
    }

    /// Name without its prefix
    pub fn node_local_name(&self, id: NodeId) -> Option<&str> {
        self.node_name(id).map(local_part)
    }

    /// Prefix of an element name, None when unprefixed
    pub fn node_prefix(&self, id: NodeId) -> Option<&str> {
        if self.node_kind(id)? != NodeKind::Element {
            return None;
        }
        self.node_name(id)?.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Resolved namespace URI of an element, None when in no namespace
    pub fn node_namespace_uri(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        (node.is_element() && node.namespace_id != 0).then(|| self.strings.get(node.namespace_id))
    }

    /// Own content of a text, CDATA, comment or PI node
    pub fn node_value(&self, id: NodeId) -> Option<&str> {
        let node = self.get_node(id)?;
        match node.kind {
            NodeKind::Text | NodeKind::CData | NodeKind::Comment | NodeKind::ProcessingInstruction => {
                Some(self.strings.get(node.value_id))
            }
            _ => None,
        }
    }

    /// String value: descendant text and CDATA for elements and the
    /// document, own content for everything else
    pub fn text_content(&self, id: NodeId) -> String {
        match self.node_kind(id) {
            Some(NodeKind::Element | NodeKind::Document) => {
                let mut out = String::new();
                for d in self.descendants(id) {
                    let node = &self.nodes[d as usize];
                    if node.is_text() {
                        out.push_str(self.strings.get(node.value_id));
                    }
                }
                out
            }
            Some(_) => self.node_value(id).unwrap_or_default().to_string(),
            None => String::new(),
        }
    }

    pub fn parent_of(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.parent
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.next_sibling
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get_node(id)?.prev_sibling
    }

    pub fn children(&self, id: NodeId) -> ChildIter<'_> {
        ChildIter {
            doc: self,
            next: self.get_node(id).and_then(|n| n.first_child),
        }
    }

    /// Descendants in document order, `id` itself excluded
    pub fn descendants(&self, id: NodeId) -> DescendantIter<'_> {
        let mut iter = DescendantIter {
            doc: self,
            stack: Vec::new(),
        };
        iter.push_children(id);
        iter
    }

    /// All attributes of an element, namespace declarations included
    pub fn attributes(&self, id: NodeId) -> &[XmlAttribute] {
        match self.get_node(id) {
            Some(node) if node.is_element() => self.attributes.get(node.attr_range()).unwrap_or(&[]),
            _ => &[],
        }
    }

    pub fn attribute_name(&self, attr: &XmlAttribute) -> &str {
        self.strings.get(attr.name_id)
    }

    pub fn attribute_local_name(&self, attr: &XmlAttribute) -> &str {
        local_part(self.strings.get(attr.name_id))
    }

    pub fn attribute_value(&self, attr: &XmlAttribute) -> &str {
        self.strings.get(attr.value_id)
    }

    pub fn attribute_namespace_uri(&self, attr: &XmlAttribute) -> Option<&str> {
        (attr.namespace_id != 0).then(|| self.strings.get(attr.namespace_id))
    }

    /// Attribute value by qualified name
    pub fn get_attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| self.attribute_name(a) == name)
            .map(|a| self.attribute_value(a))
    }

    /// Attribute value by namespace URI and local name
    pub fn get_attribute_ns(&self, id: NodeId, namespace_uri: Option<&str>, local_name: &str) -> Option<&str> {
        self.attributes(id)
            .iter()
            .find(|a| {
                !a.is_namespace_decl
                    && self.attribute_local_name(a) == local_name
                    && self.attribute_namespace_uri(a) == namespace_uri
            })
            .map(|a| self.attribute_value(a))
    }

    /// URI bound to `prefix` at `id`, `""` asks for the default namespace
    pub fn lookup_namespace(&self, id: NodeId, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(ns::XML);
        }
        let mut current = Some(id);
        while let Some(node_id) = current {
            for attr in self.attributes(node_id).iter().filter(|a| a.is_namespace_decl) {
                if declared_prefix(self.attribute_name(attr)) == prefix {
                    let uri = self.attribute_value(attr);
                    return (!uri.is_empty()).then_some(uri);
                }
            }
            current = self.parent_of(node_id);
        }
        None
    }

    /// Every (prefix, URI) binding in scope at `id`, nearest declaration
    /// first; `""` is the default namespace
    pub fn in_scope_namespaces(&self, id: NodeId) -> Vec<(&str, &str)> {
        let mut seen: Vec<&str> = Vec::new();
        let mut bindings = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            for attr in self.attributes(node_id).iter().filter(|a| a.is_namespace_decl) {
                let prefix = declared_prefix(self.attribute_name(attr));
                if seen.contains(&prefix) {
                    continue;
                }
                seen.push(prefix);
                let uri = self.attribute_value(attr);
                if !uri.is_empty() {
                    bindings.push((prefix, uri));
                }
            }
            current = self.parent_of(node_id);
        }
        bindings
    }

    pub fn strings(&self) -> &StringPool {
        &self.strings
    }

    /// Arena size, detached nodes included
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    pub fn standalone(&self) -> Option<bool> {
        self.standalone
    }

    /// True when `ancestor` is `id` or one of its ancestors
    pub fn is_ancestor_or_self(&self, ancestor: NodeId, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node_id) = current {
            if node_id == ancestor {
                return true;
            }
            current = self.parent_of(node_id);
        }
        false
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    fn require(&self, id: NodeId) -> Result<&XmlNode, XmlError> {
        self.get_node(id).ok_or(XmlError::InvalidOperation("unknown node"))
    }

    fn require_element(&self, id: NodeId) -> Result<&XmlNode, XmlError> {
        match self.require(id)? {
            node if node.is_element() => Ok(node),
            _ => Err(XmlError::InvalidOperation("node is not an element")),
        }
    }

    /// New detached element
    ///
    /// A namespace URI is recorded on the node; declare it with
    /// `set_attribute("xmlns...")` if the serialized form needs it.
    pub fn create_element(&mut self, name: &str, namespace_uri: Option<&str>) -> NodeId {
        let name_id = self.strings.intern(name);
        let namespace_id = namespace_uri.map_or(0, |uri| self.strings.intern(uri));
        self.push_node(XmlNode::element(name_id, namespace_id))
    }

    /// New detached text node
    pub fn create_text(&mut self, text: &str) -> NodeId {
        let value_id = self.strings.intern(text);
        self.push_node(XmlNode::character_data(NodeKind::Text, value_id))
    }

    /// Move `child` (and its subtree) to the end of `parent`'s children
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), XmlError> {
        let parent_kind = self.require(parent)?.kind;
        let child_kind = self.require(child)?.kind;
        if !matches!(parent_kind, NodeKind::Element | NodeKind::Document) {
            return Err(XmlError::InvalidOperation("parent cannot have children"));
        }
        if child_kind == NodeKind::Document {
            return Err(XmlError::InvalidOperation("document node cannot be a child"));
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(XmlError::InvalidOperation("node cannot contain itself"));
        }
        if parent == DOCUMENT_NODE {
            if matches!(child_kind, NodeKind::Text | NodeKind::CData) {
                return Err(XmlError::TextOutsideRoot);
            }
            if child_kind == NodeKind::Element && self.root_element_id().is_some_and(|r| r != child) {
                return Err(XmlError::MultipleRoots);
            }
        }
        self.detach(child);
        self.link_child(parent, child);
        Ok(())
    }

    /// Unlink a node from its parent and siblings; it stays in the arena
    pub fn detach(&mut self, id: NodeId) {
        let Some(node) = self.get_node(id) else {
            return;
        };
        let (parent, prev, next) = (node.parent, node.prev_sibling, node.next_sibling);
        let Some(parent) = parent else {
            return;
        };

        match prev {
            Some(prev) => self.nodes[prev as usize].next_sibling = next,
            None => self.nodes[parent as usize].first_child = next,
        }
        match next {
            Some(next) => self.nodes[next as usize].prev_sibling = prev,
            None => self.nodes[parent as usize].last_child = prev,
        }
        let node = &mut self.nodes[id as usize];
        node.parent = None;
        node.prev_sibling = None;
        node.next_sibling = None;
    }

    /// Replace an element's children with one text node, or a character
    /// data node's content
    pub fn set_text(&mut self, id: NodeId, text: &str) -> Result<(), XmlError> {
        match self.require(id)?.kind {
            NodeKind::Element => {
                while let Some(child) = self.nodes[id as usize].first_child {
                    self.detach(child);
                }
                if !text.is_empty() {
                    let text_id = self.create_text(text);
                    self.link_child(id, text_id);
                }
                Ok(())
            }
            NodeKind::Text | NodeKind::CData | NodeKind::Comment | NodeKind::ProcessingInstruction => {
                self.nodes[id as usize].value_id = self.strings.intern(text);
                Ok(())
            }
            NodeKind::Document => Err(XmlError::InvalidOperation("document node has no text")),
        }
    }

    /// Set or replace an attribute
    ///
    /// `xmlns` and `xmlns:p` names declare namespaces; other prefixed names
    /// must be bound at this element.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: &str) -> Result<(), XmlError> {
        let range = self.require_element(id)?.attr_range();
        let is_decl = name == "xmlns" || name.starts_with("xmlns:");

        let namespace_id = match name.split_once(':') {
            Some((prefix, _)) if !is_decl => {
                let uri = self
                    .lookup_namespace(id, prefix)
                    .ok_or_else(|| XmlError::UnboundPrefix(prefix.to_string()))?
                    .to_string();
                self.strings.intern(&uri)
            }
            _ => 0,
        };

        let name_id = self.strings.intern(name);
        let value_id = self.strings.intern(value);
        if let Some(existing) = self.attributes[range].iter_mut().find(|a| a.name_id == name_id) {
            existing.value_id = value_id;
            existing.namespace_id = namespace_id;
            return Ok(());
        }

        let attr = if is_decl {
            XmlAttribute::namespace_decl(name_id, value_id)
        } else {
            XmlAttribute::new(name_id, namespace_id, value_id)
        };
        self.push_attribute(id, attr);
        Ok(())
    }

    /// Append to an element's attribute run, moving the run to the end of
    /// the arena first when another element's run follows it
    fn push_attribute(&mut self, id: NodeId, attr: XmlAttribute) {
        let range = self.nodes[id as usize].attr_range();
        if range.is_empty() {
            self.nodes[id as usize].attr_start = self.attributes.len() as u32;
        } else if range.end != self.attributes.len() {
            let start = self.attributes.len() as u32;
            self.attributes.extend_from_within(range);
            self.nodes[id as usize].attr_start = start;
        }
        self.attributes.push(attr);
        self.nodes[id as usize].attr_count += 1;
    }

    /// Make `id` the root element, returning the detached previous root
    pub fn set_root_element(&mut self, id: NodeId) -> Result<Option<NodeId>, XmlError> {
        self.require_element(id)?;
        let old = self.root_element_id();
        if old == Some(id) {
            return Ok(None);
        }
        if let Some(old) = old {
            self.detach(old);
        }
        self.detach(id);
        self.link_child(DOCUMENT_NODE, id);
        Ok(old)
    }

    /// Deep copy a node of `source` into this document, detached
    ///
    /// Returns None when `id` does not exist in `source` or is its document
    /// node. Namespace URIs are carried over as resolved; declarations
    /// inherited from ancestors of `id` are not copied.
    pub fn import_node(&mut self, source: &XmlDocument, id: NodeId) -> Option<NodeId> {
        if source.node_kind(id)? == NodeKind::Document {
            return None;
        }
        let root = self.copy_single(source, id);
        // Preorder copy keeps the new IDs in document order
        let mut pending: Vec<(NodeId, NodeId)> = source.children(id).map(|c| (c, root)).collect();
        pending.reverse();
        while let Some((src, dst_parent)) = pending.pop() {
            let copy = self.copy_single(source, src);
            self.link_child(dst_parent, copy);
            let start = pending.len();
            pending.extend(source.children(src).map(|c| (c, copy)));
            pending[start..].reverse();
        }
        Some(root)
    }

    /// Copy one node and its attributes, without children
    fn copy_single(&mut self, source: &XmlDocument, id: NodeId) -> NodeId {
        let src = &source.nodes[id as usize];
        let src_strings = &source.strings;
        let intern = |pool: &mut StringPool, sid: u32| pool.intern(src_strings.get(sid));

        let mut node = match src.kind {
            NodeKind::Element => XmlNode::element(
                intern(&mut self.strings, src.name_id),
                intern(&mut self.strings, src.namespace_id),
            ),
            NodeKind::ProcessingInstruction => XmlNode::processing_instruction(
                intern(&mut self.strings, src.name_id),
                intern(&mut self.strings, src.value_id),
            ),
            kind => XmlNode::character_data(kind, intern(&mut self.strings, src.value_id)),
        };

        if src.is_element() {
            node.attr_start = self.attributes.len() as u32;
            for attr in source.attributes(id) {
                self.attributes.push(XmlAttribute {
                    name_id: intern(&mut self.strings, attr.name_id),
                    namespace_id: intern(&mut self.strings, attr.namespace_id),
                    value_id: intern(&mut self.strings, attr.value_id),
                    is_namespace_decl: attr.is_namespace_decl,
                });
                node.attr_count += 1;
            }
        }
        self.push_node(node)
    }
}

/// Part of a qualified name after the colon
fn local_part(name: &str) -> &str {
    name.split_once(':').map_or(name, |(_, local)| local)
}

/// Prefix declared by an `xmlns`/`xmlns:p` attribute name
fn declared_prefix(name: &str) -> &str {
    name.strip_prefix("xmlns:").unwrap_or("")
}

fn find_duplicate_attribute(attrs: &[Attribute<'_>]) -> Option<String> {
    attrs.iter().enumerate().find_map(|(i, a)| {
        attrs[i + 1..]
            .iter()
            .any(|b| b.name == a.name)
            .then(|| String::from_utf8_lossy(a.name).into_owned())
    })
}

/// Iterator over child nodes
pub struct ChildIter<'d> {
    doc: &'d XmlDocument,
    next: Option<NodeId>,
}

impl Iterator for ChildIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = self.doc.next_sibling(current);
        Some(current)
    }
}

/// Iterator over descendant nodes (depth-first, document order)
pub struct DescendantIter<'d> {
    doc: &'d XmlDocument,
    stack: Vec<NodeId>,
}

impl DescendantIter<'_> {
    /// Push children in reverse so the first child pops first
    fn push_children(&mut self, id: NodeId) {
        let mut child = self.doc.get_node(id).and_then(|n| n.last_child);
        while let Some(c) = child {
            self.stack.push(c);
            child = self.doc.prev_sibling(c);
        }
    }
}

impl Iterator for DescendantIter<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        self.push_children(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTRY: &[u8] = br#"<?xml version="1.0" encoding="UTF-8"?>
<atom:feed xmlns:atom="http://www.w3.org/2005/Atom" xmlns:cmis="http://docs.oasis-open.org/ns/cmis/core/200908/">
  <atom:entry>
    <atom:title>Report &amp; notes</atom:title>
    <atom:link rel="self" href="http://host/obj/1"/>
    <cmis:properties><![CDATA[raw]]><!-- c --></cmis:properties>
  </atom:entry>
</atom:feed>"#;

    fn first_element(doc: &XmlDocument, parent: NodeId, local: &str) -> NodeId {
        doc.children(parent)
            .find(|&c| doc.node_local_name(c) == Some(local))
            .unwrap()
    }

    #[test]
    fn test_parse_simple() {
        let doc = XmlDocument::parse(b"<root>hello</root>");
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.node_name(root), Some("root"));
        assert_eq!(doc.text_content(root), "hello");
        assert_eq!(doc.version(), "1.0");
    }

    #[test]
    fn test_descendants_in_document_order() {
        let doc = XmlDocument::parse(b"<root><a/><b><c/></b><d/></root>");
        let root = doc.root_element_id().unwrap();
        let names: Vec<_> = doc.descendants(root).filter_map(|id| doc.node_name(id)).collect();
        assert_eq!(names, ["a", "b", "c", "d"]);
    }

    #[test]
    fn test_siblings() {
        let doc = XmlDocument::parse(b"<root><a/><b/><c/></root>");
        let root = doc.root_element_id().unwrap();
        let children: Vec<_> = doc.children(root).collect();
        assert_eq!(children.len(), 3);
        assert_eq!(doc.prev_sibling(children[0]), None);
        assert_eq!(doc.next_sibling(children[0]), Some(children[1]));
        assert_eq!(doc.parent_of(children[2]), Some(root));
    }

    #[test]
    fn test_namespaces_resolved() {
        let doc = XmlDocument::parse_strict(ENTRY).unwrap();
        let feed = doc.root_element_id().unwrap();
        assert_eq!(doc.node_prefix(feed), Some("atom"));
        assert_eq!(doc.node_local_name(feed), Some("feed"));
        assert_eq!(doc.node_namespace_uri(feed), Some("http://www.w3.org/2005/Atom"));
        assert_eq!(doc.encoding(), Some("UTF-8"));

        let entry = first_element(&doc, feed, "entry");
        let props = first_element(&doc, entry, "properties");
        assert_eq!(
            doc.node_namespace_uri(props),
            Some("http://docs.oasis-open.org/ns/cmis/core/200908/")
        );
        assert_eq!(doc.lookup_namespace(props, "atom"), Some("http://www.w3.org/2005/Atom"));
        assert_eq!(doc.in_scope_namespaces(props).len(), 2);
    }

    #[test]
    fn test_default_namespace_not_applied_to_attributes() {
        let doc = XmlDocument::parse(b"<feed xmlns=\"urn:a\" xmlns:x=\"urn:x\" rel=\"r\" x:id=\"1\"/>");
        let feed = doc.root_element_id().unwrap();
        assert_eq!(doc.node_namespace_uri(feed), Some("urn:a"));
        assert_eq!(doc.node_prefix(feed), None);
        let attrs: Vec<_> = doc.attributes(feed).iter().filter(|a| !a.is_namespace_decl).collect();
        assert_eq!(attrs.len(), 2);
        assert_eq!(doc.attribute_namespace_uri(attrs[0]), None);
        assert_eq!(doc.attribute_namespace_uri(attrs[1]), Some("urn:x"));
        assert_eq!(doc.get_attribute_ns(feed, Some("urn:x"), "id"), Some("1"));
    }

    #[test]
    fn test_text_content_and_values() {
        let doc = XmlDocument::parse(ENTRY);
        let feed = doc.root_element_id().unwrap();
        let entry = first_element(&doc, feed, "entry");
        let title = first_element(&doc, entry, "title");
        assert_eq!(doc.text_content(title), "Report & notes");

        let link = first_element(&doc, entry, "link");
        assert_eq!(doc.get_attribute(link, "href"), Some("http://host/obj/1"));
        assert_eq!(doc.get_attribute(link, "missing"), None);

        let props = first_element(&doc, entry, "properties");
        // CDATA counts, comments do not
        assert_eq!(doc.text_content(props), "raw");
        let comment = doc.children(props).nth(1).unwrap();
        assert_eq!(doc.node_kind(comment), Some(NodeKind::Comment));
        assert_eq!(doc.node_value(comment), Some(" c "));
    }

    #[test]
    fn test_strict_errors() {
        let cases: [(&[u8], fn(&XmlError) -> bool); 7] = [
            (b"<a><b></a>", |e| matches!(e, XmlError::TagMismatch { .. })),
            (b"<a></a></b>", |e| matches!(e, XmlError::UnexpectedEndTag(_))),
            (b"<a><b>", |e| matches!(e, XmlError::UnclosedTag(_))),
            (b"<a/><b/>", |e| matches!(e, XmlError::MultipleRoots)),
            (b"text<a/>", |e| matches!(e, XmlError::TextOutsideRoot)),
            (b"<p:a/>", |e| matches!(e, XmlError::UnboundPrefix(p) if p == "p")),
            (b"<a x=\"1\" x=\"2\"/>", |e| matches!(e, XmlError::DuplicateAttribute(_))),
        ];
        for (input, check) in cases {
            let err = XmlDocument::parse_strict(input).unwrap_err();
            assert!(check(&err), "unexpected {err:?} for {}", String::from_utf8_lossy(input));
        }
        assert!(matches!(XmlDocument::parse_strict(b"<!-- only -->"), Err(XmlError::NoRootElement)));
        assert!(matches!(XmlDocument::parse_strict(b"<a>&bad;</a>"), Err(XmlError::Syntax { .. })));
    }

    #[test]
    fn test_lenient_recovery() {
        let doc = XmlDocument::parse(b"<a><b>one</a><p:c>two");
        let a = doc.root_element_id().unwrap();
        assert_eq!(doc.text_content(a), "one");
        // The stray second root is kept after the first
        let roots: Vec<_> = doc.children(DOCUMENT_NODE).collect();
        assert_eq!(roots.len(), 2);
        assert_eq!(doc.node_namespace_uri(roots[1]), None);

        let doc = XmlDocument::parse(b"<a>1 < 2</a>");
        let a = doc.root_element_id().unwrap();
        assert_eq!(doc.children(a).count(), 1);
        assert_eq!(doc.text_content(a), "1 < 2");
    }

    #[test]
    fn test_adjacent_text_interned_once() {
        // Every stray '<' and unmatched end tag splits the reader's text
        let mut input = String::from("<a>");
        for _ in 0..1_000 {
            input.push_str("x < y</b>");
        }
        input.push_str("</a>");

        let doc = XmlDocument::parse(input.as_bytes());
        let a = doc.root_element_id().unwrap();
        assert_eq!(doc.children(a).count(), 1);
        assert_eq!(doc.text_content(a), "x < y".repeat(1_000));
        // "", xml, xmlns, their URIs, "a" and the single merged run
        assert_eq!(doc.strings().len(), 7);
    }

    #[test]
    fn test_build_tree() {
        let mut doc = XmlDocument::new();
        let root = doc.create_element("atom:entry", Some("http://www.w3.org/2005/Atom"));
        doc.set_attribute(root, "xmlns:atom", "http://www.w3.org/2005/Atom").unwrap();
        assert_eq!(doc.set_root_element(root).unwrap(), None);

        let title = doc.create_element("atom:title", Some("http://www.w3.org/2005/Atom"));
        doc.append_child(root, title).unwrap();
        doc.set_text(title, "first").unwrap();
        doc.set_text(title, "second").unwrap();
        assert_eq!(doc.text_content(title), "second");
        assert_eq!(doc.children(title).count(), 1);

        doc.set_attribute(title, "atom:type", "text").unwrap();
        assert_eq!(
            doc.get_attribute_ns(title, Some("http://www.w3.org/2005/Atom"), "type"),
            Some("text")
        );
        assert!(matches!(
            doc.set_attribute(title, "q:x", "1"),
            Err(XmlError::UnboundPrefix(_))
        ));
    }

    #[test]
    fn test_set_attribute_relocates_run() {
        let mut doc = XmlDocument::parse(b"<r><a x=\"1\"/><b y=\"2\"/></r>");
        let r = doc.root_element_id().unwrap();
        let a = doc.children(r).next().unwrap();
        let b = doc.children(r).nth(1).unwrap();

        doc.set_attribute(a, "z", "3").unwrap();
        doc.set_attribute(a, "x", "9").unwrap();
        assert_eq!(doc.get_attribute(a, "x"), Some("9"));
        assert_eq!(doc.get_attribute(a, "z"), Some("3"));
        assert_eq!(doc.attributes(a).len(), 2);
        assert_eq!(doc.get_attribute(b, "y"), Some("2"));
        assert_eq!(doc.attributes(b).len(), 1);
    }

    #[test]
    fn test_append_child_guards() {
        let mut doc = XmlDocument::parse(b"<a><b/></a>");
        let a = doc.root_element_id().unwrap();
        let b = doc.children(a).next().unwrap();
        assert!(doc.append_child(b, a).is_err());
        assert!(doc.append_child(b, b).is_err());

        let other = doc.create_element("c", None);
        assert!(matches!(doc.append_child(DOCUMENT_NODE, other), Err(XmlError::MultipleRoots)));
        let text = doc.create_text("x");
        assert!(matches!(doc.append_child(DOCUMENT_NODE, text), Err(XmlError::TextOutsideRoot)));

        // Moving a node detaches it from its old parent
        doc.append_child(other, b).unwrap();
        assert_eq!(doc.children(a).count(), 0);
        assert_eq!(doc.parent_of(b), Some(other));
    }

    #[test]
    fn test_import_node_is_deep_and_independent() {
        let source = XmlDocument::parse(ENTRY);
        let feed = source.root_element_id().unwrap();
        let entry = first_element(&source, feed, "entry");

        let mut target = XmlDocument::new();
        let copy = target.import_node(&source, entry).unwrap();
        assert_eq!(target.parent_of(copy), None);
        target.set_root_element(copy).unwrap();

        assert_eq!(target.node_name(copy), Some("atom:entry"));
        assert_eq!(target.node_namespace_uri(copy), Some("http://www.w3.org/2005/Atom"));
        assert_eq!(target.text_content(copy), source.text_content(entry));

        let link = first_element(&target, copy, "link");
        target.set_attribute(link, "href", "changed").unwrap();
        let src_link = first_element(&source, entry, "link");
        assert_eq!(source.get_attribute(src_link, "href"), Some("http://host/obj/1"));

        assert_eq!(target.import_node(&source, DOCUMENT_NODE), None);
        assert_eq!(target.import_node(&source, 10_000), None);
    }
}
