//! Arc-backed in-memory node tree implementing [`StoredNode`].
//!
//! Used by [`crate::storage::MemoryStore`] for loaded documents and by tests
//! that need small hand-built trees:
//! ```
//! use nxdb_xpath::simple_node::{doc, elem, text};
//! use nxdb_xpath::StoredNode;
//!
//! // <book><price>12</price><price>abc</price></book>
//! let d = doc()
//!     .child(elem("book")
//!         .child(elem("price").child(text("12")))
//!         .child(elem("price").child(text("abc"))))
//!     .build();
//! let book = d.children()[0].clone();
//! assert_eq!(book.children().len(), 2);
//! assert_eq!(book.string_value(), "12abc");
//! assert!(book.is_parent_of(&book.children()[1]));
//! ```
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use crate::model::{DocumentId, NodeKind, QName, StoredNode};

pub(crate) struct Inner {
    kind: NodeKind,
    name: Option<QName>,
    value: Option<String>, // text / attribute / comment / PI content
    parent: OnceLock<Weak<Inner>>,
    document: OnceLock<DocumentId>, // set on the root only
    attributes: Vec<SimpleNode>,
    children: Vec<SimpleNode>,
    cached_text: OnceLock<String>, // memoized string value for element/document
}

/// Cheap handle to a node; equality and hashing follow node identity.
#[derive(Clone)]
pub struct SimpleNode(pub(crate) Arc<Inner>);

impl PartialEq for SimpleNode {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for SimpleNode {}
impl std::hash::Hash for SimpleNode {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        Arc::as_ptr(&self.0).hash(state);
    }
}

impl fmt::Debug for SimpleNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut d = f.debug_struct("SimpleNode");
        d.field("kind", &self.0.kind);
        if let Some(n) = &self.0.name {
            d.field("name", &n.to_string());
        }
        if let Some(v) = &self.0.value {
            d.field("value", v);
        }
        d.finish()
    }
}

impl SimpleNode {
    fn leaf(kind: NodeKind, name: Option<QName>, value: &str) -> Self {
        SimpleNode(Arc::new(Inner {
            kind,
            name,
            value: Some(value.to_string()),
            parent: OnceLock::new(),
            document: OnceLock::new(),
            attributes: Vec::new(),
            children: Vec::new(),
            cached_text: OnceLock::new(),
        }))
    }

    pub fn document() -> SimpleNodeBuilder {
        SimpleNodeBuilder::new(NodeKind::Document, None)
    }
    pub fn element(name: &str) -> SimpleNodeBuilder {
        SimpleNodeBuilder::new(NodeKind::Element, Some(QName::parse(name)))
    }
    pub fn attribute(name: &str, value: &str) -> SimpleNode {
        SimpleNode::leaf(NodeKind::Attribute, Some(QName::parse(name)), value)
    }
    pub fn text(value: &str) -> SimpleNode {
        SimpleNode::leaf(NodeKind::Text, None, value)
    }
    pub fn comment(value: &str) -> SimpleNode {
        SimpleNode::leaf(NodeKind::Comment, None, value)
    }
    pub fn pi(target: &str, data: &str) -> SimpleNode {
        SimpleNode::leaf(NodeKind::ProcessingInstruction, Some(QName::local(target)), data)
    }

    /// Bind the tree rooted at `self` to a stored document.
    ///
    /// Only the first assignment sticks; returns `false` if the root already
    /// belonged to a document.
    pub fn assign_document(&self, id: DocumentId) -> bool {
        self.root().0.document.set(id).is_ok()
    }

    pub fn root(&self) -> SimpleNode {
        let mut cur = self.clone();
        while let Some(p) = cur.parent() {
            cur = p;
        }
        cur
    }

    /// All nodes of the subtree in document order (self, attributes, children).
    pub fn descendants_or_self(&self) -> Vec<SimpleNode> {
        fn walk(n: &SimpleNode, out: &mut Vec<SimpleNode>) {
            out.push(n.clone());
            out.extend(n.0.attributes.iter().cloned());
            for c in &n.0.children {
                walk(c, out);
            }
        }
        let mut out = Vec::new();
        walk(self, &mut out);
        out
    }
}

pub struct SimpleNodeBuilder {
    kind: NodeKind,
    name: Option<QName>,
    pending_children: Vec<SimpleNode>,
    pending_attrs: Vec<SimpleNode>,
}

impl SimpleNodeBuilder {
    fn new(kind: NodeKind, name: Option<QName>) -> Self {
        Self {
            kind,
            name,
            pending_children: Vec::new(),
            pending_attrs: Vec::new(),
        }
    }

    pub fn child(mut self, child: impl Into<SimpleNodeOrBuilder>) -> Self {
        self.pending_children.push(child.into().finish());
        self
    }
    pub fn children<I: IntoIterator<Item = SimpleNodeOrBuilder>>(mut self, it: I) -> Self {
        self.pending_children.extend(it.into_iter().map(SimpleNodeOrBuilder::finish));
        self
    }
    pub fn attr(mut self, attr: SimpleNode) -> Self {
        debug_assert!(attr.kind() == NodeKind::Attribute);
        self.pending_attrs.push(attr);
        self
    }

    pub fn build(self) -> SimpleNode {
        let node = SimpleNode(Arc::new(Inner {
            kind: self.kind,
            name: self.name,
            value: None,
            parent: OnceLock::new(),
            document: OnceLock::new(),
            attributes: self.pending_attrs,
            children: self.pending_children,
            cached_text: OnceLock::new(),
        }));
        for c in node.0.attributes.iter().chain(node.0.children.iter()) {
            // a node handle reused under two parents keeps its first parent
            let _ = c.0.parent.set(Arc::downgrade(&node.0));
        }
        node
    }
}

pub enum SimpleNodeOrBuilder {
    Built(SimpleNode),
    Builder(SimpleNodeBuilder),
}

impl SimpleNodeOrBuilder {
    fn finish(self) -> SimpleNode {
        match self {
            SimpleNodeOrBuilder::Built(n) => n,
            SimpleNodeOrBuilder::Builder(b) => b.build(),
        }
    }
}

impl From<SimpleNode> for SimpleNodeOrBuilder {
    fn from(n: SimpleNode) -> Self {
        SimpleNodeOrBuilder::Built(n)
    }
}
impl From<SimpleNodeBuilder> for SimpleNodeOrBuilder {
    fn from(b: SimpleNodeBuilder) -> Self {
        SimpleNodeOrBuilder::Builder(b)
    }
}

// Convenience helper functions for concise test code
pub fn elem(name: &str) -> SimpleNodeBuilder {
    SimpleNode::element(name)
}
pub fn text(v: &str) -> SimpleNode {
    SimpleNode::text(v)
}
pub fn attr(name: &str, v: &str) -> SimpleNode {
    SimpleNode::attribute(name, v)
}
pub fn comment(v: &str) -> SimpleNode {
    SimpleNode::comment(v)
}
pub fn doc() -> SimpleNodeBuilder {
    SimpleNode::document()
}

impl StoredNode for SimpleNode {
    fn kind(&self) -> NodeKind {
        self.0.kind
    }
    fn name(&self) -> Option<QName> {
        self.0.name.clone()
    }
    fn string_value(&self) -> String {
        match self.0.kind {
            NodeKind::Text | NodeKind::Attribute | NodeKind::Comment | NodeKind::ProcessingInstruction => {
                self.0.value.clone().unwrap_or_default()
            }
            NodeKind::Element | NodeKind::Document => self
                .0
                .cached_text
                .get_or_init(|| {
                    let mut out = String::new();
                    fn dfs(n: &SimpleNode, out: &mut String) {
                        if n.0.kind == NodeKind::Text
                            && let Some(v) = &n.0.value
                        {
                            out.push_str(v);
                        }
                        for c in &n.0.children {
                            dfs(c, out);
                        }
                    }
                    dfs(self, &mut out);
                    out
                })
                .clone(),
        }
    }
    fn document_id(&self) -> DocumentId {
        self.root().0.document.get().copied().unwrap_or(DocumentId(0))
    }
    fn parent(&self) -> Option<Self> {
        self.0.parent.get().and_then(Weak::upgrade).map(SimpleNode)
    }
    fn children(&self) -> Vec<Self> {
        self.0.children.clone()
    }
    fn attributes(&self) -> Vec<Self> {
        self.0.attributes.clone()
    }
}
