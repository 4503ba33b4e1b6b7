use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use fancy_regex::Regex;
use lru::LruCache;
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use super::{Broker, BrokerHandle, BrokerPool, StorageError};
use crate::document::{Document, DocumentSet, IndexConfig, StoreConfig};
use crate::error::{Error, ErrorCode};
use crate::fulltext::{TermPattern, push_regex_escaped};
use crate::model::{DocumentId, NodeKind, StoredNode};
use crate::node_set::NodeSet;
use crate::relation::Relation;
use crate::simple_node::{SimpleNode, SimpleNodeBuilder, attr, doc, elem};

const PATTERN_CACHE_SIZE: usize = 64;
const DEFAULT_POOL_SIZE: usize = 8;

struct StoredDocument {
    doc: Document,
    root: SimpleNode,
}

struct StoreState {
    documents: Vec<StoredDocument>,
    config: StoreConfig,
    patterns: Mutex<LruCache<String, Arc<TermPattern>>>,
}

#[derive(Debug)]
struct PoolState {
    capacity: usize,
    active: AtomicUsize,
    acquired: AtomicUsize,
    closed: AtomicBool,
}

/// Read-only in-memory document store acting as its own broker pool.
///
/// Nodes handed out by the store belong to indexed documents, so node-sets it
/// produces report [`NodeSet::has_index`].
#[derive(Clone)]
pub struct MemoryStore {
    state: Arc<StoreState>,
    pool: Arc<PoolState>,
}

pub struct MemoryStoreBuilder {
    documents: Vec<StoredDocument>,
    config: StoreConfig,
    capacity: usize,
}

impl Default for MemoryStoreBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStoreBuilder {
    pub fn new() -> Self {
        Self {
            documents: Vec::new(),
            config: StoreConfig::default(),
            capacity: DEFAULT_POOL_SIZE,
        }
    }

    pub fn with_config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_index(mut self, doctype: impl Into<String>, config: IndexConfig) -> Self {
        self.config.index.insert(doctype.into(), config);
        self
    }

    /// Maximum number of brokers on loan at the same time.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Store a built tree. The doctype is the name of the root element.
    pub fn add_document(&mut self, name: impl Into<String>, root: SimpleNode) -> Result<DocumentId, Error> {
        let doctype = match root.kind() {
            NodeKind::Document => root
                .children()
                .into_iter()
                .find(|c| c.kind() == NodeKind::Element)
                .and_then(|e| e.name()),
            _ => root.name(),
        }
        .map(|q| q.local)
        .unwrap_or_default();
        self.add_document_with_doctype(name, doctype, root)
    }

    pub fn add_document_with_doctype(
        &mut self,
        name: impl Into<String>,
        doctype: impl Into<String>,
        root: SimpleNode,
    ) -> Result<DocumentId, Error> {
        let id = DocumentId(u32::try_from(self.documents.len() + 1).map_err(|_| {
            Error::from_code(ErrorCode::NXDB0004, "document limit reached")
        })?);
        let name = name.into();
        if !root.assign_document(id) {
            return Err(Error::from_code(
                ErrorCode::NXDB0004,
                format!("tree of '{name}' is already stored"),
            ));
        }
        tracing::debug!(doc = %id, name = %name, "document stored");
        self.documents.push(StoredDocument {
            doc: Document::new(id, name, doctype),
            root,
        });
        Ok(id)
    }

    /// Parse `xml` and store it. A `<!DOCTYPE>` declaration names the
    /// doctype, otherwise the root element does.
    pub fn load_xml(&mut self, name: impl Into<String>, xml: &str) -> Result<DocumentId, Error> {
        let (root, doctype) = parse_xml(xml)?;
        match doctype {
            Some(dt) => self.add_document_with_doctype(name, dt, root),
            None => self.add_document(name, root),
        }
    }

    pub fn build(self) -> MemoryStore {
        let cache_size = NonZeroUsize::new(PATTERN_CACHE_SIZE).unwrap_or(NonZeroUsize::MIN);
        MemoryStore {
            state: Arc::new(StoreState {
                documents: self.documents,
                config: self.config,
                patterns: Mutex::new(LruCache::new(cache_size)),
            }),
            pool: Arc::new(PoolState {
                capacity: self.capacity,
                active: AtomicUsize::new(0),
                acquired: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }
}

impl MemoryStore {
    pub fn builder() -> MemoryStoreBuilder {
        MemoryStoreBuilder::new()
    }

    /// All stored documents.
    pub fn document_set(&self) -> DocumentSet {
        self.state.documents.iter().map(|d| d.doc.clone()).collect()
    }

    pub fn document(&self, id: DocumentId) -> Option<&Document> {
        self.state.documents.iter().find(|d| d.doc.id == id).map(|d| &d.doc)
    }

    pub fn documents(&self) -> impl Iterator<Item = &Document> {
        self.state.documents.iter().map(|d| &d.doc)
    }

    /// Every node of one document in document order; empty for unknown ids.
    pub fn all_nodes(&self, id: DocumentId) -> NodeSet<SimpleNode> {
        let mut out = NodeSet::indexed();
        if let Some(root) = self.root(id) {
            out.extend(root.descendants_or_self());
        }
        out
    }

    /// Document node of a stored document.
    pub fn root(&self, id: DocumentId) -> Option<SimpleNode> {
        self.state.documents.iter().find(|d| d.doc.id == id).map(|d| d.root.clone())
    }

    /// Document nodes of the stored documents that belong to `docs`.
    pub fn document_nodes(&self, docs: &DocumentSet) -> NodeSet<SimpleNode> {
        let mut out = NodeSet::indexed();
        out.extend(
            self.state
                .documents
                .iter()
                .filter(|d| docs.contains(d.doc.id))
                .map(|d| d.root.clone()),
        );
        out
    }

    /// Every element named `local` in the stored documents, in document order.
    pub fn elements(&self, local: &str) -> NodeSet<SimpleNode> {
        let mut out = NodeSet::indexed();
        for d in &self.state.documents {
            out.extend(d.root.descendants_or_self().into_iter().filter(|n| {
                n.kind() == NodeKind::Element && n.name().is_some_and(|q| q.local == local)
            }));
        }
        out
    }

    pub fn capacity(&self) -> usize {
        self.pool.capacity
    }

    /// Brokers currently on loan.
    pub fn active(&self) -> usize {
        self.pool.active.load(Ordering::SeqCst)
    }

    /// Total number of successful acquisitions since the store was built.
    pub fn acquisitions(&self) -> usize {
        self.pool.acquired.load(Ordering::SeqCst)
    }

    /// Refuse further acquisitions; brokers on loan stay valid.
    pub fn close(&self) {
        self.pool.closed.store(true, Ordering::SeqCst);
    }
}

impl BrokerPool<SimpleNode> for MemoryStore {
    fn get(&self) -> Result<BrokerHandle<SimpleNode>, StorageError> {
        if self.pool.closed.load(Ordering::SeqCst) {
            return Err(StorageError::PoolClosed);
        }
        let cap = self.pool.capacity;
        self.pool
            .active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| (n < cap).then_some(n + 1))
            .map_err(|_| StorageError::PoolExhausted(cap))?;
        self.pool.acquired.fetch_add(1, Ordering::SeqCst);
        tracing::trace!(active = self.active(), "broker acquired");
        Ok(Box::new(MemoryBroker {
            state: Arc::clone(&self.state),
        }))
    }

    fn release(&self, broker: BrokerHandle<SimpleNode>) {
        drop(broker);
        if self
            .pool
            .active
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_err()
        {
            tracing::warn!("broker released while none was on loan");
            return;
        }
        tracing::trace!(active = self.active(), "broker released");
    }
}

struct MemoryBroker {
    state: Arc<StoreState>,
}

impl MemoryBroker {
    fn pattern(&self, term: &str) -> Result<Arc<TermPattern>, StorageError> {
        let mut cache = self.state.patterns.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(p) = cache.get(term) {
            return Ok(Arc::clone(p));
        }
        let p = Arc::new(
            TermPattern::compile(term)
                .map_err(|e| StorageError::Lookup(format!("invalid term '{term}': {e}")))?,
        );
        cache.put(term.to_string(), Arc::clone(&p));
        Ok(p)
    }
}

/// `%` matches any run of characters; everything else literally.
fn like_regex(literal: &str) -> Result<Regex, fancy_regex::Error> {
    let mut re = String::from("(?s)^");
    for ch in literal.chars() {
        if ch == '%' {
            re.push_str(".*");
        } else {
            push_regex_escaped(&mut re, ch);
        }
    }
    re.push('$');
    Regex::new(&re)
}

impl Broker<SimpleNode> for MemoryBroker {
    fn exact_match(
        &self,
        candidates: &NodeSet<SimpleNode>,
        docs: &DocumentSet,
        relation: Relation,
        literal: &str,
    ) -> Result<NodeSet<SimpleNode>, StorageError> {
        let like = if literal.contains('%') && !relation.is_ordering() {
            Some(like_regex(literal).map_err(|e| StorageError::Lookup(e.to_string()))?)
        } else {
            None
        };
        let mut out = NodeSet::new();
        out.set_has_index(candidates.has_index());
        for n in candidates.iter().filter(|n| docs.contains(n.document_id())) {
            let value = n.string_value();
            let hit = match &like {
                Some(re) => {
                    let m = re.is_match(&value).map_err(|e| StorageError::Lookup(e.to_string()))?;
                    m == (relation == Relation::Eq)
                }
                None => relation.compare_strings(&value, literal),
            };
            if hit {
                out.insert(n.clone());
            }
        }
        Ok(out)
    }

    fn index_config(&self, doctype: &str) -> Result<Option<IndexConfig>, StorageError> {
        Ok(self.state.config.index_config(doctype))
    }

    fn nodes_containing(
        &self,
        docs: &DocumentSet,
        candidates: &NodeSet<SimpleNode>,
        term: &str,
    ) -> Result<NodeSet<SimpleNode>, StorageError> {
        let pattern = self.pattern(term)?;
        let mut out = NodeSet::new();
        out.set_has_index(candidates.has_index());
        out.extend(
            candidates
                .iter()
                .filter(|n| docs.contains(n.document_id()) && pattern.matches(&n.string_value()))
                .cloned(),
        );
        Ok(out)
    }
}

fn load_err(msg: impl Into<String>) -> Error {
    Error::from_code(ErrorCode::NXDB0004, msg)
}

fn utf8(bytes: &[u8]) -> Result<&str, Error> {
    std::str::from_utf8(bytes).map_err(|e| load_err(format!("invalid UTF-8: {e}")))
}

fn unescape(raw: &str) -> Result<String, Error> {
    quick_xml::escape::unescape(raw)
        .map(|c| c.into_owned())
        .map_err(|e| load_err(format!("bad entity reference: {e}")))
}

fn open_element(e: &BytesStart<'_>) -> Result<SimpleNodeBuilder, Error> {
    let mut b = elem(utf8(e.name().as_ref())?);
    for a in e.attributes() {
        let a = a.map_err(|err| load_err(format!("malformed attribute: {err}")))?;
        let key = utf8(a.key.as_ref())?;
        if key == "xmlns" || key.starts_with("xmlns:") {
            continue;
        }
        b = b.attr(attr(key, &unescape(utf8(&a.value)?)?));
    }
    Ok(b)
}

/// Build a document tree from XML text; also returns the declared doctype.
fn parse_xml(xml: &str) -> Result<(SimpleNode, Option<String>), Error> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<SimpleNodeBuilder> = vec![doc()];
    let mut text = String::new();
    let mut doctype = None;

    fn flush(text: &mut String, stack: &mut Vec<SimpleNodeBuilder>) {
        if text.trim().is_empty() {
            text.clear();
            return;
        }
        if let Some(top) = stack.pop() {
            stack.push(top.child(SimpleNode::text(text.as_str())));
        }
        text.clear();
    }

    fn append(stack: &mut Vec<SimpleNodeBuilder>, node: SimpleNode) -> Result<(), Error> {
        let top = stack.pop().ok_or_else(|| load_err("unbalanced end tag"))?;
        stack.push(top.child(node));
        Ok(())
    }

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                flush(&mut text, &mut stack);
                stack.push(open_element(&e)?);
            }
            Event::Empty(e) => {
                flush(&mut text, &mut stack);
                let node = open_element(&e)?.build();
                append(&mut stack, node)?;
            }
            Event::End(_) => {
                flush(&mut text, &mut stack);
                if stack.len() < 2 {
                    return Err(load_err("unbalanced end tag"));
                }
                let node = stack.pop().map(SimpleNodeBuilder::build).ok_or_else(|| load_err("unbalanced end tag"))?;
                append(&mut stack, node)?;
            }
            Event::Text(t) => text.push_str(&unescape(utf8(&t)?)?),
            Event::CData(c) => text.push_str(utf8(&c)?),
            Event::GeneralRef(r) => text.push_str(&unescape(&format!("&{};", utf8(&r)?))?),
            Event::Comment(c) => {
                flush(&mut text, &mut stack);
                append(&mut stack, SimpleNode::comment(utf8(&c)?))?;
            }
            Event::DocType(d) => {
                doctype = utf8(&d)?.split_whitespace().next().map(str::to_string);
            }
            Event::Eof => break,
            _ => {}
        }
    }
    flush(&mut text, &mut stack);
    if stack.len() != 1 {
        return Err(load_err("unclosed element at end of input"));
    }
    let root = stack.pop().map(SimpleNodeBuilder::build).ok_or_else(|| load_err("empty document"))?;
    Ok((root, doctype))
}
