//! Ordered, duplicate-free node collections with context-anchor bookkeeping.
use std::collections::{HashMap, HashSet};

use smallvec::SmallVec;

use crate::document::DocumentSet;
use crate::model::{DocumentId, StoredNode};

/// A set of node references, unique by node identity.
///
/// Iteration follows insertion order. Context anchors are kept in a side
/// table (result node -> originating nodes) so that the same stored node can
/// take part in several comparisons without sharing mutable state.
#[derive(Debug, Clone)]
pub struct NodeSet<N: StoredNode> {
    nodes: SmallVec<[N; 4]>,
    members: HashSet<N>,
    indexable: bool,
    anchors: HashMap<N, SmallVec<[N; 1]>>,
}

impl<N: StoredNode> Default for NodeSet<N> {
    fn default() -> Self {
        Self {
            nodes: SmallVec::new(),
            members: HashSet::new(),
            indexable: false,
            anchors: HashMap::new(),
        }
    }
}

impl<N: StoredNode> NodeSet<N> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty set whose documents support exact-match index lookups.
    pub fn indexed() -> Self {
        Self {
            indexable: true,
            ..Self::default()
        }
    }

    pub fn singleton(node: N) -> Self {
        let mut set = Self::new();
        set.insert(node);
        set
    }

    /// Adds `node`; returns `false` if it was already present.
    pub fn insert(&mut self, node: N) -> bool {
        if !self.members.insert(node.clone()) {
            return false;
        }
        self.nodes.push(node);
        true
    }

    pub fn contains(&self, node: &N) -> bool {
        self.members.contains(node)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &N> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn first(&self) -> Option<&N> {
        self.nodes.first()
    }

    /// Whether the documents behind this set support fast index lookups.
    pub fn has_index(&self) -> bool {
        self.indexable
    }

    pub fn set_has_index(&mut self, indexable: bool) {
        self.indexable = indexable;
    }

    /// Find the node of this set that is the parent (or, without
    /// `direct_parent`, the nearest ancestor) of `node`.
    ///
    /// With `include_self`, `node` itself is returned when it is a member.
    pub fn parent_with_child(&self, node: &N, direct_parent: bool, include_self: bool) -> Option<&N> {
        if include_self && let Some(n) = self.members.get(node) {
            return Some(n);
        }
        let mut cur = node.parent();
        while let Some(p) = cur {
            if let Some(n) = self.members.get(&p) {
                return Some(n);
            }
            if direct_parent {
                return None;
            }
            cur = p.parent();
        }
        None
    }

    /// Record `anchor` as a context node of `node` (used by chained predicates).
    pub fn add_context_anchor(&mut self, node: &N, anchor: N) {
        let entry = self.anchors.entry(node.clone()).or_default();
        if !entry.contains(&anchor) {
            entry.push(anchor);
        }
    }

    /// Context anchors recorded for `node`, in recording order.
    pub fn context_anchors(&self, node: &N) -> &[N] {
        self.anchors.get(node).map(SmallVec::as_slice).unwrap_or(&[])
    }

    /// Keep only the nodes matching `keep`; anchors of removed nodes are dropped.
    pub fn retain(&mut self, mut keep: impl FnMut(&N) -> bool) {
        let members = &mut self.members;
        let anchors = &mut self.anchors;
        self.nodes.retain(|n| {
            let n = &*n;
            let k = keep(n);
            if !k {
                members.remove(n);
                anchors.remove(n);
            }
            k
        });
    }

    /// Nodes present in both sets, in `self`'s order. Keeps `self`'s index flag.
    pub fn intersection(&self, other: &NodeSet<N>) -> NodeSet<N> {
        let mut out = NodeSet {
            indexable: self.indexable,
            ..NodeSet::default()
        };
        for n in self.iter().filter(|n| other.contains(n)) {
            out.insert(n.clone());
        }
        out
    }

    /// Ids of the documents owning at least one node of the set.
    pub fn document_ids(&self) -> Vec<DocumentId> {
        let mut seen = HashSet::new();
        self.nodes
            .iter()
            .map(StoredNode::document_id)
            .filter(|id| seen.insert(*id))
            .collect()
    }

    /// True when every node belongs to a document of `docs`.
    pub fn within(&self, docs: &DocumentSet) -> bool {
        self.document_ids().into_iter().all(|id| docs.contains(id))
    }

    pub fn to_vec(&self) -> Vec<N> {
        self.nodes.to_vec()
    }
}

impl<N: StoredNode> FromIterator<N> for NodeSet<N> {
    fn from_iter<T: IntoIterator<Item = N>>(iter: T) -> Self {
        let mut set = NodeSet::new();
        for n in iter {
            set.insert(n);
        }
        set
    }
}

impl<N: StoredNode> Extend<N> for NodeSet<N> {
    fn extend<T: IntoIterator<Item = N>>(&mut self, iter: T) {
        for n in iter {
            self.insert(n);
        }
    }
}

impl<'a, N: StoredNode> IntoIterator for &'a NodeSet<N> {
    type Item = &'a N;
    type IntoIter = core::slice::Iter<'a, N>;
    fn into_iter(self) -> Self::IntoIter {
        self.nodes.iter()
    }
}
