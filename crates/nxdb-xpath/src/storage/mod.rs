//! Storage broker contracts and scoped broker acquisition.
//!
//! A broker is borrowed from a [`BrokerPool`] for the duration of a single
//! lookup and handed back through [`BrokerGuard`]'s `Drop`, so every exit
//! path (including `?` returns) releases it.
use core::ops::Deref;

use crate::document::{DocumentSet, IndexConfig};
use crate::model::StoredNode;
use crate::node_set::NodeSet;
use crate::relation::Relation;

mod memory;

pub use memory::{MemoryStore, MemoryStoreBuilder};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("broker pool exhausted ({0} brokers in use)")]
    PoolExhausted(usize),
    #[error("broker pool is closed")]
    PoolClosed,
    #[error("lookup failed: {0}")]
    Lookup(String),
    #[error("index configuration unavailable: {0}")]
    Config(String),
}

/// Read access to stored nodes and their indexes.
pub trait Broker<N: StoredNode>: Send {
    /// Nodes of `candidates` (restricted to `docs`) whose string value stands
    /// in `relation` to `literal`.
    fn exact_match(
        &self,
        candidates: &NodeSet<N>,
        docs: &DocumentSet,
        relation: Relation,
        literal: &str,
    ) -> Result<NodeSet<N>, StorageError>;

    /// Full-text index settings of a doctype, if any are configured.
    fn index_config(&self, doctype: &str) -> Result<Option<IndexConfig>, StorageError>;

    /// Nodes of `candidates` (restricted to `docs`) whose indexed text
    /// contains a match for the full-text `term`.
    fn nodes_containing(
        &self,
        docs: &DocumentSet,
        candidates: &NodeSet<N>,
        term: &str,
    ) -> Result<NodeSet<N>, StorageError>;
}

pub type BrokerHandle<N> = Box<dyn Broker<N>>;

pub trait BrokerPool<N: StoredNode>: Send + Sync {
    fn get(&self) -> Result<BrokerHandle<N>, StorageError>;
    fn release(&self, broker: BrokerHandle<N>);
}

/// A broker on loan from a pool; returned to the pool when dropped.
pub struct BrokerGuard<'a, N: StoredNode> {
    pool: &'a dyn BrokerPool<N>,
    broker: Option<BrokerHandle<N>>,
}

/// Borrow a broker from `pool` for the current scope.
pub fn acquire<N: StoredNode>(pool: &dyn BrokerPool<N>) -> Result<BrokerGuard<'_, N>, StorageError> {
    let broker = pool.get()?;
    Ok(BrokerGuard {
        pool,
        broker: Some(broker),
    })
}

impl<N: StoredNode> Deref for BrokerGuard<'_, N> {
    type Target = dyn Broker<N>;

    fn deref(&self) -> &Self::Target {
        match &self.broker {
            Some(b) => b.as_ref(),
            None => unreachable!("broker handed back before its guard was dropped"),
        }
    }
}

impl<N: StoredNode> Drop for BrokerGuard<'_, N> {
    fn drop(&mut self) {
        if let Some(b) = self.broker.take() {
            self.pool.release(b);
        }
    }
}
