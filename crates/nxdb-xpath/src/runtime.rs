use std::sync::Arc;

use crate::error::{Error, ErrorCode};
use crate::model::StoredNode;
use crate::storage::BrokerPool;

/// Tuning knobs of the general comparison operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComparisonSettings {
    /// Use the full-text index to shrink candidate sets before exact `=` lookups.
    pub fulltext_preselect: bool,
    /// Upper bound on literal tokens turned into preselection terms.
    pub max_probe_terms: usize,
}

impl Default for ComparisonSettings {
    fn default() -> Self {
        Self {
            fulltext_preselect: true,
            max_probe_terms: 5,
        }
    }
}

/// Evaluation environment shared by all expressions of one query.
pub struct QueryContext<N: StoredNode> {
    pool: Option<Arc<dyn BrokerPool<N>>>,
    settings: ComparisonSettings,
}

impl<N: StoredNode> Default for QueryContext<N> {
    fn default() -> Self {
        Self {
            pool: None,
            settings: ComparisonSettings::default(),
        }
    }
}

impl<N: StoredNode> Clone for QueryContext<N> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            settings: self.settings.clone(),
        }
    }
}

impl<N: StoredNode> QueryContext<N> {
    pub fn settings(&self) -> &ComparisonSettings {
        &self.settings
    }

    /// Pool the storage lookups borrow brokers from.
    pub fn pool(&self) -> Result<&dyn BrokerPool<N>, Error> {
        self.pool
            .as_deref()
            .ok_or_else(|| Error::from_code(ErrorCode::NXDB0003, "no broker pool configured"))
    }

    pub fn has_pool(&self) -> bool {
        self.pool.is_some()
    }
}

pub struct QueryContextBuilder<N: StoredNode> {
    ctx: QueryContext<N>,
}

impl<N: StoredNode> Default for QueryContextBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: StoredNode> QueryContextBuilder<N> {
    pub fn new() -> Self {
        Self {
            ctx: QueryContext::default(),
        }
    }

    pub fn with_pool(mut self, pool: Arc<dyn BrokerPool<N>>) -> Self {
        self.ctx.pool = Some(pool);
        self
    }

    pub fn with_settings(mut self, settings: ComparisonSettings) -> Self {
        self.ctx.settings = settings;
        self
    }

    pub fn with_fulltext_preselect(mut self, enabled: bool) -> Self {
        self.ctx.settings.fulltext_preselect = enabled;
        self
    }

    pub fn with_max_probe_terms(mut self, n: usize) -> Self {
        self.ctx.settings.max_probe_terms = n;
        self
    }

    pub fn build(self) -> QueryContext<N> {
        self.ctx
    }
}
