//! Operand expression contract and the leaf expressions the comparison
//! operator is usually combined with.
use core::fmt;

use itertools::Itertools;

use crate::document::DocumentSet;
use crate::error::Error;
use crate::model::{NodeKind, QName, StoredNode};
use crate::node_set::NodeSet;
use crate::runtime::QueryContext;
use crate::value::{Value, format_number};

/// Static result category of an expression, known before evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclaredType {
    NodeSet,
    Number,
    String,
    Boolean,
    /// Not determinable statically.
    Any,
}

pub trait Expression<N: StoredNode>: fmt::Display + fmt::Debug + Send + Sync {
    fn declared_type(&self) -> DeclaredType;

    /// Evaluate against `context_set`; `context_node` narrows evaluation to a
    /// single member of it when given.
    fn evaluate(
        &self,
        ctx: &QueryContext<N>,
        docs: &DocumentSet,
        context_set: &NodeSet<N>,
        context_node: Option<&N>,
    ) -> Result<Value<N>, Error>;

    /// Restrict the documents this expression can match in.
    fn preselect(&self, docs: &DocumentSet) -> DocumentSet {
        docs.clone()
    }

    /// Hand out the only step of a one-step wrapper, leaving the wrapper empty.
    fn take_single_step(&mut self) -> Option<Box<dyn Expression<N>>> {
        None
    }
}

/// Nodes an expression applies to: the single context node if given,
/// otherwise the whole context set.
pub(crate) fn focus<N: StoredNode>(context_set: &NodeSet<N>, context_node: Option<&N>) -> NodeSet<N> {
    match context_node {
        Some(n) => {
            let mut set = NodeSet::singleton(n.clone());
            set.set_has_index(context_set.has_index());
            set
        }
        None => context_set.clone(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    String(String),
    Number(f64),
    Boolean(bool),
}

impl Literal {
    pub fn string(s: impl Into<String>) -> Self {
        Literal::String(s.into())
    }
    pub fn number(n: f64) -> Self {
        Literal::Number(n)
    }
    pub fn boolean(b: bool) -> Self {
        Literal::Boolean(b)
    }
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::String(s) if s.contains('\'') => write!(f, "\"{s}\""),
            Literal::String(s) => write!(f, "'{s}'"),
            Literal::Number(n) => f.write_str(&format_number(*n)),
            Literal::Boolean(b) => write!(f, "{b}()"),
        }
    }
}

impl<N: StoredNode> Expression<N> for Literal {
    fn declared_type(&self) -> DeclaredType {
        match self {
            Literal::String(_) => DeclaredType::String,
            Literal::Number(_) => DeclaredType::Number,
            Literal::Boolean(_) => DeclaredType::Boolean,
        }
    }

    fn evaluate(
        &self,
        _ctx: &QueryContext<N>,
        _docs: &DocumentSet,
        _context_set: &NodeSet<N>,
        _context_node: Option<&N>,
    ) -> Result<Value<N>, Error> {
        Ok(match self {
            Literal::String(s) => Value::String(s.clone()),
            Literal::Number(n) => Value::Number(*n),
            Literal::Boolean(b) => Value::Boolean(*b),
        })
    }
}

/// `.` — the context node, or the whole context set when none is singled out.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContextNodes;

impl fmt::Display for ContextNodes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(".")
    }
}

impl<N: StoredNode> Expression<N> for ContextNodes {
    fn declared_type(&self) -> DeclaredType {
        DeclaredType::NodeSet
    }

    fn evaluate(
        &self,
        _ctx: &QueryContext<N>,
        _docs: &DocumentSet,
        context_set: &NodeSet<N>,
        context_node: Option<&N>,
    ) -> Result<Value<N>, Error> {
        Ok(Value::NodeSet(focus(context_set, context_node)))
    }
}

/// `child::name` (or `child::*` without a name) over element children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildStep {
    name: Option<QName>,
}

impl ChildStep {
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(QName::parse(name)),
        }
    }

    pub fn any() -> Self {
        Self { name: None }
    }

    fn accepts<N: StoredNode>(&self, node: &N) -> bool {
        node.kind() == NodeKind::Element
            && match &self.name {
                Some(want) => node.name().as_ref() == Some(want),
                None => true,
            }
    }
}

impl fmt::Display for ChildStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(n) => write!(f, "{n}"),
            None => f.write_str("*"),
        }
    }
}

impl<N: StoredNode> Expression<N> for ChildStep {
    fn declared_type(&self) -> DeclaredType {
        DeclaredType::NodeSet
    }

    fn evaluate(
        &self,
        _ctx: &QueryContext<N>,
        docs: &DocumentSet,
        context_set: &NodeSet<N>,
        context_node: Option<&N>,
    ) -> Result<Value<N>, Error> {
        let mut out = NodeSet::new();
        out.set_has_index(context_set.has_index());
        for parent in &focus(context_set, context_node) {
            if !docs.contains(parent.document_id()) {
                continue;
            }
            out.extend(parent.children().into_iter().filter(|c| self.accepts(c)));
        }
        Ok(Value::NodeSet(out))
    }
}

/// Sequence of steps, each evaluated against the node-set of the previous one.
#[derive(Debug)]
pub struct PathExpr<N: StoredNode> {
    steps: Vec<Box<dyn Expression<N>>>,
}

impl<N: StoredNode> Default for PathExpr<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: StoredNode> PathExpr<N> {
    pub fn new() -> Self {
        Self { steps: Vec::new() }
    }

    pub fn step(mut self, step: impl Expression<N> + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

impl<N: StoredNode> fmt::Display for PathExpr<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.steps.iter().join("/"))
    }
}

impl<N: StoredNode> Expression<N> for PathExpr<N> {
    fn declared_type(&self) -> DeclaredType {
        self.steps.last().map_or(DeclaredType::NodeSet, |s| s.declared_type())
    }

    fn evaluate(
        &self,
        ctx: &QueryContext<N>,
        docs: &DocumentSet,
        context_set: &NodeSet<N>,
        context_node: Option<&N>,
    ) -> Result<Value<N>, Error> {
        let mut current = Value::NodeSet(focus(context_set, context_node));
        for step in &self.steps {
            let input = current.into_node_set()?;
            current = step.evaluate(ctx, docs, &input, None)?;
        }
        Ok(current)
    }

    fn take_single_step(&mut self) -> Option<Box<dyn Expression<N>>> {
        if self.steps.len() == 1 { self.steps.pop() } else { None }
    }
}
