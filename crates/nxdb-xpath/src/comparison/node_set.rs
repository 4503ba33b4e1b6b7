//! Strategies for a node-set on the left of the (normalized) comparison.
use crate::document::DocumentSet;
use crate::error::Error;
use crate::expr::Expression;
use crate::model::StoredNode;
use crate::node_set::NodeSet;
use crate::relation::Relation;
use crate::runtime::QueryContext;
use crate::storage::{self, StorageError};
use crate::value::parse_number;

use super::probe;

fn lookup_failed(relation: Relation, literal: &str, cause: StorageError) -> Error {
    tracing::warn!(relation = %relation, literal, error = %cause, "exact-match lookup failed");
    Error::storage(
        format!("exact-match lookup for '{relation}' against literal \"{literal}\""),
        cause,
    )
}

/// Node-set against a string (or the string value of another node-set).
///
/// The broker decides membership; the full-text probe only shrinks the set
/// it is given. `indexed_left` tells whether the operator's own left operand
/// is the node-set.
pub(super) fn literal<N: StoredNode>(
    ctx: &QueryContext<N>,
    docs: &DocumentSet,
    context: &NodeSet<N>,
    left: &dyn Expression<N>,
    right: &dyn Expression<N>,
    relation: Relation,
    indexed_left: bool,
) -> Result<NodeSet<N>, Error> {
    let nodes = left.evaluate(ctx, docs, context, None)?.into_node_set()?;
    let literal = right.evaluate(ctx, docs, context, None)?.string_value();

    let use_probe = relation == Relation::Eq
        && indexed_left
        && nodes.has_index()
        && !literal.is_empty()
        && ctx.settings().fulltext_preselect;
    let candidates = if use_probe {
        let (narrowed, outcome) = probe::narrow_candidates(ctx, docs, nodes, &literal)?;
        tracing::debug!(literal = %literal, outcome = ?outcome, "index probe finished");
        narrowed
    } else {
        nodes
    };

    let broker = storage::acquire(ctx.pool()?).map_err(|e| lookup_failed(relation, &literal, e))?;
    broker
        .exact_match(&candidates, docs, relation, &literal)
        .map_err(|e| lookup_failed(relation, &literal, e))
}

/// Node-set against a number. Nodes whose text does not parse as a number
/// never match.
pub(super) fn numeric<N: StoredNode>(
    ctx: &QueryContext<N>,
    docs: &DocumentSet,
    context: &NodeSet<N>,
    left: &dyn Expression<N>,
    right: &dyn Expression<N>,
    relation: Relation,
) -> Result<NodeSet<N>, Error> {
    let nodes = left.evaluate(ctx, docs, context, None)?.into_node_set()?;
    let mut out = NodeSet::new();
    out.set_has_index(nodes.has_index());
    for n in &nodes {
        let text = n.string_value();
        let Some(lvalue) = parse_number(&text) else {
            tracing::trace!(value = %text, "skipping non-numeric node");
            continue;
        };
        let mut single = NodeSet::singleton(n.clone());
        single.set_has_index(nodes.has_index());
        let rvalue = right.evaluate(ctx, docs, &single, Some(n))?.number_value();
        if relation.compare_numbers(lvalue, rvalue) {
            out.insert(n.clone());
        }
    }
    Ok(out)
}

/// Node-set against a boolean.
///
/// A context node counts as `true` when it is the direct parent of a node the
/// left operand selects.
pub(super) fn boolean<N: StoredNode>(
    ctx: &QueryContext<N>,
    docs: &DocumentSet,
    context: &NodeSet<N>,
    left: &dyn Expression<N>,
    right: &dyn Expression<N>,
    relation: Relation,
) -> Result<NodeSet<N>, Error> {
    let selected = left.evaluate(ctx, docs, context, None)?.into_node_set()?;
    let truthy: NodeSet<N> = selected
        .iter()
        .filter_map(|n| context.parent_with_child(n, true, false).cloned())
        .collect();

    let mut out = NodeSet::new();
    out.set_has_index(context.has_index());
    for c in context {
        let lvalue = truthy.contains(c);
        let mut single = NodeSet::singleton(c.clone());
        single.set_has_index(context.has_index());
        let rvalue = right.evaluate(ctx, docs, &single, Some(c))?.boolean_value();
        if relation.compare_booleans(lvalue, rvalue) {
            out.insert(c.clone());
        }
    }
    Ok(out)
}
