//! The general comparison operator (`=`, `!=`, `<`, `>`, `<=`, `>=`).
//!
//! Evaluation runs in two stages:
//! 1. [`dispatch`] picks a strategy from the declared operand types
//!    (node-set before number before string before boolean, left before
//!    right) and flips the relation whenever the operands trade places.
//! 2. The chosen strategy walks the context set and keeps the context nodes
//!    for which the comparison holds. Node-set comparisons against a string
//!    go through the storage broker, optionally after a full-text probe has
//!    narrowed the candidates.
//!
//! Every node of the result is recorded as its own context anchor.
use core::fmt;

use crate::document::DocumentSet;
use crate::error::Error;
use crate::expr::{DeclaredType, Expression, focus};
use crate::model::StoredNode;
use crate::node_set::NodeSet;
use crate::relation::Relation;
use crate::runtime::QueryContext;
use crate::value::Value;

mod atomic;
mod node_set;
pub mod probe;

pub use probe::{ProbeOutcome, ProbeQuery};

/// Per-node evaluation algorithm selected by [`dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Strategy {
    NodeSet,
    Number,
    String,
    Boolean,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Strategy::NodeSet => "node-set",
            Strategy::Number => "number",
            Strategy::String => "string",
            Strategy::Boolean => "boolean",
        })
    }
}

/// Normalized form of a comparison: which strategy to run, with which
/// relation, and whether the operands were exchanged to get there.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    pub strategy: Strategy,
    pub relation: Relation,
    pub swapped: bool,
}

/// Choose the strategy for operands declared `left` and `right`.
///
/// Every tier that exchanges the operands also flips the relation, the
/// number and boolean tiers included, so `'10' < 3` runs as `3 > '10'` and
/// agrees with evaluating the operands in written order.
///
/// Fails with an internal error when neither operand has a type any tier
/// accepts; that is an expression tree no compiler should have built.
pub fn dispatch(left: DeclaredType, right: DeclaredType, relation: Relation) -> Result<Dispatch, Error> {
    use DeclaredType as T;
    let keep = |strategy| Dispatch {
        strategy,
        relation,
        swapped: false,
    };
    let swap = |strategy| Dispatch {
        strategy,
        relation: relation.flip(),
        swapped: true,
    };
    Ok(match (left, right) {
        (T::NodeSet, _) => keep(Strategy::NodeSet),
        (_, T::NodeSet) => swap(Strategy::NodeSet),
        (T::Number, _) => keep(Strategy::Number),
        (_, T::Number) => swap(Strategy::Number),
        (T::String, _) => keep(Strategy::String),
        (T::Boolean, _) => keep(Strategy::Boolean),
        (_, T::Boolean) => swap(Strategy::Boolean),
        _ => {
            return Err(Error::internal(format!(
                "cannot determine an evaluatable type for comparison of {left:?} {relation} {right:?}"
            )));
        }
    })
}

/// `left <relation> right` as a query-language expression.
#[derive(Debug)]
pub struct GeneralComparison<N: StoredNode> {
    left: Box<dyn Expression<N>>,
    right: Box<dyn Expression<N>>,
    relation: Relation,
}

impl<N: StoredNode> GeneralComparison<N> {
    /// Operands that are one-step path wrappers are replaced by their step.
    pub fn new(mut left: Box<dyn Expression<N>>, mut right: Box<dyn Expression<N>>, relation: Relation) -> Self {
        if let Some(step) = left.take_single_step() {
            left = step;
        }
        if let Some(step) = right.take_single_step() {
            right = step;
        }
        Self { left, right, relation }
    }

    pub fn of(left: impl Expression<N> + 'static, relation: Relation, right: impl Expression<N> + 'static) -> Self {
        Self::new(Box::new(left), Box::new(right), relation)
    }

    pub fn relation(&self) -> Relation {
        self.relation
    }

    pub fn left(&self) -> &dyn Expression<N> {
        self.left.as_ref()
    }

    pub fn right(&self) -> &dyn Expression<N> {
        self.right.as_ref()
    }

    pub fn pprint(&self) -> String {
        self.to_string()
    }

    /// Strategy, relation and operand order the evaluation will use.
    pub fn normalize(&self) -> Result<(Dispatch, &dyn Expression<N>, &dyn Expression<N>), Error> {
        let plan = dispatch(self.left.declared_type(), self.right.declared_type(), self.relation)
            .map_err(|e| Error::internal(format!("{} in '{self}'", e.message)))?;
        Ok(if plan.swapped {
            (plan, self.right.as_ref(), self.left.as_ref())
        } else {
            (plan, self.left.as_ref(), self.right.as_ref())
        })
    }
}

impl<N: StoredNode> fmt::Display for GeneralComparison<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.left, self.relation, self.right)
    }
}

impl<N: StoredNode> Expression<N> for GeneralComparison<N> {
    fn declared_type(&self) -> DeclaredType {
        DeclaredType::NodeSet
    }

    fn evaluate(
        &self,
        ctx: &QueryContext<N>,
        docs: &DocumentSet,
        context_set: &NodeSet<N>,
        context_node: Option<&N>,
    ) -> Result<Value<N>, Error> {
        let (plan, left, right) = self.normalize()?;
        tracing::debug!(
            expr = %self,
            strategy = %plan.strategy,
            relation = %plan.relation,
            swapped = plan.swapped,
            "general comparison dispatched"
        );
        let context = focus(context_set, context_node);
        let rel = plan.relation;
        let mut result = match plan.strategy {
            Strategy::NodeSet => match right.declared_type() {
                DeclaredType::String | DeclaredType::NodeSet => {
                    // index assistance is only considered when the operator
                    // was written with the node-set on the left
                    let indexed_left = self.left.declared_type() == DeclaredType::NodeSet;
                    node_set::literal(ctx, docs, &context, left, right, rel, indexed_left)?
                }
                DeclaredType::Number => node_set::numeric(ctx, docs, &context, left, right, rel)?,
                DeclaredType::Boolean => node_set::boolean(ctx, docs, &context, left, right, rel)?,
                DeclaredType::Any => {
                    return Err(Error::internal(format!(
                        "right operand of node-set comparison '{self}' has no declared type"
                    )));
                }
            },
            Strategy::Number => atomic::per_node(ctx, docs, &context, left, right, |l, r| {
                rel.compare_numbers(l.number_value(), r.number_value())
            })?,
            Strategy::String => atomic::per_node(ctx, docs, &context, left, right, |l, r| {
                rel.compare_strings(&l.string_value(), &r.string_value())
            })?,
            Strategy::Boolean => atomic::per_node(ctx, docs, &context, left, right, |l, r| {
                rel.compare_booleans(l.boolean_value(), r.boolean_value())
            })?,
        };
        for n in result.to_vec() {
            result.add_context_anchor(&n, n.clone());
        }
        tracing::debug!(expr = %self, matches = result.len(), "general comparison evaluated");
        Ok(Value::NodeSet(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::{ChildStep, Literal, PathExpr};
    use crate::simple_node::SimpleNode;

    #[test]
    fn single_step_paths_are_unwrapped() {
        let cmp: GeneralComparison<SimpleNode> = GeneralComparison::of(
            PathExpr::new().step(ChildStep::named("price")),
            Relation::Gt,
            Literal::number(7.0),
        );
        assert_eq!(cmp.pprint(), "price>7");
        assert_eq!(cmp.left().to_string(), "price");

        let two: GeneralComparison<SimpleNode> = GeneralComparison::of(
            PathExpr::new().step(ChildStep::named("a")).step(ChildStep::named("b")),
            Relation::Eq,
            Literal::string("x"),
        );
        assert_eq!(two.to_string(), "a/b='x'");
    }

    #[test]
    fn normalize_swaps_operands() {
        let cmp: GeneralComparison<SimpleNode> =
            GeneralComparison::of(Literal::number(3.0), Relation::Lt, ChildStep::named("n"));
        let (plan, left, right) = cmp.normalize().unwrap();
        assert_eq!(plan.strategy, Strategy::NodeSet);
        assert_eq!(plan.relation, Relation::Gt);
        assert!(plan.swapped);
        assert_eq!(left.to_string(), "n");
        assert_eq!(right.to_string(), "3");
        // the operator itself is untouched
        assert_eq!(cmp.relation(), Relation::Lt);
    }
}
