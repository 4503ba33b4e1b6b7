use crate::document::DocumentSet;
use crate::error::Error;
use crate::expr::Expression;
use crate::model::StoredNode;
use crate::node_set::NodeSet;
use crate::runtime::QueryContext;
use crate::value::Value;

/// Evaluate both operands once per context node, narrowed to that node, and
/// keep the nodes for which `holds` accepts the pair of values.
pub(super) fn per_node<N: StoredNode>(
    ctx: &QueryContext<N>,
    docs: &DocumentSet,
    context: &NodeSet<N>,
    left: &dyn Expression<N>,
    right: &dyn Expression<N>,
    holds: impl Fn(&Value<N>, &Value<N>) -> bool,
) -> Result<NodeSet<N>, Error> {
    let mut out = NodeSet::new();
    out.set_has_index(context.has_index());
    for c in context {
        let mut single = NodeSet::singleton(c.clone());
        single.set_has_index(context.has_index());
        let lv = left.evaluate(ctx, docs, &single, Some(c))?;
        let rv = right.evaluate(ctx, docs, &single, Some(c))?;
        if holds(&lv, &rv) {
            out.insert(c.clone());
        }
    }
    Ok(out)
}
