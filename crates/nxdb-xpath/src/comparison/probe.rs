//! Full-text preselection ahead of an exact string comparison.
//!
//! The literal is turned into an AND-query over its first few tokens. Nodes
//! equal to the literal contain all of those tokens, so the query only drops
//! nodes that could not have matched anyway, provided the index saw every
//! token. Indexes that skip alphanumeric runs (or only cover selected paths)
//! break that premise for literals with digits, and the probe is discarded.
use crate::document::DocumentSet;
use crate::error::Error;
use crate::fulltext::{FulltextQuery, SimpleTokenizer, TextToken, TokenKind, mask_wildcards};
use crate::model::StoredNode;
use crate::node_set::NodeSet;
use crate::runtime::QueryContext;
use crate::storage;

/// AND-query built from a comparison literal.
#[derive(Debug, Clone)]
pub struct ProbeQuery {
    pub query: FulltextQuery,
    /// At least one term contains digits.
    pub alpha_numeric: bool,
}

impl ProbeQuery {
    /// Mask the literal for the index query syntax and keep its first
    /// `max_terms` tokens.
    ///
    /// A plain term has to equal a whole token of the node text, so it is
    /// only kept when nothing next to it in the literal can change where the
    /// node text splits: a wildcard or escape, or a `.` that may join it to
    /// a neighbouring number.
    pub fn from_literal(literal: &str, max_terms: usize) -> Self {
        let masked = mask_wildcards(literal);
        let mut query = FulltextQuery::new();
        let mut alpha_numeric = false;
        for token in SimpleTokenizer::new().with_wildcards(true).tokenize(&masked).take(max_terms) {
            if !is_pattern(&token) && !stands_alone(&masked, &token) {
                tracing::trace!(term = %token.text, literal, "term not delimited in literal, left out");
                continue;
            }
            alpha_numeric |= token.is_alpha_numeric();
            query.add_term(token.text);
        }
        Self { query, alpha_numeric }
    }
}

fn is_pattern(token: &TextToken) -> bool {
    token.text.contains(['*', '?', '\\'])
}

/// Whether node text matching `masked` tokenizes the run of `token` into
/// exactly the same token.
fn stands_alone(masked: &str, token: &TextToken) -> bool {
    let separates = |c: Option<char>, dot_joins: bool| match c {
        None => true,
        Some('.') => !dot_joins,
        Some(c) => !(c.is_alphanumeric() || matches!(c, '*' | '?' | '\\')),
    };
    let before = masked[..token.span.start].chars().next_back();
    let after = masked[token.span.end..].chars().next();
    let leading_digit = masked[token.span.clone()].starts_with(|c: char| c.is_ascii_digit());
    separates(before, leading_digit) && separates(after, token.kind == TokenKind::Number)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// The literal produced no index terms.
    NoTerms,
    /// Alphanumeric terms against an index that may not hold them.
    Unsafe { terms: usize },
    Narrowed { terms: usize, before: usize, after: usize },
}

/// Whether some document of `docs` has an index configuration that may be
/// missing alphanumeric terms. Every document of the set is inspected.
pub fn drops_alpha_num_terms<N: StoredNode>(ctx: &QueryContext<N>, docs: &DocumentSet) -> Result<bool, Error> {
    let failed = |e: storage::StorageError| {
        tracing::warn!(error = %e, "index configuration lookup failed");
        Error::storage("index configuration lookup", e)
    };
    let broker = storage::acquire(ctx.pool()?).map_err(failed)?;
    for doc in docs {
        if let Some(cfg) = broker.index_config(&doc.doctype).map_err(failed)?
            && cfg.drops_alpha_num_terms()
        {
            tracing::debug!(doc = %doc.id, doctype = %doc.doctype, "index may lack alphanumeric terms");
            return Ok(true);
        }
    }
    Ok(false)
}

/// Shrink `candidates` to the nodes that contain every token of `literal`.
///
/// Returns the candidates unchanged when the literal has no usable tokens or
/// the index cannot be trusted for them.
pub fn narrow_candidates<N: StoredNode>(
    ctx: &QueryContext<N>,
    docs: &DocumentSet,
    candidates: NodeSet<N>,
    literal: &str,
) -> Result<(NodeSet<N>, ProbeOutcome), Error> {
    let probe = ProbeQuery::from_literal(literal, ctx.settings().max_probe_terms);
    let terms = probe.query.term_count();
    if terms == 0 {
        return Ok((candidates, ProbeOutcome::NoTerms));
    }
    if probe.alpha_numeric && drops_alpha_num_terms(ctx, docs)? {
        tracing::debug!(query = %probe.query, "index probe discarded");
        return Ok((candidates, ProbeOutcome::Unsafe { terms }));
    }
    let before = candidates.len();
    let narrowed = probe.query.evaluate(ctx, docs, &candidates)?;
    let after = narrowed.len();
    tracing::debug!(query = %probe.query, before, after, "index probe applied");
    Ok((narrowed, ProbeOutcome::Narrowed { terms, before, after }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_becomes_masked_terms() {
        let p = ProbeQuery::from_literal("Tom & Jerry", 5);
        assert_eq!(p.query.terms().collect::<Vec<_>>(), ["tom", "jerry"]);
        assert!(!p.alpha_numeric);

        let p = ProbeQuery::from_literal("b%r", 5);
        assert_eq!(p.query.terms().collect::<Vec<_>>(), ["b*r"]);

        let p = ProbeQuery::from_literal("a*b", 5);
        assert_eq!(p.query.terms().collect::<Vec<_>>(), ["a\\*b"]);
    }

    #[test]
    fn term_limit_and_alphanumeric_flag() {
        let p = ProbeQuery::from_literal("one two three four five six R2D2", 5);
        assert_eq!(p.query.term_count(), 5);
        assert!(!p.alpha_numeric, "digits past the limit are not looked at");

        let p = ProbeQuery::from_literal("model 42", 5);
        assert!(p.alpha_numeric);
        assert_eq!(ProbeQuery::from_literal("-- %% --", 5).query.term_count(), 0);
    }

    #[test]
    fn terms_next_to_wildcards_or_decimal_points_are_left_out() {
        let terms = |lit: &str| {
            ProbeQuery::from_literal(lit, 5)
                .query
                .terms()
                .map(str::to_string)
                .collect::<Vec<_>>()
        };
        assert!(terms("1.%").is_empty());
        assert!(terms("%.5").is_empty());
        assert_eq!(terms("x%1.5"), ["x*1"]);
        assert_eq!(terms("a*1.5"), ["a\\*1"]);
        assert_eq!(terms("1.5%"), ["1.5*"]);
        assert_eq!(terms("%.2r"), Vec::<String>::new());
        // a dot cannot join letters, and a whole decimal is kept
        assert_eq!(terms("www.example.com"), ["www", "example", "com"]);
        assert_eq!(terms("costs 1.50"), ["costs", "1.50"]);
        assert!(!ProbeQuery::from_literal("1.%", 5).alpha_numeric);
    }
}
