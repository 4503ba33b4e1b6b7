use std::sync::Arc;

use nxdb_xpath::comparison::probe::{ProbeOutcome, ProbeQuery, drops_alpha_num_terms, narrow_candidates};
use nxdb_xpath::{
    ChildStep, DocumentSet, Expression, GeneralComparison, IndexConfig, Literal, MemoryStore, NodeSet, QueryContext,
    QueryContextBuilder, Relation, SimpleNode, StoredNode, acquire, mask_wildcards, unmask_wildcards,
};
use rstest::{fixture, rstest};

const ITEMS: &[&str] = &[
    "foo",
    "bar",
    "Bar",
    "foo bar",
    "bar foo baz",
    "beer",
    "rebar x",
    "b%r",
    "R2D2",
    "r2d2 unit",
    "a*b",
    "axb",
    "x\\y",
    "1.50",
    "1.5",
    "2.5",
    "x 1.5",
    "a*1.5",
    "café",
    "what?",
    "",
];

fn list_xml(items: &[&str]) -> String {
    let mut xml = String::from("<list>");
    for it in items {
        xml.push_str("<item>");
        xml.push_str(&it.replace('&', "&amp;").replace('<', "&lt;"));
        xml.push_str("</item>");
    }
    xml.push_str("</list>");
    xml
}

struct Fixture {
    store: MemoryStore,
    ctx: QueryContext<SimpleNode>,
}

impl Fixture {
    fn items(&self) -> NodeSet<SimpleNode> {
        self.store.elements("item")
    }
}

#[fixture]
fn indexed() -> Fixture {
    let mut b = MemoryStore::builder().with_index("list", IndexConfig::default());
    b.load_xml("list.xml", &list_xml(ITEMS)).unwrap();
    let store = b.build();
    let ctx = QueryContextBuilder::new().with_pool(Arc::new(store.clone())).build();
    Fixture { store, ctx }
}

fn exact(f: &Fixture, docs: &DocumentSet, literal: &str) -> NodeSet<SimpleNode> {
    let broker = acquire(f.ctx.pool().unwrap()).unwrap();
    broker.exact_match(&f.items(), docs, Relation::Eq, literal).unwrap()
}

fn values(set: &NodeSet<SimpleNode>) -> Vec<String> {
    set.iter().map(StoredNode::string_value).collect()
}

#[rstest]
fn probe_never_drops_an_exact_match(
    indexed: Fixture,
    #[values(
        "bar", "Bar", "b%r", "%", "foo bar", "R2D2", "r2d2 unit", "a*b", "x\\y", "1.50", "café", "what?", "%oo",
        "bar foo baz", "nothing", "?", "1.%", "%.5", "x%1.5", "a*1.5", "1.5%", "%.2r", "www.%"
    )]
    literal: &str,
) {
    let docs = indexed.store.document_set();
    let expected = exact(&indexed, &docs, literal);
    let (narrowed, outcome) = narrow_candidates(&indexed.ctx, &docs, indexed.items(), literal).unwrap();
    for n in &expected {
        assert!(narrowed.contains(n), "{literal:?} lost {:?} ({outcome:?})", n.string_value());
    }
    assert!(narrowed.has_index());
}

#[rstest]
fn probed_and_unprobed_comparisons_agree(
    indexed: Fixture,
    #[values(
        "bar", "b%r", "foo bar", "R2D2", "a*b", "1.5", "café", "x\\y", "1.%", "%.5", "x%1.5", "a*1.5", "1.5%"
    )]
    literal: &str,
) {
    let docs = indexed.store.document_set();
    let lists = indexed.store.elements("list");
    let cmp: GeneralComparison<SimpleNode> =
        GeneralComparison::of(ChildStep::named("item"), Relation::Eq, Literal::string(literal));
    let probed = cmp.evaluate(&indexed.ctx, &docs, &lists, None).unwrap().into_node_set().unwrap();
    let plain_ctx = QueryContextBuilder::new()
        .with_pool(Arc::new(indexed.store.clone()))
        .with_fulltext_preselect(false)
        .build();
    let plain = cmp.evaluate(&plain_ctx, &docs, &lists, None).unwrap().into_node_set().unwrap();
    assert_eq!(values(&probed), values(&plain));
    assert_eq!(values(&plain), values(&exact(&indexed, &docs, literal)));
}

#[rstest]
fn probe_narrows_plain_terms(indexed: Fixture) {
    let docs = indexed.store.document_set();
    let (narrowed, outcome) = narrow_candidates(&indexed.ctx, &docs, indexed.items(), "foo bar").unwrap();
    assert_eq!(values(&narrowed), ["foo bar", "bar foo baz"]);
    assert_eq!(
        outcome,
        ProbeOutcome::Narrowed {
            terms: 2,
            before: ITEMS.len(),
            after: 2
        }
    );
}

#[rstest]
fn wildcard_probe_keeps_superset(indexed: Fixture) {
    let docs = indexed.store.document_set();
    let (narrowed, _) = narrow_candidates(&indexed.ctx, &docs, indexed.items(), "b%r").unwrap();
    assert_eq!(
        values(&narrowed),
        ["bar", "Bar", "foo bar", "bar foo baz", "beer", "rebar x", "b%r"]
    );
    assert_eq!(values(&exact(&indexed, &docs, "b%r")), ["bar", "beer", "b%r"]);
}

#[rstest]
#[case("1.%", &["1.50", "1.5"])]
#[case("%.5", &["1.5", "2.5", "x 1.5", "a*1.5"])]
#[case("x%1.5", &["x 1.5"])]
#[case("a*1.5", &["a*1.5"])]
fn decimals_next_to_wildcards_still_match(indexed: Fixture, #[case] literal: &str, #[case] expected: &[&str]) {
    let docs = indexed.store.document_set();
    let cmp: GeneralComparison<SimpleNode> =
        GeneralComparison::of(ChildStep::named("item"), Relation::Eq, Literal::string(literal));
    let out = cmp
        .evaluate(&indexed.ctx, &docs, &indexed.store.elements("list"), None)
        .unwrap()
        .into_node_set()
        .unwrap();
    assert_eq!(values(&out), expected);
}

#[rstest]
#[case("%")]
#[case("?")]
#[case("--")]
fn literal_without_terms_leaves_candidates(indexed: Fixture, #[case] literal: &str) {
    let docs = indexed.store.document_set();
    let (narrowed, outcome) = narrow_candidates(&indexed.ctx, &docs, indexed.items(), literal).unwrap();
    assert_eq!(outcome, ProbeOutcome::NoTerms);
    assert_eq!(narrowed.len(), ITEMS.len());
}

#[rstest]
fn term_limit_comes_from_settings(indexed: Fixture) {
    let ctx = QueryContextBuilder::new()
        .with_pool(Arc::new(indexed.store.clone()))
        .with_max_probe_terms(1)
        .build();
    let docs = indexed.store.document_set();
    let (narrowed, outcome) = narrow_candidates(&ctx, &docs, indexed.items(), "foo bar").unwrap();
    assert!(matches!(outcome, ProbeOutcome::Narrowed { terms: 1, .. }));
    assert_eq!(values(&narrowed), ["foo", "foo bar", "bar foo baz"]);
}

/// Two doctypes: `list` holds the candidates, `note` has an index that
/// skips alphanumeric runs.
fn mixed_store(note: IndexConfig) -> MemoryStore {
    let mut b = MemoryStore::builder().with_index("note", note);
    b.load_xml("list.xml", &list_xml(&["R2D2", "C3PO", "bar"])).unwrap();
    b.load_xml("note.xml", "<note>unrelated</note>").unwrap();
    b.build()
}

#[rstest]
#[case(IndexConfig { selective: false, include_alpha_num: false }, true)]
#[case(IndexConfig { selective: true, include_alpha_num: true }, true)]
#[case(IndexConfig { selective: false, include_alpha_num: true }, false)]
fn safety_check_inspects_every_document(#[case] note: IndexConfig, #[case] unsafe_index: bool) {
    let store = mixed_store(note);
    let ctx = QueryContextBuilder::new().with_pool(Arc::new(store.clone())).build();
    let docs = store.document_set();
    assert_eq!(drops_alpha_num_terms(&ctx, &docs).unwrap(), unsafe_index);

    // the note document owns no candidate and still decides
    let (narrowed, outcome) = narrow_candidates(&ctx, &docs, store.elements("item"), "R2D2").unwrap();
    if unsafe_index {
        assert_eq!(outcome, ProbeOutcome::Unsafe { terms: 1 });
        assert_eq!(narrowed.len(), 3);
    } else {
        assert_eq!(values(&narrowed), ["R2D2"]);
    }
    assert_eq!(store.active(), 0);
}

#[rstest]
fn safety_check_only_matters_for_alphanumeric_terms() {
    let store = mixed_store(IndexConfig {
        selective: true,
        include_alpha_num: false,
    });
    let ctx = QueryContextBuilder::new().with_pool(Arc::new(store.clone())).build();
    let docs = store.document_set();
    let (narrowed, outcome) = narrow_candidates(&ctx, &docs, store.elements("item"), "bar").unwrap();
    assert!(matches!(outcome, ProbeOutcome::Narrowed { .. }));
    assert_eq!(values(&narrowed), ["bar"]);

    let list_only: DocumentSet = docs.iter().filter(|d| d.doctype == "list").cloned().collect();
    let (_, outcome) = narrow_candidates(&ctx, &list_only, store.elements("item"), "R2D2").unwrap();
    assert!(matches!(outcome, ProbeOutcome::Narrowed { .. }));
}

#[rstest]
fn probe_query_flags_digits() {
    let p = ProbeQuery::from_literal("unit R2D2", 5);
    assert!(p.alpha_numeric);
    assert_eq!(p.query.to_string(), "&= 'unit r2d2'");
}

#[rstest]
#[case("b%r", "b*r")]
#[case("a*b", "a\\*b")]
#[case("100%", "100*")]
#[case("x\\y", "x\\\\y")]
#[case("%*%", "*\\**")]
#[case("plain", "plain")]
fn masking_round_trip(#[case] literal: &str, #[case] masked: &str) {
    assert_eq!(mask_wildcards(literal), masked);
    assert_eq!(unmask_wildcards(masked), literal);
}
