use nxdb_xpath::{
    BrokerPool, DocumentId, DocumentSet, ErrorCode, IndexConfig, MemoryStore, NodeKind, Relation, SimpleNode, StorageError,
    StoreConfig, StoredNode, acquire, elem, simple_doc, text,
};
use rstest::rstest;

#[rstest]
fn loads_documents_and_derives_doctype() {
    let mut b = MemoryStore::builder();
    let plain = b.load_xml("a.xml", "<book><title>Rust</title></book>").unwrap();
    let declared = b
        .load_xml("b.xml", "<?xml version='1.0'?><!DOCTYPE manual SYSTEM 'manual.dtd'><book/>")
        .unwrap();
    let store = b.build();

    assert_eq!(store.document(plain).map(|d| d.doctype.as_str()), Some("book"));
    assert_eq!(store.document(declared).map(|d| d.doctype.as_str()), Some("manual"));
    assert_eq!(store.documents().count(), 2);

    let root = store.root(plain).unwrap();
    assert_eq!(root.kind(), NodeKind::Document);
    assert_eq!(root.document_id(), plain);
    assert_eq!(store.all_nodes(plain).len(), 4); // document, book, title, text
    assert!(store.all_nodes(plain).has_index());
    assert!(store.all_nodes(DocumentId(99)).is_empty());
}

#[rstest]
fn loader_decodes_entities_and_cdata() {
    let mut b = MemoryStore::builder();
    let id = b
        .load_xml(
            "e.xml",
            "<r a='x &amp; y'>1 &lt; 2 &#65;<![CDATA[<raw>]]></r>",
        )
        .unwrap();
    let store = b.build();
    let r = store.elements("r").first().cloned().unwrap();
    assert_eq!(r.string_value(), "1 < 2 A<raw>");
    assert_eq!(r.attributes()[0].string_value(), "x & y");
    assert_eq!(r.document_id(), id);
}

#[rstest]
#[case("<a><b></a>")]
#[case("<a>")]
#[case("<a x='1' x='2'/>")]
fn malformed_xml_is_a_load_error(#[case] xml: &str) {
    let err = MemoryStore::builder().load_xml("bad.xml", xml).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NXDB0004);
}

#[rstest]
fn a_tree_is_stored_once() {
    let tree = simple_doc().child(elem("note").child(text("hi"))).build();
    let mut b = MemoryStore::builder();
    let id = b.add_document("n.xml", tree.clone()).unwrap();
    assert_eq!(id, DocumentId(1));
    let err = b.add_document("again.xml", tree).unwrap_err();
    assert_eq!(err.code(), ErrorCode::NXDB0004);
}

#[rstest]
fn index_configuration_from_toml() {
    let config = StoreConfig::from_toml_str(
        r#"
        [index.book]
        include-alpha-num = false
        "#,
    )
    .unwrap();
    let store = MemoryStore::builder().with_config(config).build();
    let broker = acquire::<SimpleNode>(&store).unwrap();
    let book = broker.index_config("book").unwrap().unwrap();
    assert!(book.drops_alpha_num_terms());
    assert!(broker.index_config("other").unwrap().is_none());
}

#[rstest]
fn invalid_toml_is_a_configuration_error() {
    let err = StoreConfig::from_toml_str("[index.book]\nselective = 'yes'").unwrap_err();
    assert_eq!(err.code(), ErrorCode::NXDB0003);
}

#[rstest]
fn pool_enforces_capacity_and_close() {
    let store = MemoryStore::builder().with_capacity(2).build();
    let a = store.get().unwrap();
    let b = store.get().unwrap();
    assert!(matches!(store.get(), Err(StorageError::PoolExhausted(2))));
    store.release(a);
    assert_eq!(store.active(), 1);
    store.close();
    assert!(matches!(store.get(), Err(StorageError::PoolClosed)));
    store.release(b);
    assert_eq!(store.active(), 0);
    assert_eq!(store.acquisitions(), 2);
}

#[rstest]
fn releasing_a_foreign_broker_leaves_the_count_alone() {
    let store = MemoryStore::builder().build();
    let other = MemoryStore::builder().build();
    let stray = other.get().unwrap();
    store.release(stray);
    assert_eq!(store.active(), 0);
    let mine = store.get().unwrap();
    assert_eq!(store.active(), 1);
    store.release(mine);
    assert_eq!(store.active(), 0);
    assert_eq!(other.active(), 1);
}

#[rstest]
#[case(Relation::Eq, "b%", vec!["bar", "baz"])]
#[case(Relation::Ne, "b%", vec!["foo"])]
#[case(Relation::Lt, "bb", vec!["bar", "baz"])]
#[case(Relation::Ge, "baz", vec!["foo", "baz"])]
#[case(Relation::Eq, "%", vec!["foo", "bar", "baz"])]
fn exact_match_compares_string_values(#[case] rel: Relation, #[case] literal: &str, #[case] expected: Vec<&str>) {
    let mut b = MemoryStore::builder().with_index("list", IndexConfig::default());
    b.load_xml("l.xml", "<list><i>foo</i><i>bar</i><i>baz</i></list>").unwrap();
    let store = b.build();
    let broker = acquire::<SimpleNode>(&store).unwrap();
    let out = broker
        .exact_match(&store.elements("i"), &store.document_set(), rel, literal)
        .unwrap();
    let got: Vec<String> = out.iter().map(StoredNode::string_value).collect();
    assert_eq!(got, expected);
    assert!(out.has_index());
}

#[rstest]
fn exact_match_ignores_nodes_outside_the_document_set() {
    let mut b = MemoryStore::builder();
    let first = b.load_xml("1.xml", "<i>x</i>").unwrap();
    b.load_xml("2.xml", "<i>x</i>").unwrap();
    let store = b.build();
    let only_first: DocumentSet = store.document_set().iter().filter(|d| d.id == first).cloned().collect();
    let broker = acquire::<SimpleNode>(&store).unwrap();
    let out = broker
        .exact_match(&store.elements("i"), &only_first, Relation::Eq, "x")
        .unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out.document_ids(), vec![first]);
}
