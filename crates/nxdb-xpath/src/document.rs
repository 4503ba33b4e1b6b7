//! Documents, document sets and per-doctype index configuration.
use std::collections::HashMap;

use serde::Deserialize;

use crate::error::Error;
use crate::model::DocumentId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: DocumentId,
    pub name: String,
    /// Doctype name (root element name unless declared otherwise); keys the
    /// index configuration.
    pub doctype: String,
}

impl Document {
    pub fn new(id: DocumentId, name: impl Into<String>, doctype: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            doctype: doctype.into(),
        }
    }
}

/// Bounded set of documents an evaluation runs against. Unique by id,
/// iteration follows insertion order.
#[derive(Debug, Clone, Default)]
pub struct DocumentSet {
    docs: Vec<Document>,
}

impl DocumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `doc` unless a document with the same id is already present.
    pub fn add(&mut self, doc: Document) -> bool {
        if self.contains(doc.id) {
            return false;
        }
        self.docs.push(doc);
        true
    }

    pub fn contains(&self, id: DocumentId) -> bool {
        self.docs.iter().any(|d| d.id == id)
    }

    pub fn get(&self, id: DocumentId) -> Option<&Document> {
        self.docs.iter().find(|d| d.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Document> {
        self.docs.iter()
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }
}

impl FromIterator<Document> for DocumentSet {
    fn from_iter<T: IntoIterator<Item = Document>>(iter: T) -> Self {
        let mut set = DocumentSet::new();
        for d in iter {
            set.add(d);
        }
        set
    }
}

impl<'a> IntoIterator for &'a DocumentSet {
    type Item = &'a Document;
    type IntoIter = std::slice::Iter<'a, Document>;
    fn into_iter(self) -> Self::IntoIter {
        self.docs.iter()
    }
}

/// Full-text indexing settings of one doctype.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct IndexConfig {
    /// Only configured paths are indexed, so the index does not see every value.
    pub selective: bool,
    /// Tokens containing digits are kept in the index.
    pub include_alpha_num: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            selective: false,
            include_alpha_num: true,
        }
    }
}

impl IndexConfig {
    /// True when alphanumeric probe terms may be missing from the index.
    pub fn drops_alpha_num_terms(&self) -> bool {
        self.selective || !self.include_alpha_num
    }
}

/// Index configuration keyed by doctype name.
///
/// ```toml
/// [index.book]
/// selective = false
/// include-alpha-num = true
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub index: HashMap<String, IndexConfig>,
}

impl StoreConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, Error> {
        Ok(toml::from_str(s)?)
    }

    pub fn with_index(mut self, doctype: impl Into<String>, config: IndexConfig) -> Self {
        self.index.insert(doctype.into(), config);
        self
    }

    pub fn index_config(&self, doctype: &str) -> Option<IndexConfig> {
        self.index.get(doctype).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toml_defaults_fill_missing_fields() {
        let cfg = StoreConfig::from_toml_str(
            r#"
            [index.book]
            selective = true

            [index.note]
            include-alpha-num = false
            "#,
        )
        .unwrap();
        let book = cfg.index_config("book").unwrap();
        assert!(book.selective && book.include_alpha_num);
        let note = cfg.index_config("note").unwrap();
        assert!(!note.selective && !note.include_alpha_num);
        assert!(cfg.index_config("other").is_none());
    }

    #[test]
    fn document_set_rejects_duplicate_ids() {
        let mut set = DocumentSet::new();
        assert!(set.add(Document::new(DocumentId(1), "a.xml", "a")));
        assert!(!set.add(Document::new(DocumentId(1), "b.xml", "b")));
        assert_eq!(set.len(), 1);
        assert_eq!(set.get(DocumentId(1)).map(|d| d.name.as_str()), Some("a.xml"));
    }
}
