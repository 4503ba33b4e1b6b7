use core::fmt;
use core::hash::Hash;

/// Identifies a stored document. Unique within one store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentId(pub u32);

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "doc#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Element,
    Attribute,
    Text,
    Comment,
    ProcessingInstruction,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    pub prefix: Option<String>,
    pub local: String,
}

impl QName {
    pub fn local(name: impl Into<String>) -> Self {
        Self {
            prefix: None,
            local: name.into(),
        }
    }

    /// Split a lexical `prefix:local` name.
    pub fn parse(lexical: &str) -> Self {
        match lexical.split_once(':') {
            Some((p, l)) => Self {
                prefix: Some(p.to_string()),
                local: l.to_string(),
            },
            None => Self::local(lexical),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.prefix {
            Some(p) => write!(f, "{}:{}", p, self.local),
            None => f.write_str(&self.local),
        }
    }
}

/// A reference to one node of one stored document.
///
/// Implementations are cheap handles: cloning must not copy the subtree, and
/// equality/hashing must follow node identity (two handles to the same stored
/// node are equal), never structural equality.
pub trait StoredNode: 'static + Clone + Eq + Hash + fmt::Debug + Send + Sync {
    fn kind(&self) -> NodeKind;
    fn name(&self) -> Option<QName>;
    /// Concatenated text content (the XPath string-value).
    fn string_value(&self) -> String;
    fn document_id(&self) -> DocumentId;

    fn parent(&self) -> Option<Self>;
    fn children(&self) -> Vec<Self>;
    fn attributes(&self) -> Vec<Self>;

    /// True when `self` is the direct parent of `other`.
    fn is_parent_of(&self, other: &Self) -> bool {
        other.parent().is_some_and(|p| &p == self)
    }

    /// Ancestors from the direct parent up to the document root.
    fn ancestors(&self) -> Vec<Self> {
        let mut out = Vec::new();
        let mut cur = self.parent();
        while let Some(p) = cur {
            cur = p.parent();
            out.push(p);
        }
        out
    }
}
