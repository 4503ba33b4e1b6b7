pub mod comparison;
pub mod document;
pub mod error;
pub mod expr;
pub mod fulltext;
pub mod model;
pub mod node_set;
pub mod relation;
pub mod runtime;
pub mod simple_node;
pub mod storage;
pub mod value;

pub use comparison::{Dispatch, GeneralComparison, Strategy, dispatch};
pub use document::{Document, DocumentSet, IndexConfig, StoreConfig};
pub use error::{Error, ErrorCode};
pub use expr::{ChildStep, ContextNodes, DeclaredType, Expression, Literal, PathExpr};
pub use fulltext::{FulltextQuery, SimpleTokenizer, TermPattern, TextToken, TokenKind, mask_wildcards, unmask_wildcards};
pub use model::{DocumentId, NodeKind, QName, StoredNode};
pub use node_set::NodeSet;
pub use relation::Relation;
pub use runtime::{ComparisonSettings, QueryContext, QueryContextBuilder};
pub use simple_node::{SimpleNode, SimpleNodeBuilder, attr, doc as simple_doc, elem, text};
pub use storage::{Broker, BrokerGuard, BrokerPool, MemoryStore, MemoryStoreBuilder, StorageError, acquire};
pub use value::{Value, parse_number};
