use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod error;
pub mod index;
pub mod schema;
pub mod scorer;
pub mod search;
pub mod source;
pub mod store;
pub mod tokenizer;

pub use error::{Error, Result};
pub use schema::{Bm25Params, Schema};
pub use search::{Hit, Index, SearchOptions, Searcher};

pub type DocId = u32;

/// A document as handed to `fit`: field name -> string value.
///
/// Which fields are text and which are keywords is decided by the [`Schema`],
/// not by the document. Unconfigured fields are kept and returned with hits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    fields: BTreeMap<String, String>,
}

impl Document {
    pub fn new() -> Self { Self::default() }

    pub fn with_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.fields.insert(name.into(), value.into())
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn fields(&self) -> &BTreeMap<String, String> { &self.fields }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Document {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self { fields: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect() }
    }
}
