use crate::{DocId, Document, Error, Result, Schema};
use std::sync::Arc;

/// Owns the indexed documents; ids are positions in insertion order.
#[derive(Debug, Default)]
pub struct DocumentStore {
    docs: Vec<Arc<Document>>,
}

impl DocumentStore {
    pub fn new() -> Self { Self::default() }

    /// Validates `doc` against `schema` and assigns it the next id.
    pub fn add(&mut self, schema: &Schema, doc: Document) -> Result<DocId> {
        schema.validate(&doc)?;
        let id = DocId::try_from(self.docs.len())
            .map_err(|_| Error::Schema("document store is full".into()))?;
        self.docs.push(Arc::new(doc));
        Ok(id)
    }

    pub fn get(&self, id: DocId) -> Result<&Arc<Document>> {
        self.docs.get(id as usize).ok_or(Error::NotFound(id))
    }

    pub fn len(&self) -> usize { self.docs.len() }
    pub fn is_empty(&self) -> bool { self.docs.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = (DocId, &Arc<Document>)> + '_ {
        self.docs.iter().enumerate().map(|(i, d)| (i as DocId, d))
    }
}
