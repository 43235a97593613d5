//! Per-field inverted structures and the one-shot builder that fills them.

use crate::store::DocumentStore;
use crate::tokenizer::tokenize;
use crate::{DocId, Document, Result, Schema};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    /// Always >= 1.
    pub term_frequency: u32,
}

/// Inverted structure of one text field.
#[derive(Debug, Default)]
pub struct FieldIndex {
    postings: HashMap<String, Vec<Posting>>, // postings sorted by doc_id
    doc_lengths: Vec<u32>,
    total_length: u64,
    avg_length: f64,
}

impl FieldIndex {
    fn add_document(&mut self, doc_id: DocId, text: &str) {
        let tokens = tokenize(text);
        let mut tf_counts: HashMap<&str, u32> = HashMap::new();
        let mut len = 0u32;
        for term in tokens.iter() {
            *tf_counts.entry(term).or_insert(0) += 1;
            len += 1;
        }
        debug_assert_eq!(self.doc_lengths.len(), doc_id as usize);
        self.doc_lengths.push(len);
        self.total_length += u64::from(len);

        // Ids arrive in ascending order, so pushing keeps every list sorted.
        for (term, tf) in tf_counts {
            if let Some(list) = self.postings.get_mut(term) {
                list.push(Posting { doc_id, term_frequency: tf });
            } else {
                self.postings.insert(term.to_string(), vec![Posting { doc_id, term_frequency: tf }]);
            }
        }
    }

    fn finish(&mut self) {
        let n = self.doc_lengths.len();
        self.avg_length = if n == 0 { 0.0 } else { self.total_length as f64 / n as f64 };
        for list in self.postings.values_mut() {
            list.shrink_to_fit();
        }
    }

    pub fn postings(&self, term: &str) -> &[Posting] {
        self.postings.get(term).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct documents whose field contains `term`.
    pub fn document_frequency(&self, term: &str) -> u32 {
        self.postings(term).len() as u32
    }

    pub fn term_frequency(&self, term: &str, doc_id: DocId) -> u32 {
        let list = self.postings(term);
        match list.binary_search_by_key(&doc_id, |p| p.doc_id) {
            Ok(i) => list[i].term_frequency,
            Err(_) => 0,
        }
    }

    pub fn doc_length(&self, doc_id: DocId) -> u32 {
        self.doc_lengths.get(doc_id as usize).copied().unwrap_or(0)
    }

    /// Mean token count over all documents, including empty ones.
    pub fn average_length(&self) -> f64 { self.avg_length }

    pub fn num_terms(&self) -> usize { self.postings.len() }
}

/// Everything `fit` produces: documents plus one [`FieldIndex`] per text field.
#[derive(Debug)]
pub struct InvertedIndex {
    schema: Schema,
    store: DocumentStore,
    fields: Vec<FieldIndex>, // aligned with schema.text_fields()
}

impl InvertedIndex {
    pub fn schema(&self) -> &Schema { &self.schema }
    pub fn store(&self) -> &DocumentStore { &self.store }
    pub fn num_docs(&self) -> u32 { self.store.len() as u32 }

    pub fn field(&self, name: &str) -> Option<&FieldIndex> {
        self.field_position(name).map(|i| &self.fields[i])
    }

    pub(crate) fn field_position(&self, name: &str) -> Option<usize> {
        self.schema.text_fields().iter().position(|f| f == name)
    }

    /// Text fields paired with their inverted structures, in schema order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &FieldIndex)> + '_ {
        self.schema.text_fields().iter().map(String::as_str).zip(&self.fields)
    }
}

/// Accumulates documents, then finalizes statistics in [`IndexBuilder::finish`].
#[derive(Debug)]
pub struct IndexBuilder {
    schema: Schema,
    store: DocumentStore,
    fields: Vec<FieldIndex>,
}

impl IndexBuilder {
    pub fn new(schema: Schema) -> Self {
        let fields = schema.text_fields().iter().map(|_| FieldIndex::default()).collect();
        Self { schema, store: DocumentStore::new(), fields }
    }

    pub fn add(&mut self, doc: Document) -> Result<DocId> {
        let doc_id = self.store.add(&self.schema, doc)?;
        let doc = self.store.get(doc_id)?;
        for (name, field) in self.schema.text_fields().iter().zip(self.fields.iter_mut()) {
            field.add_document(doc_id, doc.get(name).unwrap_or_default());
        }
        Ok(doc_id)
    }

    pub fn finish(mut self) -> InvertedIndex {
        for field in self.fields.iter_mut() {
            field.finish();
        }
        InvertedIndex { schema: self.schema, store: self.store, fields: self.fields }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(docs: &[(&str, &str)]) -> InvertedIndex {
        let schema = Schema::new(["title", "body"], Vec::<String>::new()).unwrap();
        let mut builder = IndexBuilder::new(schema);
        for (title, body) in docs {
            builder.add(Document::new().with_field("title", *title).with_field("body", *body)).unwrap();
        }
        builder.finish()
    }

    #[test]
    fn term_frequency_per_field() {
        let idx = build(&[("hello", "hello hello world")]);
        assert_eq!(idx.field("body").unwrap().term_frequency("hello", 0), 3);
        assert_eq!(idx.field("title").unwrap().term_frequency("hello", 0), 1);
        assert_eq!(idx.field("title").unwrap().term_frequency("world", 0), 0);
    }

    #[test]
    fn document_frequency_counts_documents() {
        let idx = build(&[("", "rust rust language"), ("", "python language"), ("", "")]);
        let body = idx.field("body").unwrap();
        assert_eq!(body.document_frequency("language"), 2);
        assert_eq!(body.document_frequency("rust"), 1);
        assert_eq!(body.document_frequency("java"), 0);
        let ids: Vec<DocId> = body.postings("language").iter().map(|p| p.doc_id).collect();
        assert_eq!(ids, [0, 1]);
    }

    #[test]
    fn empty_fields_count_toward_average() {
        let idx = build(&[("", "one two three"), ("", "")]);
        let body = idx.field("body").unwrap();
        assert_eq!(idx.num_docs(), 2);
        assert_eq!(body.doc_length(1), 0);
        assert!((body.average_length() - 1.5).abs() < 1e-12);
        assert_eq!(idx.field("title").unwrap().num_terms(), 0);
    }

    #[test]
    fn empty_build() {
        let idx = build(&[]);
        assert_eq!(idx.num_docs(), 0);
        assert_eq!(idx.field("body").unwrap().average_length(), 0.0);
        assert!(idx.field("missing").is_none());
    }
}
