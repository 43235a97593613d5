//! BM25-style relevance over the per-field inverted structures.

use crate::index::{FieldIndex, InvertedIndex};
use crate::{Bm25Params, DocId};

/// `ln((N - df + 0.5) / (df + 0.5) + 1)`; zero when the term never occurs.
pub fn idf(num_docs: u32, df: u32) -> f64 {
    if df == 0 {
        return 0.0;
    }
    let n = f64::from(num_docs);
    let df = f64::from(df);
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

/// Saturating term frequency; zero when `tf` is zero.
pub fn tf_saturation(tf: u32, doc_len: u32, avg_len: f64, params: &Bm25Params) -> f64 {
    if tf == 0 {
        return 0.0;
    }
    // tf > 0 implies doc_len > 0, hence avg_len > 0.
    let tf = f64::from(tf);
    let norm = 1.0 - params.b + params.b * f64::from(doc_len) / avg_len;
    (tf * (params.k1 + 1.0)) / (tf + params.k1 * norm)
}

struct FieldQuery<'a> {
    field: &'a FieldIndex,
    weight: f64,
    // (term, idf) for terms with df > 0 in this field
    terms: Vec<(&'a str, f64)>,
}

/// Scores documents against one tokenized query. Per-field idf values are
/// computed once up front.
pub struct Scorer<'a> {
    fields: Vec<FieldQuery<'a>>,
    params: Bm25Params,
}

impl<'a> Scorer<'a> {
    /// `terms` must already be distinct; `weights` is aligned with the
    /// schema's text fields.
    pub fn new(index: &'a InvertedIndex, params: Bm25Params, terms: &'a [String], weights: &[f64]) -> Self {
        let n = index.num_docs();
        let fields = index
            .fields()
            .zip(weights)
            .map(|((_, field), &weight)| FieldQuery {
                field,
                weight,
                terms: terms
                    .iter()
                    .filter_map(|t| {
                        let df = field.document_frequency(t);
                        (df > 0).then(|| (t.as_str(), idf(n, df)))
                    })
                    .collect(),
            })
            .collect();
        Self { fields, params }
    }

    pub fn score(&self, doc_id: DocId) -> f64 {
        let mut score = 0.0;
        for fq in &self.fields {
            if fq.terms.is_empty() {
                continue;
            }
            let len = fq.field.doc_length(doc_id);
            let avg = fq.field.average_length();
            for &(term, idf) in &fq.terms {
                let tf = fq.field.term_frequency(term, doc_id);
                score += fq.weight * idf * tf_saturation(tf, len, avg, &self.params);
            }
        }
        score
    }
}
