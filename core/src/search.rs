//! Query engine: the public `Index` and its read-only snapshot.

use crate::index::{IndexBuilder, InvertedIndex};
use crate::scorer::Scorer;
use crate::tokenizer::tokenize;
use crate::{Bm25Params, DocId, Document, Error, Result, Schema};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

pub const DEFAULT_LIMIT: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// keyword field -> required value (exact, case-sensitive)
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
    /// text field -> weight; unlisted fields weigh 1.0
    #[serde(default)]
    pub boost: BTreeMap<String, f64>,
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Drop candidates with score 0, i.e. those matching no query term.
    #[serde(default)]
    pub matched_only: bool,
}

fn default_limit() -> usize { DEFAULT_LIMIT }

impl Default for SearchOptions {
    fn default() -> Self {
        Self { filters: BTreeMap::new(), boost: BTreeMap::new(), limit: DEFAULT_LIMIT, matched_only: false }
    }
}

impl SearchOptions {
    pub fn new() -> Self { Self::default() }

    pub fn filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    pub fn boost(mut self, field: impl Into<String>, weight: f64) -> Self {
        self.boost.insert(field.into(), weight);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn matched_only(mut self, matched_only: bool) -> Self {
        self.matched_only = matched_only;
        self
    }

    /// For callers holding a signed count (JSON, CLI).
    pub fn signed_limit(self, limit: i64) -> Result<Self> {
        let limit = usize::try_from(limit)
            .map_err(|_| Error::Validation(format!("limit must not be negative, got {limit}")))?;
        Ok(self.limit(limit))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub id: DocId,
    pub score: f64,
    pub document: Arc<Document>,
}

/// A fitted, immutable index. Safe to share across threads without locking.
#[derive(Debug)]
pub struct Searcher {
    index: InvertedIndex,
    params: Bm25Params,
}

/// Statistics of one text field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FieldStats {
    pub num_terms: usize,
    pub average_length: f64,
}

impl Searcher {
    pub fn num_docs(&self) -> u32 { self.index.num_docs() }
    pub fn schema(&self) -> &Schema { self.index.schema() }

    pub fn get(&self, id: DocId) -> Result<Arc<Document>> {
        self.index.store().get(id).cloned()
    }

    pub fn field_stats(&self, field: &str) -> Option<FieldStats> {
        self.index.field(field).map(|f| FieldStats { num_terms: f.num_terms(), average_length: f.average_length() })
    }

    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<Hit>> {
        self.search_with_total(query, options).map(|(hits, _)| hits)
    }

    /// Like [`Searcher::search`], also returning how many candidates were
    /// ranked before truncation to `limit`.
    pub fn search_with_total(&self, query: &str, options: &SearchOptions) -> Result<(Vec<Hit>, usize)> {
        let schema = self.index.schema();
        for field in options.filters.keys() {
            if !schema.is_keyword_field(field) {
                return Err(Error::Validation(format!("unknown keyword field {field:?} in filters")));
            }
        }
        for (field, weight) in &options.boost {
            if !schema.is_text_field(field) {
                return Err(Error::Validation(format!("unknown text field {field:?} in boost")));
            }
            if !weight.is_finite() || *weight < 0.0 {
                return Err(Error::Validation(format!("boost for {field:?} must be finite and non-negative, got {weight}")));
            }
        }
        let terms = distinct_terms(query);
        let weights: Vec<f64> = schema
            .text_fields()
            .iter()
            .map(|f| options.boost.get(f).copied().unwrap_or(1.0))
            .collect();
        let scorer = Scorer::new(&self.index, self.params, &terms, &weights);

        let mut scored: Vec<(DocId, f64)> = self
            .index
            .store()
            .iter()
            .filter(|(_, doc)| options.filters.iter().all(|(f, v)| doc.get(f) == Some(v.as_str())))
            .map(|(id, _)| (id, scorer.score(id)))
            .filter(|&(_, score)| !options.matched_only || score > 0.0)
            .collect();
        let candidates = scored.len();

        scored.sort_unstable_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(options.limit);
        tracing::debug!(query, terms = terms.len(), candidates, returned = scored.len(), "search");

        let hits = scored
            .into_iter()
            .map(|(id, score)| self.get(id).map(|document| Hit { id, score, document }))
            .collect::<Result<Vec<_>>>()?;
        Ok((hits, candidates))
    }
}

fn distinct_terms(query: &str) -> Vec<String> {
    let tokens = tokenize(query);
    let mut seen = HashSet::new();
    tokens.iter().filter(|t| seen.insert(*t)).map(str::to_string).collect()
}

/// Owned search index: created empty, fitted once, then queried.
///
/// `fit` builds the complete structures before publishing them with a single
/// swap, so a concurrent `search` sees either no index or the finished one.
#[derive(Debug)]
pub struct Index {
    schema: Schema,
    params: Bm25Params,
    build_lock: Mutex<()>,
    built: RwLock<Option<Arc<Searcher>>>,
}

impl Index {
    pub fn new(schema: Schema) -> Self {
        Self { schema, params: Bm25Params::default(), build_lock: Mutex::new(()), built: RwLock::new(None) }
    }

    pub fn with_params(schema: Schema, params: Bm25Params) -> Result<Self> {
        params.validate()?;
        Ok(Self { params, ..Self::new(schema) })
    }

    pub fn schema(&self) -> &Schema { &self.schema }
    pub fn is_built(&self) -> bool { self.built.read().is_some() }

    pub fn fit<I>(&self, documents: I) -> Result<()>
    where
        I: IntoIterator<Item = Document>,
    {
        let _guard = self.build_lock.lock();
        if self.is_built() {
            return Err(Error::AlreadyBuilt);
        }
        let mut builder = IndexBuilder::new(self.schema.clone());
        for doc in documents {
            builder.add(doc)?;
        }
        let index = builder.finish();
        tracing::info!(num_docs = index.num_docs(), "index built");
        for (name, field) in index.fields() {
            tracing::info!(field = name, num_terms = field.num_terms(), avg_len = field.average_length(), "field indexed");
        }

        *self.built.write() = Some(Arc::new(Searcher { index, params: self.params }));
        Ok(())
    }

    /// Snapshot handle for repeated queries without touching the lock.
    pub fn searcher(&self) -> Result<Arc<Searcher>> {
        self.built.read().clone().ok_or(Error::NotBuilt)
    }

    pub fn search(&self, query: &str, options: &SearchOptions) -> Result<Vec<Hit>> {
        self.searcher()?.search(query, options)
    }

    pub fn search_with_total(&self, query: &str, options: &SearchOptions) -> Result<(Vec<Hit>, usize)> {
        self.searcher()?.search_with_total(query, options)
    }

    pub fn get(&self, id: DocId) -> Result<Arc<Document>> {
        self.searcher()?.get(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(content: &str, filename: &str) -> Document {
        Document::new().with_field("content", content).with_field("filename", filename)
    }

    fn fitted() -> Index {
        let index = Index::new(Schema::new(["content"], ["filename"]).unwrap());
        index
            .fit(vec![
                doc("the quick brown fox", "a.md"),
                doc("the lazy dog", "b.md"),
                doc("", "c.md"),
            ])
            .unwrap();
        index
    }

    #[test]
    fn search_before_fit_is_not_built() {
        let index = Index::new(Schema::new(["content"], ["filename"]).unwrap());
        assert_eq!(index.search("fox", &SearchOptions::new()).unwrap_err(), Error::NotBuilt);
        assert_eq!(index.get(0).unwrap_err(), Error::NotBuilt);
    }

    #[test]
    fn zero_score_candidates_sort_last() {
        let hits = fitted().search("fox", &SearchOptions::new()).unwrap();
        let ids: Vec<DocId> = hits.iter().map(|h| h.id).collect();
        assert_eq!(ids, [0, 1, 2]);
        assert!(hits[0].score > 0.0);
        assert_eq!(hits[1].score, 0.0);
    }

    #[test]
    fn matched_only_drops_zero_scores() {
        let index = fitted();
        let hits = index.search("fox", &SearchOptions::new().matched_only(true)).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 0);
        assert!(index.search("cat", &SearchOptions::new().matched_only(true)).unwrap().is_empty());
    }

    #[test]
    fn filters_restrict_candidates() {
        let index = fitted();
        let hits = index.search("the", &SearchOptions::new().filter("filename", "b.md")).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 1);
        assert_eq!(hits[0].document.get("content"), Some("the lazy dog"));
        let none = index.search("the", &SearchOptions::new().filter("filename", "B.md")).unwrap();
        assert!(none.is_empty());
    }

    #[test]
    fn validation_errors() {
        let index = fitted();
        let unknown_filter = index.search("x", &SearchOptions::new().filter("content", "x"));
        assert!(matches!(unknown_filter, Err(Error::Validation(_))));
        let unknown_boost = index.search("x", &SearchOptions::new().boost("filename", 2.0));
        assert!(matches!(unknown_boost, Err(Error::Validation(_))));
        let nan_boost = index.search("x", &SearchOptions::new().boost("content", f64::NAN));
        assert!(matches!(nan_boost, Err(Error::Validation(_))));
        let negative_boost = index.search("x", &SearchOptions::new().boost("content", -1.0));
        assert!(matches!(negative_boost, Err(Error::Validation(_))));
        assert!(matches!(SearchOptions::new().signed_limit(-1), Err(Error::Validation(_))));
        assert_eq!(SearchOptions::new().signed_limit(3).unwrap().limit, 3);
    }

    #[test]
    fn limit_truncates() {
        let index = fitted();
        assert!(index.search("the", &SearchOptions::new().limit(0)).unwrap().is_empty());
        assert_eq!(index.search("the", &SearchOptions::new().limit(2)).unwrap().len(), 2);
        assert_eq!(index.search("the", &SearchOptions::new().limit(50)).unwrap().len(), 3);
    }

    #[test]
    fn total_counts_candidates_before_truncation() {
        let index = fitted();
        let (hits, total) = index.search_with_total("the", &SearchOptions::new().limit(1)).unwrap();
        assert_eq!((hits.len(), total), (1, 3));
        let (hits, total) = index.search_with_total("the", &SearchOptions::new().limit(0).matched_only(true)).unwrap();
        assert_eq!((hits.len(), total), (0, 2));
    }

    #[test]
    fn repeated_query_terms_count_once() {
        let index = fitted();
        let once = index.search("fox", &SearchOptions::new()).unwrap();
        let twice = index.search("fox FOX fox", &SearchOptions::new()).unwrap();
        assert_eq!(once[0].score, twice[0].score);
    }

    #[test]
    fn second_fit_is_rejected() {
        let index = fitted();
        assert_eq!(index.fit(vec![doc("cat", "z.md")]).unwrap_err(), Error::AlreadyBuilt);
        assert_eq!(index.searcher().unwrap().num_docs(), 3);
        assert!(index.search("cat", &SearchOptions::new()).unwrap().iter().all(|h| h.score == 0.0));
    }

    #[test]
    fn failed_fit_publishes_nothing() {
        let index = Index::new(Schema::new(["content"], ["filename"]).unwrap());
        let bad = vec![doc("fine", "a.md"), Document::new().with_field("content", "no filename")];
        assert!(matches!(index.fit(bad), Err(Error::Schema(_))));
        assert!(!index.is_built());
        index.fit(vec![doc("fine", "a.md")]).unwrap();
        assert_eq!(index.searcher().unwrap().num_docs(), 1);
    }

    #[test]
    fn invalid_params_are_rejected() {
        let schema = Schema::new(["content"], Vec::<String>::new()).unwrap();
        assert!(matches!(Index::with_params(schema, Bm25Params { k1: 1.2, b: 2.0 }), Err(Error::Schema(_))));
    }

    #[test]
    fn field_stats() {
        let searcher = fitted().searcher().unwrap();
        let stats = searcher.field_stats("content").unwrap();
        assert_eq!(stats.num_terms, 6);
        assert!((stats.average_length - 7.0 / 3.0).abs() < 1e-12);
        assert!(searcher.field_stats("filename").is_none());
    }
}
