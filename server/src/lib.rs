use anyhow::Result;
use axum::{
    extract::{rejection::PathRejection, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use docsearch_core::tokenizer::tokenize;
use docsearch_core::{DocId, Document, Error, Hit, Index, SearchOptions};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub const MAX_K: usize = 100;
const SNIPPET_BEFORE: usize = 100;
const SNIPPET_LEN: usize = 300;

#[derive(Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(default = "default_k")]
    pub k: usize,
}
fn default_k() -> usize { 10 }

#[derive(Deserialize)]
pub struct SearchBody {
    pub query: String,
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
    #[serde(default)]
    pub boost: BTreeMap<String, f64>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub include_unmatched: bool,
}
fn default_limit() -> i64 { 10 }

#[derive(Serialize, Deserialize)]
pub struct SearchResponse {
    pub query: String,
    pub took_s: f64,
    pub total_hits: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Serialize, Deserialize)]
pub struct SearchHit {
    pub doc_id: DocId,
    pub score: f64,
    pub fields: Document,
    pub snippet: Option<String>,
}

#[derive(Clone)]
pub struct AppState {
    pub index: Arc<Index>,
    /// Text field used for snippets; none disables them.
    pub snippet_field: Option<String>,
}

/// Maps core errors onto HTTP statuses with a JSON `{error}` body.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self { Self(e) }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            Error::Validation(_) => StatusCode::BAD_REQUEST,
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::NotBuilt => StatusCode::SERVICE_UNAVAILABLE,
            Error::Schema(_) | Error::AlreadyBuilt => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

pub fn build_app(state: AppState) -> Result<Router> {
    // CORS: read CORS_ALLOW_ORIGIN (comma-separated) or allow Any by default
    let cors = match std::env::var("CORS_ALLOW_ORIGIN") {
        Ok(val) => {
            let origins: Vec<_> = val
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if origins.is_empty() {
                CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any)
            } else {
                CorsLayer::new().allow_origin(AllowOrigin::list(origins)).allow_methods(Any).allow_headers(Any)
            }
        }
        Err(_) => CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any),
    };

    let app = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/search", get(search_handler).post(search_body_handler))
        .route("/doc/:doc_id", get(doc_handler))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors);
    Ok(app)
}

pub async fn search_handler(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> Result<Json<SearchResponse>, ApiError> {
    let options = SearchOptions::new().limit(params.k.min(MAX_K)).matched_only(true);
    run_search(&state, params.q, &options)
}

pub async fn search_body_handler(
    State(state): State<AppState>,
    Json(body): Json<SearchBody>,
) -> Result<Json<SearchResponse>, ApiError> {
    let options = SearchOptions { filters: body.filters, boost: body.boost, ..SearchOptions::new() }
        .signed_limit(body.limit)?
        .matched_only(!body.include_unmatched);
    let options = SearchOptions { limit: options.limit.min(MAX_K), ..options };
    run_search(&state, body.query, &options)
}

fn run_search(state: &AppState, query: String, options: &SearchOptions) -> Result<Json<SearchResponse>, ApiError> {
    let start = std::time::Instant::now();
    let (hits, total_hits) = state.index.search_with_total(&query, options)?;

    let pattern = highlight_pattern(&query);
    let results: Vec<SearchHit> = hits
        .into_iter()
        .map(|Hit { id, score, document }| {
            let snippet = state
                .snippet_field
                .as_deref()
                .and_then(|f| document.get(f))
                .and_then(|text| snippet_from_text(text, pattern.as_ref()));
            SearchHit { doc_id: id, score, fields: Document::clone(&document), snippet }
        })
        .collect();

    let elapsed = start.elapsed();
    tracing::debug!(query = %query, total_hits, hits = results.len(), took_s = elapsed.as_secs_f64(), "search served");
    Ok(Json(SearchResponse { query, took_s: elapsed.as_secs_f64(), total_hits, results }))
}

pub async fn doc_handler(
    State(state): State<AppState>,
    doc_id: Result<Path<DocId>, PathRejection>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Path(doc_id) = doc_id.map_err(|rejection| Error::Validation(rejection.body_text()))?;
    let doc = state.index.get(doc_id)?;
    Ok(Json(serde_json::json!({ "doc_id": doc_id, "fields": &*doc })))
}

/// One case-insensitive alternation over the distinct query terms, longest
/// first, matching whole words only. `None` when the query has no terms.
pub fn highlight_pattern(query: &str) -> Option<Regex> {
    let tokens = tokenize(query);
    let mut terms: Vec<&str> = Vec::new();
    for t in tokens.iter() {
        if !terms.contains(&t) {
            terms.push(t);
        }
    }
    if terms.is_empty() {
        return None;
    }
    terms.sort_by(|a, b| b.len().cmp(&a.len()));
    let alternation = terms.iter().map(|t| regex::escape(t)).collect::<Vec<_>>().join("|");
    RegexBuilder::new(&format!(r"\b(?:{alternation})\b")).case_insensitive(true).build().ok()
}

/// Window of the text around the first matching query term, matches wrapped in `<em>`.
pub fn snippet_from_text(text: &str, pattern: Option<&Regex>) -> Option<String> {
    if text.is_empty() { return None; }
    let first_idx = pattern.and_then(|p| p.find(text)).map(|m| m.start());
    let snippet = match first_idx {
        Some(idx) => {
            let start = floor_char_boundary(text, idx.saturating_sub(SNIPPET_BEFORE));
            let end = floor_char_boundary(text, (start + SNIPPET_LEN).min(text.len()));
            &text[start..end]
        }
        None => &text[..floor_char_boundary(text, SNIPPET_LEN.min(text.len()))],
    };
    Some(match pattern {
        Some(p) => p.replace_all(snippet, |caps: &regex::Captures| format!("<em>{}</em>", &caps[0])).into_owned(),
        None => snippet.to_string(),
    })
}

fn floor_char_boundary(s: &str, mut i: usize) -> usize {
    while !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}
