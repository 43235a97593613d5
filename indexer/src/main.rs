use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use docsearch_core::source::{self, LoadOptions};
use docsearch_core::{Bm25Params, Index, Schema, SearchOptions};
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Index a document collection in memory and query it", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fit the index and print the top hits for a query, one JSON object per line
    Search {
        #[command(flatten)]
        index: IndexArgs,
        /// Free-text query
        #[arg(long)]
        query: String,
        /// Maximum number of hits
        #[arg(long, default_value_t = 5, allow_negative_numbers = true)]
        limit: i64,
        /// Keyword filter, `field=value`; repeatable
        #[arg(long = "filter", value_parser = parse_pair::<String>)]
        filters: Vec<(String, String)>,
        /// Text field weight, `field=weight`; repeatable
        #[arg(long = "boost", value_parser = parse_pair::<f64>)]
        boosts: Vec<(String, f64)>,
        /// Also return documents matching no query term
        #[arg(long, default_value_t = false)]
        include_unmatched: bool,
    },
    /// Fit the index and print document and per-field term statistics
    Stats {
        #[command(flatten)]
        index: IndexArgs,
    },
}

#[derive(Args)]
struct IndexArgs {
    /// Input path: a directory tree, a .json/.jsonl file or a single text file
    #[arg(long)]
    input: PathBuf,
    /// Text field to index; repeatable
    #[arg(long = "text-field", default_values_t = ["content".to_string()])]
    text_fields: Vec<String>,
    /// Keyword field for exact filters; repeatable
    #[arg(long = "keyword-field", default_values_t = ["filename".to_string()])]
    keyword_fields: Vec<String>,
    /// Configure no keyword fields, for collections without a `filename`
    #[arg(long, conflicts_with = "keyword_fields", default_value_t = false)]
    no_keyword_fields: bool,
    /// File extensions loaded as text documents when walking a directory
    #[arg(long = "extension", default_values_t = ["md".to_string(), "mdx".to_string()])]
    extensions: Vec<String>,
    #[arg(long, default_value_t = 1.5)]
    k1: f64,
    #[arg(long, default_value_t = 0.75)]
    b: f64,
}

#[derive(Serialize)]
struct HitLine<'a> {
    id: u32,
    score: f64,
    document: &'a docsearch_core::Document,
}

#[derive(Serialize)]
struct FieldLine<'a> {
    field: &'a str,
    num_terms: usize,
    average_length: f64,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).with_writer(std::io::stderr).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Search { index, query, limit, filters, boosts, include_unmatched } => {
            let idx = fit(&index)?;
            let mut options = SearchOptions::new().signed_limit(limit)?.matched_only(!include_unmatched);
            for (field, value) in filters {
                options = options.filter(field, value);
            }
            for (field, weight) in boosts {
                options = options.boost(field, weight);
            }
            for hit in idx.search(&query, &options)? {
                let line = HitLine { id: hit.id, score: hit.score, document: &hit.document };
                println!("{}", serde_json::to_string(&line)?);
            }
            Ok(())
        }
        Commands::Stats { index } => {
            let idx = fit(&index)?;
            let searcher = idx.searcher()?;
            println!("{}", serde_json::json!({ "num_docs": searcher.num_docs() }));
            for field in searcher.schema().text_fields() {
                if let Some(stats) = searcher.field_stats(field) {
                    let line = FieldLine { field, num_terms: stats.num_terms, average_length: stats.average_length };
                    println!("{}", serde_json::to_string(&line)?);
                }
            }
            Ok(())
        }
    }
}

impl IndexArgs {
    fn schema(&self) -> Result<Schema> {
        let keyword_fields = if self.no_keyword_fields { Vec::new() } else { self.keyword_fields.clone() };
        Ok(Schema::new(self.text_fields.clone(), keyword_fields)?)
    }
}

fn fit(args: &IndexArgs) -> Result<Index> {
    let schema = args.schema()?;
    let load_options = LoadOptions::for_schema(&schema).with_extensions(args.extensions.clone());
    let index = Index::with_params(schema, Bm25Params { k1: args.k1, b: args.b })?;

    let docs = source::load(&args.input, &load_options)
        .with_context(|| format!("loading documents from {}", args.input.display()))?;

    let start = Instant::now();
    index.fit(docs).context("fitting index")?;
    tracing::info!(took_s = start.elapsed().as_secs_f64(), "index ready");
    Ok(index)
}

fn parse_pair<T>(s: &str) -> Result<(String, T), String>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    let (key, value) = s.split_once('=').ok_or_else(|| format!("expected `field=value`, got {s:?}"))?;
    if key.is_empty() {
        return Err(format!("empty field name in {s:?}"));
    }
    let value = value.parse::<T>().map_err(|e| format!("invalid value in {s:?}: {e}"))?;
    Ok((key.to_string(), value))
}
